// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for iot-hal
//!
//! Tests for the platform layer: whole-element storage helpers, error
//! conversion into SDK errors, and the in-memory backends the rest of the
//! workspace tests against.

mod storage_tests {
    use iot_hal::sim::MemStorage;
    use iot_hal::storage::{element_size, read_all, read_at, remove, write_all, write_at};
    use iot_hal::{HalError, StorageElementId};

    fn create_test_id(name: &[u8]) -> StorageElementId {
        StorageElementId::from_bytes(name).unwrap()
    }

    #[test]
    fn test_write_then_read_whole_element() {
        let mut storage = MemStorage::new();
        let id = create_test_id(b"tl/dynamic/header");

        write_all(&mut storage, &id, b"first content").unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(read_all(&mut storage, &id, &mut buf), Ok(13));
        assert_eq!(&buf[..13], b"first content");

        // Replacing truncates
        write_all(&mut storage, &id, b"short").unwrap();
        assert_eq!(element_size(&mut storage, &id), Ok(Some(5)));
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn test_partial_writes_grow_element() {
        let mut storage = MemStorage::new();
        let id = create_test_id(b"fw/chunk");

        write_at(&mut storage, &id, 4, b"tail").unwrap();
        write_at(&mut storage, &id, 0, b"head").unwrap();
        let mut buf = [0u8; 4];
        read_at(&mut storage, &id, 4, &mut buf).unwrap();
        assert_eq!(&buf, b"tail");
        assert_eq!(storage.element(&id), Some(&b"headtail"[..]));
    }

    #[test]
    fn test_missing_element() {
        let mut storage = MemStorage::new();
        let id = create_test_id(b"absent");
        let mut buf = [0u8; 8];

        assert_eq!(element_size(&mut storage, &id), Ok(None));
        assert_eq!(read_all(&mut storage, &id, &mut buf), Err(HalError::StorageNotFound));
        assert_eq!(remove(&mut storage, &id), Ok(()));
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn test_small_buffer_releases_handle() {
        let mut storage = MemStorage::new();
        let id = create_test_id(b"big");
        write_all(&mut storage, &id, &[7u8; 64]).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(read_all(&mut storage, &id, &mut buf), Err(HalError::BufferTooSmall));
        assert_eq!(storage.open_handles(), 0);
    }

    #[test]
    fn test_failed_write_reported() {
        let mut storage = MemStorage::new();
        let id = create_test_id(b"locked");
        storage.set_fail_writes(true);

        assert_eq!(write_all(&mut storage, &id, b"x"), Err(HalError::StorageWriteFailed));
        assert!(storage.is_empty());
        assert_eq!(storage.open_handles(), 0);
    }
}

mod error_tests {
    use iot_common::Error;
    use iot_hal::HalError;

    #[test]
    fn test_conversion_to_sdk_errors() {
        assert_eq!(Error::from(HalError::StorageNotFound), Error::NotFound);
        assert_eq!(Error::from(HalError::SlotEmpty), Error::NotFound);
        assert_eq!(Error::from(HalError::StorageOutOfBounds), Error::StorageTooLarge);
        assert_eq!(Error::from(HalError::TxFailed), Error::TransmitFailed);
        assert_eq!(Error::from(HalError::SlotLocked), Error::FileWrite);
    }

    #[test]
    fn test_display_carries_code() {
        let text = format!("{}", HalError::LinkDown);
        assert_eq!(text, "[0x0841] link down");
    }
}

mod sim_tests {
    use iot_common::MacAddr;
    use iot_hal::sim::{ManualTimer, MemSecureStorage, QueueNetif, SeededRng};
    use iot_hal::{HalError, NetifInterface, RngInterface, SecureStorageInterface, TimerInterface};

    #[test]
    fn test_secure_slots_lock() {
        let mut slots = MemSecureStorage::new();
        slots.write(3, b"recovery key").unwrap();
        assert_eq!(slots.is_slot_written(3), Ok(true));

        slots.lock_slot(3).unwrap();
        assert_eq!(slots.write(3, b"other"), Err(HalError::SlotLocked));
        assert_eq!(slots.erase(3), Err(HalError::SlotLocked));

        let mut buf = [0u8; 16];
        assert_eq!(slots.read(3, &mut buf), Ok(12));
        assert_eq!(slots.read(4, &mut buf), Err(HalError::SlotEmpty));
        assert_eq!(slots.read(200, &mut buf), Err(HalError::InvalidSlot));
    }

    #[test]
    fn test_seeded_rng_repeats() {
        let mut a = SeededRng::new(17);
        let mut b = SeededRng::new(17);
        let mut other = SeededRng::new(18);
        let (mut x, mut y, mut z) = ([0u8; 13], [0u8; 13], [0u8; 13]);
        a.fill_bytes(&mut x).unwrap();
        b.fill_bytes(&mut y).unwrap();
        other.fill_bytes(&mut z).unwrap();
        assert_eq!(x, y);
        assert_ne!(x, z);
    }

    #[test]
    fn test_manual_timer_advances_on_delay() {
        let mut timer = ManualTimer::new();
        timer.delay_ms(25);
        timer.advance(5);
        assert_eq!(timer.now_ms(), 30);
    }

    #[test]
    fn test_queue_netif_records_frames() {
        let mut netif = QueueNetif::new(MacAddr::new([2, 0, 0, 0, 0, 1]));
        let outbox = netif.outbox();
        assert!(!netif.is_up());

        netif.init().unwrap();
        netif.tx(b"frame one").unwrap();
        netif.set_fail_tx(true);
        assert_eq!(netif.tx(b"frame two"), Err(HalError::TxFailed));
        netif.deinit().unwrap();

        assert!(!netif.is_up());
        assert_eq!(outbox.borrow().len(), 1);
        assert_eq!(outbox.borrow()[0], b"frame one".to_vec());
    }
}

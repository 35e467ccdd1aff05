// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for iot-common
//!
//! Tests for the wire codec, identity types, versions, the log ring and
//! configuration defaults.

mod codec_tests {
    use iot_common::codec::{Reader, Writer};
    use iot_common::Error;

    #[test]
    fn test_chained_writes_are_big_endian() {
        let mut buf = [0u8; 9];
        let mut w = Writer::new(&mut buf);
        w.u8(0x01).unwrap().u16(0x0203).unwrap().u32(0x0405_0607).unwrap().put(b"xy").unwrap();
        assert_eq!(w.finish(), 9);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, b'x', b'y']);
    }

    #[test]
    fn test_writer_refuses_overflow() {
        let mut buf = [0u8; 3];
        let mut w = Writer::new(&mut buf);
        w.u16(7).unwrap();
        assert_eq!(w.u16(8).err(), Some(Error::BufferTooSmall));
        // Failed write leaves the cursor in place
        assert_eq!(w.position(), 2);
    }

    #[test]
    fn test_reader_walks_and_stops() {
        let data = [0xAB, 0x00, 0x10, 0, 0, 1, 0, 9, 8, 7];
        let mut r = Reader::new(&data);
        assert_eq!(r.u8(), Ok(0xAB));
        assert_eq!(r.u16(), Ok(0x0010));
        assert_eq!(r.u32(), Ok(0x0000_0100));
        assert_eq!(r.position(), 7);
        assert_eq!(r.array::<2>(), Ok([9, 8]));
        assert_eq!(r.remaining(), 1);
        assert_eq!(r.u16(), Err(Error::IncorrectArgument));
        assert_eq!(r.rest(), &[7u8]);
        assert_eq!(r.remaining(), 0);
    }
}

mod types_tests {
    use iot_common::codec::{Reader, Writer};
    use iot_common::{
        fourcc, fourcc_bytes, DeviceRoles, DeviceType, Error, FileInfo, FileVersion, KeyType, MacAddr,
        ManufactureId,
    };

    #[test]
    fn test_fourcc_roundtrip() {
        let code = fourcc(b"PBR1");
        assert_eq!(code, 0x5042_5231);
        assert_eq!(&fourcc_bytes(code), b"PBR1");
    }

    #[test]
    fn test_mac_display() {
        let mac = MacAddr::new([0x02, 0, 0, 0, 0xAB, 0x01]);
        assert_eq!(format!("{mac}"), "02:00:00:00:ab:01");
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(!mac.is_broadcast());
    }

    #[test]
    fn test_roles_combine() {
        let roles = DeviceRoles::GATEWAY | DeviceRoles::LOGGER;
        assert_eq!(roles.bits(), 0x09);
        assert!(roles.contains(DeviceRoles::GATEWAY));
        assert!(!roles.contains(DeviceRoles::THING));
        assert_eq!(DeviceRoles::from_bits_truncate(0x42), DeviceRoles::THING | DeviceRoles::INITIALIZER);
    }

    #[test]
    fn test_labels_padded_and_bounded() {
        let dt = DeviceType::from_label(b"LA").unwrap();
        assert_eq!(dt.as_bytes(), b"LA\0\0");
        assert_eq!(DeviceType::from_label(b"LAMPS").err(), Some(Error::IncorrectArgument));
    }

    #[test]
    fn test_key_types() {
        assert_eq!(KeyType::from_u8(3), Ok(KeyType::Firmware));
        assert_eq!(KeyType::from_u8(KeyType::UNSUPPORTED), Err(Error::UnsupportedKeyType));
        assert!(KeyType::TrustList.is_high_level());
        assert!(!KeyType::IotDevice.is_high_level());
    }

    #[test]
    fn test_file_info_wire_form() {
        let info = FileInfo {
            manufacture_id: ManufactureId::from_label(b"ACME0001").unwrap(),
            device_type: DeviceType::from_label(b"LAMP").unwrap(),
            version: FileVersion::new(1, 4, 0, 0, 99).with_app_type(*b"MAIN"),
        };
        let mut buf = [0u8; FileInfo::SIZE];
        info.write(&mut Writer::new(&mut buf)).unwrap();
        assert_eq!(&buf[16..20], b"LAMP");
        assert_eq!(&buf[20..24], b"MAIN");

        let decoded = FileInfo::read(&mut Reader::new(&buf)).unwrap();
        assert_eq!(decoded, info);

        let other_version = FileInfo {
            version: FileVersion::ZERO,
            ..info
        };
        assert!(decoded.same_product(&other_version));
    }
}

mod version_tests {
    use core::cmp::Ordering;
    use iot_common::FileVersion;

    #[test]
    fn test_field_precedence() {
        let v = |major, minor, patch, milestone, build| FileVersion::new(major, minor, patch, milestone, build);
        assert_eq!(v(1, 0, 0, 0, 0).ordinal_cmp(&v(0, 9, 9, 9, 9)), Ordering::Greater);
        assert_eq!(v(1, 2, 0, 0, 0).ordinal_cmp(&v(1, 1, 9, 9, 9)), Ordering::Greater);
        assert_eq!(v(1, 2, 3, 0, 0).ordinal_cmp(&v(1, 2, 3, 0, 1)), Ordering::Less);
        assert!(v(0, 0, 0, 0, 1).is_newer_than(&FileVersion::ZERO));
    }

    #[test]
    fn test_display() {
        let v = FileVersion::new(2, 10, 0, 1, 4711).with_timestamp(12);
        assert_eq!(v.to_string(), "2.10.0.1.4711");
        assert_eq!(format!("{v:?}"), "FileVersion(2.10.0.1.4711 @12)");
    }
}

mod log_tests {
    use iot_common::log::{LogBuffer, LogLevel, MAX_LOG_MESSAGE_LEN};
    use iot_common::{log_debug, log_error, log_info, log_warn};

    const SOURCE: &str = "test";

    #[test]
    fn test_ring_evicts_oldest() {
        let mut logs: LogBuffer<3> = LogBuffer::new();
        for i in 0..5u32 {
            log_info!(logs, i, SOURCE, "event {}", i);
        }
        assert_eq!(logs.len(), 3);
        assert_eq!(logs.dropped(), 2);
        let ticks: Vec<u32> = logs.iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
        assert!(!logs.contains("event 1"));
        assert!(logs.contains("event 4"));
    }

    #[test]
    fn test_level_threshold() {
        let mut logs: LogBuffer = LogBuffer::new();
        log_debug!(logs, 1, SOURCE, "hidden");
        log_warn!(logs, 2, SOURCE, "shown");
        assert_eq!(logs.len(), 1);

        logs.set_min_level(LogLevel::Error);
        log_warn!(logs, 3, SOURCE, "filtered");
        log_error!(logs, 4, SOURCE, "kept");
        assert_eq!(logs.last().map(|r| r.level), Some(LogLevel::Error));

        logs.clear();
        assert!(logs.is_empty());
    }

    #[test]
    fn test_long_message_truncated() {
        let mut logs: LogBuffer<2> = LogBuffer::new();
        let long = "x".repeat(MAX_LOG_MESSAGE_LEN * 2);
        log_info!(logs, 0, SOURCE, "{}", long);
        let record = logs.last().unwrap();
        assert_eq!(record.message.len(), MAX_LOG_MESSAGE_LEN);
        assert_eq!(record.source, SOURCE);
    }
}

mod config_tests {
    use iot_common::config::{FldtConfig, PrvsConfig, SignerPolicy, SnapConfig};
    use iot_common::constants::{FLDT_MAX_CHUNK_SIZE, SNAP_HEADER_SIZE, SNAP_MAX_CONTENT_SIZE, SNAP_MAX_FRAME_SIZE};
    use iot_common::{Error, KeyType, SdkConfig};

    #[test]
    fn test_defaults() {
        let config = SdkConfig::default();
        assert!(!config.snap.routing);
        assert_eq!(config.snap.max_netifs, SnapConfig::DEFAULT.max_netifs);
        assert_eq!(config.prvs.retry_limit, PrvsConfig::DEFAULT.retry_limit);
        assert_eq!(config.fldt.max_chunk, FLDT_MAX_CHUNK_SIZE);
        assert_eq!(FldtConfig::DEFAULT.wait_ticks, 10);
        assert_eq!(SNAP_MAX_FRAME_SIZE, SNAP_HEADER_SIZE + SNAP_MAX_CONTENT_SIZE);
    }

    #[test]
    fn test_signer_policies() {
        let config = SdkConfig::DEFAULT;
        assert!(config.trust_list.signers.requires(KeyType::TrustList));
        assert!(!config.trust_list.signers.requires(KeyType::Firmware));
        assert!(config.firmware.signers.requires(KeyType::Firmware));

        let policy = SignerPolicy::pair(KeyType::Recovery, KeyType::Auth);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.iter().collect::<Vec<_>>(), vec![KeyType::Recovery, KeyType::Auth]);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::OldVersion.to_string(), "[0x0401] version is not newer");
        assert_eq!(Error::MalformedFrame.code(), 0x0104);
    }
}

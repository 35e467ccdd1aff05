// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! Platform-agnostic capabilities the SDK consumes. A port implements the
//! subset it needs; host builds use the `sim` backends.

use iot_common::MacAddr;

use crate::error::HalResult;
use crate::storage::StorageElementId;

/// Named storage elements (files or flash records)
///
/// Elements are addressed by a 32-byte identifier. A handle returned by
/// [`open`](Self::open) stays valid until [`close`](Self::close).
pub trait StorageInterface {
    /// Open handle type
    type Handle;

    /// Largest element the backend can hold
    const MAX_ELEMENT_SIZE: usize;

    /// Open (or prepare to create) an element
    fn open(&mut self, id: &StorageElementId) -> HalResult<Self::Handle>;

    /// Current size of an element
    ///
    /// Returns [`HalError::StorageNotFound`](crate::HalError::StorageNotFound)
    /// for an element that was never saved.
    fn size(&mut self, handle: &Self::Handle) -> HalResult<usize>;

    /// Read `buffer.len()` bytes starting at `offset`
    fn load(&mut self, handle: &Self::Handle, offset: usize, buffer: &mut [u8]) -> HalResult<()>;

    /// Write `data` at `offset`, growing the element as needed
    fn save(&mut self, handle: &Self::Handle, offset: usize, data: &[u8]) -> HalResult<()>;

    /// Flush pending writes
    fn sync(&mut self, handle: &Self::Handle) -> HalResult<()>;

    /// Release a handle
    fn close(&mut self, handle: Self::Handle) -> HalResult<()>;

    /// Remove an element
    fn delete(&mut self, id: &StorageElementId) -> HalResult<()>;

    /// Release backend resources
    fn deinit(&mut self) -> HalResult<()>;
}

/// Secure storage interface (OTP, eFUSE, or protected flash key slots)
pub trait SecureStorageInterface {
    /// Maximum data size per slot
    const MAX_SLOT_SIZE: usize;

    /// Number of available slots
    const NUM_SLOTS: usize;

    /// Initialize secure storage
    fn init(&mut self) -> HalResult<()>;

    /// Read a slot, returning the stored length
    fn read(&self, slot: u8, buffer: &mut [u8]) -> HalResult<usize>;

    /// Replace the content of a slot
    fn write(&mut self, slot: u8, data: &[u8]) -> HalResult<()>;

    /// Clear a slot
    fn erase(&mut self, slot: u8) -> HalResult<()>;

    /// Check if a slot has been written
    fn is_slot_written(&self, slot: u8) -> HalResult<bool>;

    /// Lock a slot (prevent further writes)
    fn lock_slot(&mut self, slot: u8) -> HalResult<()>;

    /// Check if a slot is locked
    fn is_slot_locked(&self, slot: u8) -> HalResult<bool>;
}

/// Random number generator interface
pub trait RngInterface {
    /// Fill buffer with random bytes
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()>;

    /// Generate a random u32
    fn next_u32(&mut self) -> HalResult<u32> {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Check if RNG is ready
    fn is_ready(&self) -> bool;
}

/// Monotonic time base
pub trait TimerInterface {
    /// Elapsed milliseconds since an arbitrary origin
    fn now_ms(&self) -> u32;

    /// Block for the given number of milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Raw frame network interface
///
/// Received bytes are pushed into the protocol engine by the port; this
/// trait only covers the transmit direction.
pub trait NetifInterface {
    /// Bring the link up
    fn init(&mut self) -> HalResult<()>;

    /// Transmit one complete frame
    fn tx(&mut self, frame: &[u8]) -> HalResult<()>;

    /// Own hardware address
    fn mac(&self) -> MacAddr;

    /// Take the link down
    fn deinit(&mut self) -> HalResult<()>;
}

/// Firmware install target
pub trait FirmwareInstallInterface {
    /// Copy the footer of the running image into `buffer`, returning its length
    fn own_footer(&self, buffer: &mut [u8]) -> HalResult<usize>;

    /// Erase the install area
    fn prepare_space(&mut self) -> HalResult<()>;

    /// Append bytes to the install area
    fn append_data(&mut self, data: &[u8]) -> HalResult<()>;
}

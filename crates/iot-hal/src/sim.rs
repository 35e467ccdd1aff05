// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! In-memory host backends
//!
//! Deterministic stand-ins for every HAL trait. They keep state in plain
//! collections and expose inspection helpers so tests can assert on what
//! the SDK wrote or transmitted.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use iot_common::MacAddr;

use crate::error::{HalError, HalResult};
use crate::storage::StorageElementId;
use crate::traits::{
    FirmwareInstallInterface, NetifInterface, RngInterface, SecureStorageInterface, StorageInterface,
    TimerInterface,
};

// =============================================================================
// Storage
// =============================================================================

/// Map-backed element storage
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    elements: BTreeMap<StorageElementId, Vec<u8>>,
    open_handles: usize,
    fail_writes: bool,
}

impl MemStorage {
    /// Empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw content of an element
    #[must_use]
    pub fn element(&self, id: &StorageElementId) -> Option<&[u8]> {
        self.elements.get(id).map(Vec::as_slice)
    }

    /// Number of stored elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check for empty storage
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Handles opened and not yet closed
    #[must_use]
    pub const fn open_handles(&self) -> usize {
        self.open_handles
    }

    /// Make every subsequent save fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl StorageInterface for MemStorage {
    type Handle = StorageElementId;

    const MAX_ELEMENT_SIZE: usize = 1 << 20;

    fn open(&mut self, id: &StorageElementId) -> HalResult<Self::Handle> {
        self.open_handles += 1;
        Ok(*id)
    }

    fn size(&mut self, handle: &Self::Handle) -> HalResult<usize> {
        self.elements
            .get(handle)
            .map(Vec::len)
            .ok_or(HalError::StorageNotFound)
    }

    fn load(&mut self, handle: &Self::Handle, offset: usize, buffer: &mut [u8]) -> HalResult<()> {
        let data = self.elements.get(handle).ok_or(HalError::StorageNotFound)?;
        let src = data
            .get(offset..offset + buffer.len())
            .ok_or(HalError::StorageReadFailed)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn save(&mut self, handle: &Self::Handle, offset: usize, data: &[u8]) -> HalResult<()> {
        if self.fail_writes {
            return Err(HalError::StorageWriteFailed);
        }
        let end = offset + data.len();
        if end > Self::MAX_ELEMENT_SIZE {
            return Err(HalError::StorageOutOfBounds);
        }
        let element = self.elements.entry(*handle).or_default();
        if element.len() < end {
            element.resize(end, 0);
        }
        element[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn sync(&mut self, _handle: &Self::Handle) -> HalResult<()> {
        Ok(())
    }

    fn close(&mut self, _handle: Self::Handle) -> HalResult<()> {
        self.open_handles = self.open_handles.saturating_sub(1);
        Ok(())
    }

    fn delete(&mut self, id: &StorageElementId) -> HalResult<()> {
        self.elements
            .remove(id)
            .map(|_| ())
            .ok_or(HalError::StorageNotFound)
    }

    fn deinit(&mut self) -> HalResult<()> {
        Ok(())
    }
}

// =============================================================================
// Secure storage
// =============================================================================

/// Slot array held in memory
#[derive(Debug, Clone)]
pub struct MemSecureStorage {
    slots: Vec<Option<Vec<u8>>>,
    locked: Vec<bool>,
}

impl MemSecureStorage {
    /// All slots empty and unlocked
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![None; Self::NUM_SLOTS],
            locked: vec![false; Self::NUM_SLOTS],
        }
    }

    fn index(slot: u8) -> HalResult<usize> {
        let idx = usize::from(slot);
        if idx < Self::NUM_SLOTS {
            Ok(idx)
        } else {
            Err(HalError::InvalidSlot)
        }
    }
}

impl Default for MemSecureStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureStorageInterface for MemSecureStorage {
    const MAX_SLOT_SIZE: usize = 512;
    const NUM_SLOTS: usize = 16;

    fn init(&mut self) -> HalResult<()> {
        Ok(())
    }

    fn read(&self, slot: u8, buffer: &mut [u8]) -> HalResult<usize> {
        let data = self.slots[Self::index(slot)?].as_ref().ok_or(HalError::SlotEmpty)?;
        buffer
            .get_mut(..data.len())
            .ok_or(HalError::BufferTooSmall)?
            .copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&mut self, slot: u8, data: &[u8]) -> HalResult<()> {
        let idx = Self::index(slot)?;
        if self.locked[idx] {
            return Err(HalError::SlotLocked);
        }
        if data.len() > Self::MAX_SLOT_SIZE {
            return Err(HalError::StorageOutOfBounds);
        }
        self.slots[idx] = Some(data.to_vec());
        Ok(())
    }

    fn erase(&mut self, slot: u8) -> HalResult<()> {
        let idx = Self::index(slot)?;
        if self.locked[idx] {
            return Err(HalError::SlotLocked);
        }
        self.slots[idx] = None;
        Ok(())
    }

    fn is_slot_written(&self, slot: u8) -> HalResult<bool> {
        Ok(self.slots[Self::index(slot)?].is_some())
    }

    fn lock_slot(&mut self, slot: u8) -> HalResult<()> {
        self.locked[Self::index(slot)?] = true;
        Ok(())
    }

    fn is_slot_locked(&self, slot: u8) -> HalResult<bool> {
        Ok(self.locked[Self::index(slot)?])
    }
}

// =============================================================================
// RNG and timer
// =============================================================================

/// Xorshift generator with a fixed seed
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a generator; a zero seed is replaced by a fixed constant
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
        }
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl RngInterface for SeededRng {
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()> {
        for chunk in buffer.chunks_mut(8) {
            let word = self.step().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Timer that only advances when told to
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now: u32,
}

impl ManualTimer {
    /// Start at zero
    #[must_use]
    pub const fn new() -> Self {
        Self { now: 0 }
    }

    /// Advance the clock
    pub fn advance(&mut self, ms: u32) {
        self.now = self.now.wrapping_add(ms);
    }
}

impl TimerInterface for ManualTimer {
    fn now_ms(&self) -> u32 {
        self.now
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

// =============================================================================
// Network interface
// =============================================================================

/// Transmitted frames shared between a [`QueueNetif`] and the test harness
pub type Outbox = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// Interface that queues every transmitted frame
#[derive(Debug, Clone)]
pub struct QueueNetif {
    mac: MacAddr,
    outbox: Outbox,
    up: bool,
    fail_tx: bool,
}

impl QueueNetif {
    /// Create an interface with its own outbox
    #[must_use]
    pub fn new(mac: MacAddr) -> Self {
        Self {
            mac,
            outbox: Rc::default(),
            up: false,
            fail_tx: false,
        }
    }

    /// Shared handle to the outbox
    #[must_use]
    pub fn outbox(&self) -> Outbox {
        Rc::clone(&self.outbox)
    }

    /// Make every subsequent transmit fail
    pub fn set_fail_tx(&mut self, fail: bool) {
        self.fail_tx = fail;
    }

    /// Check whether `init` has been called without a matching `deinit`
    #[must_use]
    pub const fn is_up(&self) -> bool {
        self.up
    }
}

impl NetifInterface for QueueNetif {
    fn init(&mut self) -> HalResult<()> {
        self.up = true;
        Ok(())
    }

    fn tx(&mut self, frame: &[u8]) -> HalResult<()> {
        if self.fail_tx {
            return Err(HalError::TxFailed);
        }
        self.outbox.borrow_mut().push_back(frame.to_vec());
        Ok(())
    }

    fn mac(&self) -> MacAddr {
        self.mac
    }

    fn deinit(&mut self) -> HalResult<()> {
        self.up = false;
        Ok(())
    }
}

// =============================================================================
// Firmware install
// =============================================================================

/// Install target recording the written image
#[derive(Debug, Clone, Default)]
pub struct MemInstallTarget {
    /// Footer of the running image
    pub own_footer: Vec<u8>,
    /// Bytes appended since the last `prepare_space`
    pub installed: Vec<u8>,
    /// Number of `prepare_space` calls
    pub prepared: usize,
}

impl MemInstallTarget {
    /// Target whose running image has the given footer
    #[must_use]
    pub fn with_footer(own_footer: Vec<u8>) -> Self {
        Self {
            own_footer,
            ..Self::default()
        }
    }
}

impl FirmwareInstallInterface for MemInstallTarget {
    fn own_footer(&self, buffer: &mut [u8]) -> HalResult<usize> {
        if self.own_footer.is_empty() {
            return Err(HalError::StorageNotFound);
        }
        buffer
            .get_mut(..self.own_footer.len())
            .ok_or(HalError::BufferTooSmall)?
            .copy_from_slice(&self.own_footer);
        Ok(self.own_footer.len())
    }

    fn prepare_space(&mut self) -> HalResult<()> {
        self.installed.clear();
        self.prepared += 1;
        Ok(())
    }

    fn append_data(&mut self, data: &[u8]) -> HalResult<()> {
        self.installed.extend_from_slice(data);
        Ok(())
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Backend not initialized
    NotInitialized,
    /// Storage element does not exist
    StorageNotFound,
    /// Storage read failed
    StorageReadFailed,
    /// Storage write failed
    StorageWriteFailed,
    /// Storage delete failed
    StorageDeleteFailed,
    /// Storage element or request exceeds backend limits
    StorageOutOfBounds,
    /// Slot number out of range
    InvalidSlot,
    /// Slot is locked against writes
    SlotLocked,
    /// Slot has never been written
    SlotEmpty,
    /// RNG failure
    RngError,
    /// Network interface refused the frame
    TxFailed,
    /// Network interface is down
    LinkDown,
    /// Firmware install area write failed
    InstallWriteFailed,
    /// Invalid parameter
    InvalidParameter,
    /// Caller buffer too small
    BufferTooSmall,
    /// Hardware busy
    Busy,
    /// Operation not supported
    NotSupported,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::NotInitialized => 0x0801,
            Self::StorageNotFound => 0x0810,
            Self::StorageReadFailed => 0x0811,
            Self::StorageWriteFailed => 0x0812,
            Self::StorageDeleteFailed => 0x0813,
            Self::StorageOutOfBounds => 0x0814,
            Self::InvalidSlot => 0x0820,
            Self::SlotLocked => 0x0821,
            Self::SlotEmpty => 0x0822,
            Self::RngError => 0x0830,
            Self::TxFailed => 0x0840,
            Self::LinkDown => 0x0841,
            Self::InstallWriteFailed => 0x0850,
            Self::InvalidParameter => 0x08F0,
            Self::BufferTooSmall => 0x08F1,
            Self::Busy => 0x08F2,
            Self::NotSupported => 0x08FF,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::StorageNotFound => "storage element not found",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::StorageDeleteFailed => "storage delete failed",
            Self::StorageOutOfBounds => "storage request out of bounds",
            Self::InvalidSlot => "invalid slot",
            Self::SlotLocked => "slot locked",
            Self::SlotEmpty => "slot empty",
            Self::RngError => "RNG error",
            Self::TxFailed => "transmit failed",
            Self::LinkDown => "link down",
            Self::InstallWriteFailed => "install write failed",
            Self::InvalidParameter => "invalid parameter",
            Self::BufferTooSmall => "buffer too small",
            Self::Busy => "busy",
            Self::NotSupported => "not supported",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

impl From<HalError> for iot_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::StorageNotFound | HalError::SlotEmpty => Self::NotFound,
            HalError::StorageReadFailed => Self::FileRead,
            HalError::StorageWriteFailed
            | HalError::SlotLocked
            | HalError::InstallWriteFailed => Self::FileWrite,
            HalError::StorageDeleteFailed => Self::FileDelete,
            HalError::StorageOutOfBounds => Self::StorageTooLarge,
            HalError::InvalidSlot | HalError::InvalidParameter => Self::IncorrectArgument,
            HalError::RngError => Self::RngFailure,
            HalError::TxFailed | HalError::LinkDown => Self::TransmitFailed,
            HalError::BufferTooSmall => Self::BufferTooSmall,
            HalError::Busy => Self::Busy,
            HalError::NotSupported => Self::Unsupported,
            HalError::NotInitialized => Self::NotReady,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Security module error types

use core::fmt;

use iot_hal::HalError;

/// Error type for security module operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key format or size
    InvalidKey,
    /// Signature is malformed or does not verify
    InvalidSignature,
    /// Signing operation failed
    SigningFailed,
    /// Random number generator failure
    RngFailure,
    /// Buffer is too small for the operation
    BufferTooSmall,
    /// Curve or hash algorithm not supported
    UnsupportedAlgorithm,
    /// Slot number out of range or slot empty
    InvalidSlot,
    /// Slot storage backend failed
    SlotStorage,
}

impl CryptoError {
    /// Get error code for logging/debugging
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidKey => 0x0501,
            Self::InvalidSignature => 0x0502,
            Self::SigningFailed => 0x0503,
            Self::RngFailure => 0x0504,
            Self::BufferTooSmall => 0x0505,
            Self::UnsupportedAlgorithm => 0x0506,
            Self::InvalidSlot => 0x0507,
            Self::SlotStorage => 0x0508,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid key",
            Self::InvalidSignature => "invalid signature",
            Self::SigningFailed => "signing operation failed",
            Self::RngFailure => "RNG failure",
            Self::BufferTooSmall => "buffer too small",
            Self::UnsupportedAlgorithm => "unsupported algorithm",
            Self::InvalidSlot => "invalid or empty slot",
            Self::SlotStorage => "slot storage failure",
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CryptoError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

impl From<HalError> for CryptoError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InvalidSlot | HalError::SlotEmpty => Self::InvalidSlot,
            HalError::BufferTooSmall => Self::BufferTooSmall,
            HalError::RngError => Self::RngFailure,
            _ => Self::SlotStorage,
        }
    }
}

impl From<CryptoError> for iot_common::Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKey => Self::InvalidKey,
            CryptoError::InvalidSignature => Self::InvalidSignature,
            CryptoError::SigningFailed | CryptoError::SlotStorage => Self::CryptoFailure,
            CryptoError::RngFailure => Self::RngFailure,
            CryptoError::BufferTooSmall => Self::BufferTooSmall,
            CryptoError::UnsupportedAlgorithm => Self::Unsupported,
            CryptoError::InvalidSlot => Self::NotFound,
        }
    }
}

/// Result type for security module operations
pub type CryptoResult<T> = Result<T, CryptoError>;

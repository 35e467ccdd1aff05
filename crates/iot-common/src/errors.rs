// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the IoT SDK
//!
//! One flat, `Copy` error enum is shared by every component. Lower layers
//! (HAL, security module) keep their own error enums and convert into this
//! one at the crate boundary.

use core::fmt;

/// Result type alias for SDK operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the IoT SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Protocol Errors (0x01xx)
    // =========================================================================
    /// Service table is full
    TooManyServices,
    /// Network interface table is full
    TooManyInterfaces,
    /// Request handled, no response frame must be sent
    CommandNoResponse,
    /// Frame header or content is malformed
    MalformedFrame,
    /// Network interface failed to transmit
    TransmitFailed,
    /// Peer answered with a NACK
    Nack,
    /// File type table is full
    TooManyFileTypes,

    // =========================================================================
    // Provisioning Errors (0x02xx)
    // =========================================================================
    /// Key type is out of range or not allowed here
    UnsupportedKeyType,
    /// Signer key is not a known high-level key
    UnknownSigner,
    /// Device is not provisioned yet
    NotProvisioned,

    // =========================================================================
    // Storage Errors (0x03xx)
    // =========================================================================
    /// Storage read failed
    FileRead,
    /// Storage write failed
    FileWrite,
    /// Storage delete failed
    FileDelete,
    /// Stored object exceeds its allowed size
    StorageTooLarge,

    // =========================================================================
    // Update Errors (0x04xx)
    // =========================================================================
    /// Candidate version is not newer than the installed one
    OldVersion,
    /// Signature threshold or integrity verification failed
    VerificationFailed,
    /// Fill-byte accounting of an image does not add up
    InvalidImageLayout,

    // =========================================================================
    // Crypto Errors (0x05xx)
    // =========================================================================
    /// Underlying cryptographic primitive failed
    CryptoFailure,
    /// Key material is malformed
    InvalidKey,
    /// Signature is malformed or does not verify
    InvalidSignature,
    /// Random number generator failure
    RngFailure,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Required input is missing or empty
    NullArgument,
    /// Argument value is not acceptable
    IncorrectArgument,
    /// Requested item not found
    NotFound,
    /// Buffer is too small for operation
    BufferTooSmall,
    /// Another operation is outstanding
    Busy,
    /// Operation timed out
    Timeout,
    /// Object is not in a ready state
    NotReady,
    /// Algorithm or feature not supported
    Unsupported,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Protocol errors
    /// - 0x02xx: Provisioning errors
    /// - 0x03xx: Storage errors
    /// - 0x04xx: Update errors
    /// - 0x05xx: Crypto errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            // Protocol errors (0x01xx)
            Self::TooManyServices => 0x0101,
            Self::TooManyInterfaces => 0x0102,
            Self::CommandNoResponse => 0x0103,
            Self::MalformedFrame => 0x0104,
            Self::TransmitFailed => 0x0105,
            Self::Nack => 0x0106,
            Self::TooManyFileTypes => 0x0107,

            // Provisioning errors (0x02xx)
            Self::UnsupportedKeyType => 0x0201,
            Self::UnknownSigner => 0x0202,
            Self::NotProvisioned => 0x0203,

            // Storage errors (0x03xx)
            Self::FileRead => 0x0301,
            Self::FileWrite => 0x0302,
            Self::FileDelete => 0x0303,
            Self::StorageTooLarge => 0x0304,

            // Update errors (0x04xx)
            Self::OldVersion => 0x0401,
            Self::VerificationFailed => 0x0402,
            Self::InvalidImageLayout => 0x0403,

            // Crypto errors (0x05xx)
            Self::CryptoFailure => 0x0501,
            Self::InvalidKey => 0x0502,
            Self::InvalidSignature => 0x0503,
            Self::RngFailure => 0x0504,

            // General errors (0xFFxx)
            Self::NullArgument => 0xFF01,
            Self::IncorrectArgument => 0xFF02,
            Self::NotFound => 0xFF03,
            Self::BufferTooSmall => 0xFF04,
            Self::Busy => 0xFF05,
            Self::Timeout => 0xFF06,
            Self::NotReady => 0xFF07,
            Self::Unsupported => 0xFF08,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Check if this error came out of a signature or integrity check
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSigner
                | Self::VerificationFailed
                | Self::InvalidImageLayout
                | Self::InvalidKey
                | Self::InvalidSignature
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::TooManyServices => "too many services",
            Self::TooManyInterfaces => "too many network interfaces",
            Self::CommandNoResponse => "no response required",
            Self::MalformedFrame => "malformed frame",
            Self::TransmitFailed => "transmit failed",
            Self::Nack => "negative acknowledgement",
            Self::TooManyFileTypes => "too many file types",
            Self::UnsupportedKeyType => "unsupported key type",
            Self::UnknownSigner => "unknown signer key",
            Self::NotProvisioned => "device not provisioned",
            Self::FileRead => "storage read failed",
            Self::FileWrite => "storage write failed",
            Self::FileDelete => "storage delete failed",
            Self::StorageTooLarge => "stored object too large",
            Self::OldVersion => "version is not newer",
            Self::VerificationFailed => "verification failed",
            Self::InvalidImageLayout => "invalid image layout",
            Self::CryptoFailure => "crypto operation failed",
            Self::InvalidKey => "invalid key",
            Self::InvalidSignature => "invalid signature",
            Self::RngFailure => "RNG failure",
            Self::NullArgument => "missing argument",
            Self::IncorrectArgument => "incorrect argument",
            Self::NotFound => "not found",
            Self::BufferTooSmall => "buffer too small",
            Self::Busy => "busy",
            Self::Timeout => "timeout",
            Self::NotReady => "not ready",
            Self::Unsupported => "not supported",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let mut buf = heapless::String::<64>::new();
        core::fmt::write(&mut buf, format_args!("{}", Error::OldVersion)).unwrap();
        assert_eq!(buf.as_str(), "[0x0401] version is not newer");
    }

    #[test]
    fn test_security_classification() {
        assert!(Error::VerificationFailed.is_security_error());
        assert!(!Error::Busy.is_security_error());
        assert!(!Error::CommandNoResponse.is_security_error());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Algorithm identifiers carried in key and signature records

use iot_common::constants::{SECP256R1_PUBKEY_SIZE, SECP256R1_SIGNATURE_SIZE};

use crate::error::{CryptoError, CryptoResult};

/// Elliptic curve of a key pair
///
/// Wire values follow the established numbering; only secp256r1 has an
/// implementation, the others are recognised so records can be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EcType {
    /// NIST P-192
    Secp192r1 = 1,
    /// NIST P-224
    Secp224r1 = 2,
    /// NIST P-256
    Secp256r1 = 3,
    /// NIST P-384
    Secp384r1 = 4,
    /// NIST P-521
    Secp521r1 = 5,
    /// Koblitz 192
    Secp192k1 = 6,
    /// Koblitz 224
    Secp224k1 = 7,
    /// Koblitz 256
    Secp256k1 = 8,
    /// Curve25519
    Curve25519 = 9,
    /// Ed25519
    Ed25519 = 10,
}

impl EcType {
    /// Parse from the wire value
    pub const fn from_u8(value: u8) -> CryptoResult<Self> {
        Ok(match value {
            1 => Self::Secp192r1,
            2 => Self::Secp224r1,
            3 => Self::Secp256r1,
            4 => Self::Secp384r1,
            5 => Self::Secp521r1,
            6 => Self::Secp192k1,
            7 => Self::Secp224k1,
            8 => Self::Secp256k1,
            9 => Self::Curve25519,
            10 => Self::Ed25519,
            _ => return Err(CryptoError::UnsupportedAlgorithm),
        })
    }

    /// Raw signature length for this curve
    pub const fn signature_len(self) -> CryptoResult<usize> {
        match self {
            Self::Secp256r1 => Ok(SECP256R1_SIGNATURE_SIZE),
            _ => Err(CryptoError::UnsupportedAlgorithm),
        }
    }

    /// Raw public key length for this curve
    pub const fn pubkey_len(self) -> CryptoResult<usize> {
        match self {
            Self::Secp256r1 => Ok(SECP256R1_PUBKEY_SIZE),
            _ => Err(CryptoError::UnsupportedAlgorithm),
        }
    }
}

/// Hash algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashType {
    /// SHA-256
    Sha256 = 0,
    /// SHA-384
    Sha384 = 1,
    /// SHA-512
    Sha512 = 2,
}

impl HashType {
    /// Parse from the wire value
    pub const fn from_u8(value: u8) -> CryptoResult<Self> {
        match value {
            0 => Ok(Self::Sha256),
            1 => Ok(Self::Sha384),
            2 => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedAlgorithm),
        }
    }

    /// Digest length
    #[must_use]
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Security module traits
//!
//! [`Hash`] is the streaming digest interface used by verification
//! pipelines that cannot hold their input in memory. [`SecModule`] is the
//! capability the rest of the SDK receives; it hides where private keys
//! live.

use crate::error::CryptoResult;
use crate::types::{EcType, HashType};

/// Streaming hash function
pub trait Hash: Sized {
    /// Algorithm identifier
    const ALGORITHM: HashType;
    /// Output size in bytes
    const OUTPUT_SIZE: usize;
    /// Internal block size in bytes
    const BLOCK_SIZE: usize;

    /// Digest type
    type Output: AsRef<[u8]> + Clone;

    /// One-shot digest
    fn hash(message: &[u8]) -> Self::Output;

    /// Start a new computation
    fn new() -> Self;

    /// Absorb more input
    fn update(&mut self, data: &[u8]);

    /// Finish and return the digest
    fn finalize(self) -> Self::Output;

    /// Return to the initial state
    fn reset(&mut self);
}

/// Cryptographic capability consumed by provisioning, trust list and firmware
pub trait SecModule {
    /// Hash `data`, writing the digest to `out` and returning its length
    fn hash(&self, hash_type: HashType, data: &[u8], out: &mut [u8]) -> CryptoResult<usize>;

    /// Generate a key pair whose private half stays in `slot`
    fn create_keypair(&mut self, slot: u8, ec_type: EcType) -> CryptoResult<()>;

    /// Public half of the key pair in `slot`
    fn get_pubkey(&self, slot: u8, out: &mut [u8]) -> CryptoResult<(usize, EcType)>;

    /// Sign a precomputed digest with the private key in `slot`
    fn ecdsa_sign(&self, slot: u8, hash_type: HashType, digest: &[u8], out: &mut [u8]) -> CryptoResult<usize>;

    /// Verify a raw signature over a precomputed digest
    fn ecdsa_verify(
        &self,
        ec_type: EcType,
        pubkey: &[u8],
        hash_type: HashType,
        digest: &[u8],
        signature: &[u8],
    ) -> CryptoResult<()>;

    /// Store raw data in a slot
    fn slot_save(&mut self, slot: u8, data: &[u8]) -> CryptoResult<()>;

    /// Load raw data from a slot, returning its length
    fn slot_load(&self, slot: u8, out: &mut [u8]) -> CryptoResult<usize>;

    /// Clear a slot
    fn slot_clean(&mut self, slot: u8) -> CryptoResult<()>;
}

/// Constant-time comparison of byte slices
///
/// Slices of different length compare unequal.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

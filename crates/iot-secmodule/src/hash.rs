// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SHA-2 hash functions
//!
//! Thin wrappers over the `sha2` crate implementing the streaming
//! [`Hash`] trait, plus a one-shot dispatcher keyed by [`HashType`].

use sha2::Digest;

use crate::error::{CryptoError, CryptoResult};
use crate::traits::Hash;
use crate::types::HashType;

macro_rules! sha2_hasher {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $algo:expr, $out:expr, $block:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            inner: $inner,
        }

        impl Hash for $name {
            const ALGORITHM: HashType = $algo;
            const OUTPUT_SIZE: usize = $out;
            const BLOCK_SIZE: usize = $block;

            type Output = [u8; $out];

            fn hash(message: &[u8]) -> Self::Output {
                let mut out = [0u8; $out];
                out.copy_from_slice(&<$inner>::digest(message));
                out
            }

            fn new() -> Self {
                Self { inner: <$inner>::new() }
            }

            fn update(&mut self, data: &[u8]) {
                Digest::update(&mut self.inner, data);
            }

            fn finalize(self) -> Self::Output {
                let mut out = [0u8; $out];
                out.copy_from_slice(&self.inner.finalize());
                out
            }

            fn reset(&mut self) {
                Digest::reset(&mut self.inner);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <Self as Hash>::new()
            }
        }
    };
}

sha2_hasher!(
    /// SHA-256 hasher
    Sha256,
    sha2::Sha256,
    HashType::Sha256,
    32,
    64
);
sha2_hasher!(
    /// SHA-384 hasher
    Sha384,
    sha2::Sha384,
    HashType::Sha384,
    48,
    128
);
sha2_hasher!(
    /// SHA-512 hasher
    Sha512,
    sha2::Sha512,
    HashType::Sha512,
    64,
    128
);

/// Hash `data` with the selected algorithm into `out`
pub fn digest_into(hash_type: HashType, data: &[u8], out: &mut [u8]) -> CryptoResult<usize> {
    let len = hash_type.digest_len();
    let dst = out.get_mut(..len).ok_or(CryptoError::BufferTooSmall)?;
    match hash_type {
        HashType::Sha256 => dst.copy_from_slice(&Sha256::hash(data)),
        HashType::Sha384 => dst.copy_from_slice(&Sha384::hash(data)),
        HashType::Sha512 => dst.copy_from_slice(&Sha512::hash(data)),
    }
    Ok(len)
}

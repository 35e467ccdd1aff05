// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Software security module
//!
//! Keeps private scalars in secure-storage slots and performs ECDSA in
//! software. A private key slot holds `[ec_type:1][scalar:32]`; every other
//! slot holds opaque caller data.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use iot_hal::{RngInterface, SecureStorageInterface};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::digest_into;
use crate::traits::SecModule;
use crate::types::{EcType, HashType};

/// Size of a stored secp256r1 private key record
const PRIVATE_RECORD_SIZE: usize = 1 + 32;

/// Scalar draws before key generation gives up
const KEYGEN_ATTEMPTS: usize = 8;

/// [`SecModule`] implemented in software over a slot store and an RNG
pub struct SoftSecModule<S, R> {
    storage: S,
    rng: R,
}

impl<S: SecureStorageInterface, R: RngInterface> SoftSecModule<S, R> {
    /// Wrap a slot store and an entropy source
    pub fn new(storage: S, rng: R) -> Self {
        Self { storage, rng }
    }

    /// Underlying slot store
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying slot store, mutable
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn signing_key(&self, slot: u8) -> CryptoResult<SigningKey> {
        let mut record = [0u8; PRIVATE_RECORD_SIZE];
        let len = self.storage.read(slot, &mut record)?;
        let res = if len != PRIVATE_RECORD_SIZE || record[0] != EcType::Secp256r1 as u8 {
            Err(CryptoError::InvalidKey)
        } else {
            SigningKey::from_slice(&record[1..]).map_err(|_| CryptoError::InvalidKey)
        };
        record.zeroize();
        res
    }
}

fn require_p256(ec_type: EcType) -> CryptoResult<()> {
    if ec_type == EcType::Secp256r1 {
        Ok(())
    } else {
        Err(CryptoError::UnsupportedAlgorithm)
    }
}

impl<S: SecureStorageInterface, R: RngInterface> SecModule for SoftSecModule<S, R> {
    fn hash(&self, hash_type: HashType, data: &[u8], out: &mut [u8]) -> CryptoResult<usize> {
        digest_into(hash_type, data, out)
    }

    fn create_keypair(&mut self, slot: u8, ec_type: EcType) -> CryptoResult<()> {
        require_p256(ec_type)?;

        let mut record = [0u8; PRIVATE_RECORD_SIZE];
        record[0] = ec_type as u8;
        let mut generated = false;
        for _ in 0..KEYGEN_ATTEMPTS {
            self.rng.fill_bytes(&mut record[1..])?;
            // Rejects zero and scalars not below the group order
            if SigningKey::from_slice(&record[1..]).is_ok() {
                generated = true;
                break;
            }
        }

        let res = if generated {
            self.storage.write(slot, &record).map_err(CryptoError::from)
        } else {
            Err(CryptoError::RngFailure)
        };
        record.zeroize();
        res
    }

    fn get_pubkey(&self, slot: u8, out: &mut [u8]) -> CryptoResult<(usize, EcType)> {
        let key = self.signing_key(slot)?;
        let point = VerifyingKey::from(&key).to_encoded_point(false);
        let bytes = point.as_bytes();
        out.get_mut(..bytes.len())
            .ok_or(CryptoError::BufferTooSmall)?
            .copy_from_slice(bytes);
        Ok((bytes.len(), EcType::Secp256r1))
    }

    fn ecdsa_sign(&self, slot: u8, _hash_type: HashType, digest: &[u8], out: &mut [u8]) -> CryptoResult<usize> {
        let key = self.signing_key(slot)?;
        let signature: Signature = key.sign_prehash(digest).map_err(|_| CryptoError::SigningFailed)?;
        let bytes = signature.to_bytes();
        out.get_mut(..bytes.len())
            .ok_or(CryptoError::BufferTooSmall)?
            .copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    fn ecdsa_verify(
        &self,
        ec_type: EcType,
        pubkey: &[u8],
        _hash_type: HashType,
        digest: &[u8],
        signature: &[u8],
    ) -> CryptoResult<()> {
        require_p256(ec_type)?;
        let key = VerifyingKey::from_sec1_bytes(pubkey).map_err(|_| CryptoError::InvalidKey)?;
        let signature = Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        key.verify_prehash(digest, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    fn slot_save(&mut self, slot: u8, data: &[u8]) -> CryptoResult<()> {
        Ok(self.storage.write(slot, data)?)
    }

    fn slot_load(&self, slot: u8, out: &mut [u8]) -> CryptoResult<usize> {
        Ok(self.storage.read(slot, out)?)
    }

    fn slot_clean(&mut self, slot: u8) -> CryptoResult<()> {
        Ok(self.storage.erase(slot)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256;
    use crate::traits::Hash;
    use iot_hal::sim::{MemSecureStorage, SeededRng};

    fn create_test_module(seed: u64) -> SoftSecModule<MemSecureStorage, SeededRng> {
        SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(seed))
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut sm = create_test_module(7);
        sm.create_keypair(1, EcType::Secp256r1).unwrap();

        let mut pubkey = [0u8; 65];
        let (len, ec) = sm.get_pubkey(1, &mut pubkey).unwrap();
        assert_eq!((len, ec), (65, EcType::Secp256r1));
        assert_eq!(pubkey[0], 0x04);

        let digest = Sha256::hash(b"firmware");
        let mut sig = [0u8; 64];
        assert_eq!(sm.ecdsa_sign(1, HashType::Sha256, &digest, &mut sig), Ok(64));
        assert!(sm
            .ecdsa_verify(EcType::Secp256r1, &pubkey, HashType::Sha256, &digest, &sig)
            .is_ok());

        let other = Sha256::hash(b"tampered");
        assert_eq!(
            sm.ecdsa_verify(EcType::Secp256r1, &pubkey, HashType::Sha256, &other, &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_distinct_slots_distinct_keys() {
        let mut sm = create_test_module(11);
        sm.create_keypair(1, EcType::Secp256r1).unwrap();
        sm.create_keypair(2, EcType::Secp256r1).unwrap();
        let mut a = [0u8; 65];
        let mut b = [0u8; 65];
        sm.get_pubkey(1, &mut a).unwrap();
        sm.get_pubkey(2, &mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unsupported_curve_rejected() {
        let mut sm = create_test_module(3);
        assert_eq!(
            sm.create_keypair(1, EcType::Ed25519),
            Err(CryptoError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_opaque_slot_not_a_key() {
        let mut sm = create_test_module(5);
        sm.slot_save(4, b"signature blob").unwrap();
        let mut out = [0u8; 65];
        assert_eq!(sm.get_pubkey(4, &mut out), Err(CryptoError::InvalidKey));
        sm.slot_clean(4).unwrap();
        assert_eq!(sm.slot_load(4, &mut out), Err(CryptoError::InvalidSlot));
    }
}

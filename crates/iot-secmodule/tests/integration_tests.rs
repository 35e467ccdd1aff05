// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for iot-secmodule
//!
//! Exercises the software security module the way provisioning and the
//! verification pipelines use it: keys held in slots, digests computed
//! through the capability, signatures checked with exported public keys.

mod common {
    use iot_hal::sim::{MemSecureStorage, SeededRng};
    use iot_secmodule::SoftSecModule;

    pub type TestModule = SoftSecModule<MemSecureStorage, SeededRng>;

    pub fn create_test_module(seed: u64) -> TestModule {
        SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(seed))
    }
}

mod keypair_tests {
    use super::common::create_test_module;
    use iot_hal::{HalError, SecureStorageInterface};
    use iot_secmodule::{CryptoError, EcType, HashType, SecModule};

    #[test]
    fn test_signature_checked_by_another_module() {
        let mut device = create_test_module(100);
        let verifier = create_test_module(200);
        device.create_keypair(4, EcType::Secp256r1).unwrap();

        let mut pubkey = [0u8; 65];
        device.get_pubkey(4, &mut pubkey).unwrap();

        let mut digest = [0u8; 32];
        device.hash(HashType::Sha256, b"trust list header", &mut digest).unwrap();
        let mut sig = [0u8; 64];
        device.ecdsa_sign(4, HashType::Sha256, &digest, &mut sig).unwrap();

        assert_eq!(
            verifier.ecdsa_verify(EcType::Secp256r1, &pubkey, HashType::Sha256, &digest, &sig),
            Ok(())
        );
    }

    #[test]
    fn test_wrong_key_rejected() {
        let mut a = create_test_module(1);
        let mut b = create_test_module(2);
        a.create_keypair(1, EcType::Secp256r1).unwrap();
        b.create_keypair(1, EcType::Secp256r1).unwrap();

        let mut other_pubkey = [0u8; 65];
        b.get_pubkey(1, &mut other_pubkey).unwrap();

        let digest = [0x5Au8; 32];
        let mut sig = [0u8; 64];
        a.ecdsa_sign(1, HashType::Sha256, &digest, &mut sig).unwrap();
        assert_eq!(
            a.ecdsa_verify(EcType::Secp256r1, &other_pubkey, HashType::Sha256, &digest, &sig),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let mut sm = create_test_module(9);
        sm.create_keypair(1, EcType::Secp256r1).unwrap();
        let mut pubkey = [0u8; 65];
        sm.get_pubkey(1, &mut pubkey).unwrap();
        let digest = [1u8; 32];

        assert_eq!(
            sm.ecdsa_verify(EcType::Secp256r1, &[0x04; 12], HashType::Sha256, &digest, &[0u8; 64]),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            sm.ecdsa_verify(EcType::Secp256r1, &pubkey, HashType::Sha256, &digest, &[0u8; 10]),
            Err(CryptoError::InvalidSignature)
        );
        assert_eq!(
            sm.ecdsa_verify(EcType::Ed25519, &pubkey, HashType::Sha256, &digest, &[0u8; 64]),
            Err(CryptoError::UnsupportedAlgorithm)
        );
    }

    #[test]
    fn test_same_seed_same_key() {
        let mut a = create_test_module(42);
        let mut b = create_test_module(42);
        a.create_keypair(2, EcType::Secp256r1).unwrap();
        b.create_keypair(2, EcType::Secp256r1).unwrap();

        let (mut ka, mut kb) = ([0u8; 65], [0u8; 65]);
        a.get_pubkey(2, &mut ka).unwrap();
        b.get_pubkey(2, &mut kb).unwrap();
        assert_eq!(ka, kb);
    }

    #[test]
    fn test_empty_and_raw_slots_hold_no_key() {
        let mut sm = create_test_module(5);
        let mut out = [0u8; 65];
        assert_eq!(sm.get_pubkey(6, &mut out), Err(CryptoError::InvalidSlot));

        sm.slot_save(6, b"not a key").unwrap();
        assert_eq!(sm.get_pubkey(6, &mut out), Err(CryptoError::InvalidKey));

        let mut raw = [0u8; 16];
        assert_eq!(sm.slot_load(6, &mut raw), Ok(9));
        assert_eq!(&raw[..9], b"not a key");

        sm.slot_clean(6).unwrap();
        assert_eq!(sm.slot_load(6, &mut raw), Err(CryptoError::InvalidSlot));
    }

    #[test]
    fn test_locked_slot_keeps_key() {
        let mut sm = create_test_module(8);
        sm.create_keypair(3, EcType::Secp256r1).unwrap();
        let mut before = [0u8; 65];
        sm.get_pubkey(3, &mut before).unwrap();

        sm.storage_mut().lock_slot(3).unwrap();
        assert_eq!(sm.create_keypair(3, EcType::Secp256r1), Err(CryptoError::SlotStorage));
        assert_eq!(sm.slot_clean(3), Err(CryptoError::SlotStorage));
        assert_eq!(sm.storage().is_slot_written(3), Ok(true));

        let mut after = [0u8; 65];
        sm.get_pubkey(3, &mut after).unwrap();
        assert_eq!(before, after);
        assert_eq!(CryptoError::from(HalError::SlotLocked), CryptoError::SlotStorage);
    }

    #[test]
    fn test_output_buffers_checked() {
        let mut sm = create_test_module(12);
        sm.create_keypair(1, EcType::Secp256r1).unwrap();

        let mut short_key = [0u8; 33];
        assert_eq!(sm.get_pubkey(1, &mut short_key), Err(CryptoError::BufferTooSmall));

        let mut short_sig = [0u8; 32];
        assert_eq!(
            sm.ecdsa_sign(1, HashType::Sha256, &[3u8; 32], &mut short_sig),
            Err(CryptoError::BufferTooSmall)
        );
    }
}

mod hash_tests {
    use super::common::create_test_module;
    use iot_secmodule::{constant_time_eq, Hash, HashType, SecModule, Sha256, Sha384, Sha512};

    #[test]
    fn test_capability_matches_hashers() {
        let sm = create_test_module(0);
        let data = b"firmware body";
        let mut out = [0u8; 64];

        assert_eq!(sm.hash(HashType::Sha256, data, &mut out), Ok(32));
        assert_eq!(&out[..32], Sha256::hash(data).as_ref());
        assert_eq!(sm.hash(HashType::Sha384, data, &mut out), Ok(48));
        assert_eq!(&out[..48], Sha384::hash(data).as_ref());
        assert_eq!(sm.hash(HashType::Sha512, data, &mut out), Ok(64));
        assert_eq!(&out[..], Sha512::hash(data).as_ref());
    }

    #[test]
    fn test_streaming_over_chunks() {
        let body: Vec<u8> = (0..1000u32).map(|i| (i % 253) as u8).collect();
        let mut hasher = Sha384::new();
        for chunk in body.chunks(97) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize().as_ref(), Sha384::hash(&body).as_ref());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"sane"));
        assert!(!constant_time_eq(b"same", b"same "));
        assert!(constant_time_eq(b"", b""));
    }
}

mod types_tests {
    use iot_common::Error;
    use iot_secmodule::{CryptoError, EcType, HashType};

    #[test]
    fn test_wire_values_roundtrip() {
        for v in 1..=10u8 {
            assert_eq!(EcType::from_u8(v).map(|ec| ec as u8), Ok(v));
        }
        assert_eq!(EcType::from_u8(0), Err(CryptoError::UnsupportedAlgorithm));
        assert_eq!(HashType::from_u8(1), Ok(HashType::Sha384));
        assert!(HashType::from_u8(3).is_err());
    }

    #[test]
    fn test_only_p256_has_sizes() {
        assert_eq!(EcType::Secp256r1.signature_len(), Ok(64));
        assert_eq!(EcType::Secp256r1.pubkey_len(), Ok(65));
        assert_eq!(EcType::Secp384r1.signature_len(), Err(CryptoError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_conversion_to_sdk_errors() {
        assert_eq!(Error::from(CryptoError::InvalidSignature), Error::InvalidSignature);
        assert_eq!(Error::from(CryptoError::InvalidSlot), Error::NotFound);
        assert_eq!(Error::from(CryptoError::SlotStorage), Error::CryptoFailure);
        assert_eq!(Error::from(CryptoError::UnsupportedAlgorithm), Error::Unsupported);
    }
}

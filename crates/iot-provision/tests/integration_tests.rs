// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for iot-provision
//!
//! Tests for the chain of trust: high-level key verification against
//! provisioned recovery keys, and trust list delivery through the update
//! interface. These exercise the real crate API on the host platform.

mod verification_tests {
    use iot_common::{Error, KeyType};
    use iot_hal::sim::{MemSecureStorage, SeededRng};
    use iot_provision::sim::Factory;
    use iot_provision::slots::{save_element, ProvisionElement};
    use iot_provision::{search_hl_pubkey, verify_hl_key};
    use iot_secmodule::{EcType, SoftSecModule};

    fn create_test_device() -> SoftSecModule<MemSecureStorage, SeededRng> {
        SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(99))
    }

    #[test]
    fn test_recovery_key_trusted_as_is() {
        let factory = Factory::new(1).unwrap();
        let sm = create_test_device();
        let element = factory.provision_element(KeyType::Recovery).unwrap();
        assert_eq!(verify_hl_key(&sm, &element), Ok(()));
    }

    #[test]
    fn test_signed_key_needs_recovery() {
        let factory = Factory::new(1).unwrap();
        let mut sm = create_test_device();
        let auth = factory.provision_element(KeyType::Auth).unwrap();

        // Recovery key not provisioned yet
        assert_eq!(verify_hl_key(&sm, &auth), Err(Error::UnknownSigner));

        save_element(&mut sm, ProvisionElement::Pbr1, &factory.provision_element(KeyType::Recovery).unwrap())
            .unwrap();
        assert_eq!(verify_hl_key(&sm, &auth), Ok(()));
    }

    #[test]
    fn test_foreign_recovery_rejected() {
        let factory = Factory::new(1).unwrap();
        let rogue = Factory::new(2).unwrap();
        let mut sm = create_test_device();
        factory.provision(&mut sm).unwrap();

        let forged = rogue.provision_element(KeyType::Auth).unwrap();
        assert_eq!(verify_hl_key(&sm, &forged), Err(Error::UnknownSigner));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let factory = Factory::new(1).unwrap();
        let mut sm = create_test_device();
        factory.provision(&mut sm).unwrap();

        let mut auth = factory.provision_element(KeyType::Auth).unwrap();
        auth.push(0);
        assert_eq!(verify_hl_key(&sm, &auth), Err(Error::VerificationFailed));
    }

    #[test]
    fn test_search_finds_provisioned_keys() {
        let factory = Factory::new(1).unwrap();
        let mut sm = create_test_device();
        factory.provision(&mut sm).unwrap();

        for role in [KeyType::Recovery, KeyType::Auth, KeyType::TrustList, KeyType::Firmware] {
            let key = factory.pubkey(role).unwrap();
            assert_eq!(search_hl_pubkey(&sm, role, EcType::Secp256r1, &key), Ok(()));
        }

        let auth = factory.pubkey(KeyType::Auth).unwrap();
        assert_eq!(
            search_hl_pubkey(&sm, KeyType::Firmware, EcType::Secp256r1, &auth),
            Err(Error::UnknownSigner)
        );
        assert_eq!(
            search_hl_pubkey(&sm, KeyType::Cloud, EcType::Secp256r1, &auth),
            Err(Error::UnsupportedKeyType)
        );
    }
}

mod signature_block_tests {
    use iot_common::codec::Reader;
    use iot_common::config::SignerPolicy;
    use iot_common::{Error, KeyType, Result};
    use iot_hal::sim::{MemSecureStorage, SeededRng};
    use iot_provision::sim::Factory;
    use iot_provision::{verify_signatures, SignRecord};
    use iot_secmodule::{HashType, SecModule, SoftSecModule};

    const PAYLOAD: &[u8] = b"signed payload";

    fn create_test_block(factory: &Factory, signers: &[KeyType]) -> Vec<u8> {
        signers
            .iter()
            .flat_map(|&role| factory.sign(role, PAYLOAD).unwrap())
            .collect()
    }

    fn parse_block(block: &[u8]) -> Vec<Result<SignRecord<'_>>> {
        let mut r = Reader::new(block);
        let mut records = Vec::new();
        while r.remaining() > 0 {
            records.push(SignRecord::read(&mut r));
        }
        records
    }

    fn check(factory: &Factory, signers: &[KeyType], declared: u8) -> Result<()> {
        let mut sm = SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(7));
        factory.provision(&mut sm).unwrap();
        let mut digest = [0u8; 32];
        sm.hash(HashType::Sha256, PAYLOAD, &mut digest).unwrap();

        let policy = SignerPolicy::pair(KeyType::Auth, KeyType::Firmware);
        let block = create_test_block(factory, signers);
        verify_signatures(&sm, &policy, &digest, declared, parse_block(&block))
    }

    #[test]
    fn test_required_signers_verify() {
        let factory = Factory::new(3).unwrap();
        assert_eq!(check(&factory, &[KeyType::Firmware, KeyType::Auth], 2), Ok(()));
    }

    #[test]
    fn test_records_past_declared_count_ignored() {
        let factory = Factory::new(3).unwrap();
        let signers = [KeyType::Auth, KeyType::Firmware, KeyType::Auth];
        assert_eq!(check(&factory, &signers, 2), Ok(()));
    }

    #[test]
    fn test_short_block_rejected() {
        let factory = Factory::new(3).unwrap();
        assert_eq!(
            check(&factory, &[KeyType::Auth, KeyType::Firmware], 3),
            Err(Error::VerificationFailed)
        );
    }

    #[test]
    fn test_missing_rule_rejected() {
        let factory = Factory::new(3).unwrap();
        // The firmware signature sits past the declared count
        let signers = [KeyType::Auth, KeyType::TrustList, KeyType::Firmware];
        assert_eq!(check(&factory, &signers, 2), Err(Error::VerificationFailed));
    }
}

mod trust_list_update_tests {
    use std::cell::Cell;

    use iot_common::config::TrustListConfig;
    use iot_common::{Error, FileVersion, KeyType};
    use iot_hal::sim::{MemSecureStorage, MemStorage, SeededRng};
    use iot_provision::sim::Factory;
    use iot_provision::{TlHeader, TrustList, TrustListUpdater};
    use iot_secmodule::SoftSecModule;
    use iot_update::{UpdateInterface, FILE_TYPE_TRUST_LIST};

    type TestModule = SoftSecModule<MemSecureStorage, SeededRng>;

    thread_local! {
        static LAST_VERSION: Cell<Option<FileVersion>> = const { Cell::new(None) };
    }

    fn record_version(version: &FileVersion) {
        LAST_VERSION.with(|v| v.set(Some(*version)));
    }

    fn create_test_node(factory: &Factory, seed: u64) -> (TestModule, TrustList<MemStorage>) {
        let mut sm = SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(seed));
        factory.provision(&mut sm).unwrap();
        (sm, TrustList::new(MemStorage::new(), TrustListConfig::default()))
    }

    #[test]
    fn test_transfer_between_nodes() {
        let factory = Factory::new(7).unwrap();
        let (server_sm, mut server_tl) = create_test_node(&factory, 1);
        let (client_sm, mut client_tl) = create_test_node(&factory, 2);
        client_tl.set_version_observer(record_version);

        let blob = factory
            .trust_list(FileVersion::new(4, 0, 0, 0, 0), &[KeyType::Auth, KeyType::TrustList])
            .unwrap();
        {
            let mut server = TrustListUpdater::new(&mut server_tl, &server_sm);
            let ft = iot_update::UpdateFileType::default();
            server.set_header(&ft, &blob.header).unwrap();
            for (i, key) in blob.keys.iter().enumerate() {
                server.set_data(&ft, &blob.header, key, i as u32).unwrap();
            }
            server.set_footer(&ft, &blob.header, &blob.footer).unwrap();
        }

        let ft = server_tl.file_type();
        assert_eq!(ft.type_id, FILE_TYPE_TRUST_LIST);
        assert_eq!(ft.info.version, FileVersion::new(4, 0, 0, 0, 0));

        let mut server = TrustListUpdater::new(&mut server_tl, &server_sm);
        let mut client = TrustListUpdater::new(&mut client_tl, &client_sm);

        assert_eq!(client.get_version(&ft), Err(Error::NotFound));
        assert!(client.file_is_newer(&ft, &FileVersion::ZERO, ft.version()));

        let mut header = [0u8; TlHeader::SIZE];
        let header_len = server.get_header(&ft, &mut header).unwrap();
        let file_size = client.set_header(&ft, &header[..header_len]).unwrap();
        assert_eq!(file_size, 2);
        assert_eq!(server.file_size(&ft, &header).unwrap(), 2);

        let mut offset = 0;
        let mut buf = [0u8; 512];
        while offset < file_size {
            let len = server.get_data(&ft, &header, &mut buf, offset).unwrap();
            client.set_data(&ft, &header, &buf[..len], offset).unwrap();
            offset = server.inc_data_offset(&ft, offset, len as u32).unwrap();
        }

        assert!(server.has_footer(&ft));
        let len = server.get_footer(&ft, &header, &mut buf).unwrap();
        client.set_footer(&ft, &header, &buf[..len]).unwrap();

        assert_eq!(client.get_version(&ft), Ok(FileVersion::new(4, 0, 0, 0, 0)));
        assert_eq!(LAST_VERSION.with(Cell::get), Some(FileVersion::new(4, 0, 0, 0, 0)));
    }

    #[test]
    fn test_describe_trust_list() {
        let factory = Factory::new(7).unwrap();
        let (sm, mut tl) = create_test_node(&factory, 3);
        let ft = tl.file_type();
        let updater = TrustListUpdater::new(&mut tl, &sm);

        let mut out = String::new();
        updater
            .describe_version(&ft, &FileVersion::new(1, 2, 0, 0, 3), &mut out, true)
            .unwrap();
        assert_eq!(out, "Trust List, ver 1.2.0.0.3");
    }
}

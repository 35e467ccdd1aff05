// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Deterministic key factory
//!
//! Plays the part of the provisioning authority on a host: it owns one key
//! pair per high-level role, emits provisioning elements signed by its
//! recovery key, signs data as any role and assembles signed trust lists.

use std::vec;
use std::vec::Vec;

use iot_common::codec::Writer;
use iot_common::{Error, FileVersion, KeyType, Result};
use iot_hal::sim::{MemSecureStorage, SeededRng};
use iot_secmodule::{EcType, HashType, SecModule, SoftSecModule};

use crate::keys::{PubkeyDated, PubkeyRecord, SignRecord};
use crate::slots::{save_element, ProvisionElement};
use crate::trust_list::TlHeader;

/// Serialized size of a secp256r1 SHA-256 signature record
pub const SIGN_RECORD_SIZE: usize = SignRecord::HEADER_SIZE + 64 + 65;

/// Validity window stamped on every dated key
const START_DATE: u32 = 0x5E0B_E100;
const EXPIRE_DATE: u32 = 0x7FFF_FFFF;

/// Trust list type tag emitted by the factory
pub const TL_TYPE: u8 = 0;

/// Cloud URL carried by the factory's trust lists
pub const CLOUD_URL: &[u8] = b"https://things.example.com";

/// Trust list split into the parts it is transferred in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustListBlob {
    /// Serialized header
    pub header: Vec<u8>,
    /// Serialized dated keys
    pub keys: Vec<Vec<u8>>,
    /// Serialized footer
    pub footer: Vec<u8>,
}

impl TrustListBlob {
    /// Concatenate every part
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header.clone();
        for key in &self.keys {
            out.extend_from_slice(key);
        }
        out.extend_from_slice(&self.footer);
        out
    }
}

/// Provisioning authority with deterministic keys
pub struct Factory {
    sm: SoftSecModule<MemSecureStorage, SeededRng>,
}

impl Factory {
    const ROLES: [KeyType; 5] = [
        KeyType::Recovery,
        KeyType::Auth,
        KeyType::TrustList,
        KeyType::Firmware,
        KeyType::Cloud,
    ];

    /// Generate one key pair per role from `seed`
    pub fn new(seed: u64) -> Result<Self> {
        let mut sm = SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(seed));
        for role in Self::ROLES {
            sm.create_keypair(Self::slot(role)?, EcType::Secp256r1)?;
        }
        Ok(Self { sm })
    }

    fn slot(role: KeyType) -> Result<u8> {
        Self::ROLES
            .iter()
            .position(|&r| r == role)
            .and_then(|i| u8::try_from(i).ok())
            .ok_or(Error::UnsupportedKeyType)
    }

    /// Raw public key of a role
    pub fn pubkey(&self, role: KeyType) -> Result<Vec<u8>> {
        let mut buf = [0u8; 65];
        let (len, _) = self.sm.get_pubkey(Self::slot(role)?, &mut buf)?;
        Ok(buf[..len].to_vec())
    }

    /// Dated key record of a role
    pub fn dated_key(&self, role: KeyType, meta: &[u8]) -> Result<Vec<u8>> {
        let pubkey = self.pubkey(role)?;
        let dated = PubkeyDated {
            start_date: START_DATE,
            expire_date: EXPIRE_DATE,
            key: PubkeyRecord {
                key_type: role,
                ec_type: EcType::Secp256r1,
                meta,
                pubkey: &pubkey,
            },
        };
        let mut out = vec![0u8; dated.encoded_len()];
        dated.write(&mut Writer::new(&mut out))?;
        Ok(out)
    }

    /// Provisioning element for a high-level role
    ///
    /// Recovery keys are stored bare; every other role is countersigned by
    /// the recovery key.
    pub fn provision_element(&self, role: KeyType) -> Result<Vec<u8>> {
        let mut out = self.dated_key(role, &[])?;
        if role != KeyType::Recovery {
            let sign = self.sign(KeyType::Recovery, &out)?;
            out.extend_from_slice(&sign);
        }
        Ok(out)
    }

    /// Store the recovery, auth, trust list and firmware keys in a device
    pub fn provision<M: SecModule>(&self, sm: &mut M) -> Result<()> {
        save_element(sm, ProvisionElement::Pbr1, &self.provision_element(KeyType::Recovery)?)?;
        save_element(sm, ProvisionElement::Pba1, &self.provision_element(KeyType::Auth)?)?;
        save_element(sm, ProvisionElement::Pbt1, &self.provision_element(KeyType::TrustList)?)?;
        save_element(sm, ProvisionElement::Pbf1, &self.provision_element(KeyType::Firmware)?)?;
        Ok(())
    }

    /// SHA-256 signature record over `data` made by a role
    pub fn sign(&self, role: KeyType, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = [0u8; SIGN_RECORD_SIZE];
        let len = SignRecord::create(&self.sm, Self::slot(role)?, role, HashType::Sha256, data, &mut out)?;
        Ok(out[..len].to_vec())
    }

    /// Build a trust list holding a cloud key and the firmware key, signed by `signers`
    pub fn trust_list(&self, version: FileVersion, signers: &[KeyType]) -> Result<TrustListBlob> {
        let keys = vec![
            self.dated_key(KeyType::Cloud, CLOUD_URL)?,
            self.dated_key(KeyType::Firmware, &[])?,
        ];
        let footer_len = 1 + signers.len() * SIGN_RECORD_SIZE;
        let keys_len: usize = keys.iter().map(Vec::len).sum();

        let header = TlHeader {
            tl_size: u32::try_from(TlHeader::SIZE + keys_len + footer_len).map_err(|_| Error::StorageTooLarge)?,
            version,
            pub_keys_count: u16::try_from(keys.len()).map_err(|_| Error::IncorrectArgument)?,
            signatures_count: u8::try_from(signers.len()).map_err(|_| Error::IncorrectArgument)?,
        }
        .to_bytes()
        .to_vec();

        let mut signed = header.clone();
        for key in &keys {
            signed.extend_from_slice(key);
        }
        signed.push(TL_TYPE);

        let mut footer = vec![TL_TYPE];
        for &signer in signers {
            footer.extend_from_slice(&self.sign(signer, &signed)?);
        }

        Ok(TrustListBlob { header, keys, footer })
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! High-level key verification
//!
//! Recovery keys are trusted as provisioned. Every other high-level key is
//! stored as a dated key immediately followed by a [`SignRecord`] made by
//! one of the provisioned recovery keys:
//!
//! ```text
//! [PubkeyDated][SignRecord(signer = Recovery)]
//! ```

use iot_common::codec::Reader;
use iot_common::config::SignerPolicy;
use iot_common::{Error, KeyType, Result};
use iot_secmodule::{constant_time_eq, EcType, HashType, SecModule};

use crate::keys::{PubkeyDated, SignRecord};
use crate::slots::{load_element, ProvisionElement, PROVISION_ELEMENT_MAX_SIZE};

/// Find a provisioned key of `key_type` equal to `key` and check its chain of trust
///
/// Returns [`Error::UnknownSigner`] when no provisioned slot holds the key.
pub fn search_hl_pubkey<M: SecModule>(sm: &M, key_type: KeyType, ec_type: EcType, key: &[u8]) -> Result<()> {
    let mut buf = [0u8; PROVISION_ELEMENT_MAX_SIZE];

    for element in ProvisionElement::for_key_type(key_type)? {
        let Ok(len) = load_element(sm, element, &mut buf) else {
            continue;
        };
        let mut r = Reader::new(&buf[..len]);
        let Ok(stored) = PubkeyDated::read(&mut r) else {
            continue;
        };

        if stored.key.key_type == key_type
            && stored.key.ec_type == ec_type
            && constant_time_eq(stored.key.pubkey, key)
        {
            return verify_hl_key(sm, &buf[..len]);
        }
    }

    Err(Error::UnknownSigner)
}

/// Verify a stored high-level key against the recovery keys
pub fn verify_hl_key<M: SecModule>(sm: &M, data: &[u8]) -> Result<()> {
    let mut r = Reader::new(data);
    let dated = PubkeyDated::read(&mut r)?;

    if dated.key.key_type == KeyType::Recovery {
        return Ok(());
    }

    // 1. The signature must follow the key and end the record
    let signed_len = r.position();
    let sign = SignRecord::read(&mut r).map_err(|_| Error::VerificationFailed)?;
    if r.remaining() != 0 {
        return Err(Error::VerificationFailed);
    }

    // 2. Only recovery keys countersign high-level keys
    if sign.signer_type != KeyType::Recovery {
        return Err(Error::VerificationFailed);
    }

    // 3. Signer must itself be provisioned
    search_hl_pubkey(sm, KeyType::Recovery, sign.ec_type, sign.signer_key)?;

    // 4. Signature over the dated key
    let mut digest = [0u8; 64];
    let digest_len = sm.hash(sign.hash_type, &data[..signed_len], &mut digest)?;
    sm.ecdsa_verify(
        sign.ec_type,
        sign.signer_key,
        sign.hash_type,
        &digest[..digest_len],
        sign.signature,
    )
    .map_err(|_| Error::VerificationFailed)
}

/// Check a signature block against a signer policy
///
/// Only the first `declared` records are read; anything after them is
/// ignored. Each of them must use SHA-256 and name a provisioned high-level
/// signer. Records from required signer types are verified against
/// `digest`; the block passes when each required type verified at least once.
pub fn verify_signatures<'a, M, I>(
    sm: &M,
    policy: &SignerPolicy,
    digest: &[u8],
    declared: u8,
    records: I,
) -> Result<()>
where
    M: SecModule,
    I: IntoIterator<Item = Result<SignRecord<'a>>>,
{
    if usize::from(declared) < policy.len() {
        return Err(Error::VerificationFailed);
    }

    let mut verified: u16 = 0;
    let mut seen: usize = 0;
    for record in records.into_iter().take(usize::from(declared)) {
        let record = record.map_err(|_| Error::VerificationFailed)?;
        seen += 1;

        if record.hash_type != HashType::Sha256 {
            return Err(Error::VerificationFailed);
        }
        search_hl_pubkey(sm, record.signer_type, record.ec_type, record.signer_key)
            .map_err(|_| Error::VerificationFailed)?;

        if policy.requires(record.signer_type) {
            sm.ecdsa_verify(
                record.ec_type,
                record.signer_key,
                record.hash_type,
                digest,
                record.signature,
            )
            .map_err(|_| Error::VerificationFailed)?;
            verified |= 1 << (record.signer_type as u8);
        }
    }

    // Block ended before the declared count
    if seen < usize::from(declared) {
        return Err(Error::VerificationFailed);
    }
    let required = policy
        .iter()
        .fold(0u16, |mask, key_type| mask | 1 << (key_type as u8));
    if verified & required != required {
        return Err(Error::VerificationFailed);
    }
    Ok(())
}

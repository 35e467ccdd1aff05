// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Provisioning slot store
//!
//! Each provisioning element lives in a fixed security module slot. Two
//! slots are reserved per high-level key type so a key can be rotated
//! while the previous one stays valid.

use iot_common::codec::Writer;
use iot_common::constants::PUBKEY_MAX_SIZE;
use iot_common::{fourcc, Error, KeyType, Result};
use iot_secmodule::{EcType, SecModule};

use crate::keys::PubkeyRecord;

/// Keys provisioned per high-level key type
pub const PROVISION_KEYS_QTY: usize = 2;

/// Largest element stored in a provisioning slot
pub const PROVISION_ELEMENT_MAX_SIZE: usize = 512;

/// Security module slot numbers
pub mod slot {
    /// Device private key
    pub const PRIVATE_KEY: u8 = 0;
    /// First recovery key
    pub const REC1: u8 = 1;
    /// Second recovery key
    pub const REC2: u8 = 2;
    /// Device signature issued by the factory
    pub const SIGNATURE: u8 = 3;
    /// First auth key
    pub const AUTH1: u8 = 4;
    /// Second auth key
    pub const AUTH2: u8 = 5;
    /// First trust list key
    pub const TL1: u8 = 6;
    /// Second trust list key
    pub const TL2: u8 = 7;
    /// First firmware key
    pub const FW1: u8 = 8;
    /// Second firmware key
    pub const FW2: u8 = 9;
}

/// Provisioning element addressed by a `PRVS` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionElement {
    /// Recovery key 1
    Pbr1,
    /// Recovery key 2
    Pbr2,
    /// Auth key 1
    Pba1,
    /// Auth key 2
    Pba2,
    /// Trust list key 1
    Pbt1,
    /// Trust list key 2
    Pbt2,
    /// Firmware key 1
    Pbf1,
    /// Firmware key 2
    Pbf2,
    /// Device signature
    Sgnp,
}

impl ProvisionElement {
    /// Every element, in wire order
    pub const ALL: [Self; 9] = [
        Self::Pbr1,
        Self::Pbr2,
        Self::Pba1,
        Self::Pba2,
        Self::Pbt1,
        Self::Pbt2,
        Self::Pbf1,
        Self::Pbf2,
        Self::Sgnp,
    ];

    /// Slot holding the element
    #[must_use]
    pub const fn slot(self) -> u8 {
        match self {
            Self::Pbr1 => slot::REC1,
            Self::Pbr2 => slot::REC2,
            Self::Pba1 => slot::AUTH1,
            Self::Pba2 => slot::AUTH2,
            Self::Pbt1 => slot::TL1,
            Self::Pbt2 => slot::TL2,
            Self::Pbf1 => slot::FW1,
            Self::Pbf2 => slot::FW2,
            Self::Sgnp => slot::SIGNATURE,
        }
    }

    /// Four-character element id used on the wire
    #[must_use]
    pub const fn fourcc(self) -> u32 {
        fourcc(match self {
            Self::Pbr1 => b"PBR1",
            Self::Pbr2 => b"PBR2",
            Self::Pba1 => b"PBA1",
            Self::Pba2 => b"PBA2",
            Self::Pbt1 => b"PBT1",
            Self::Pbt2 => b"PBT2",
            Self::Pbf1 => b"PBF1",
            Self::Pbf2 => b"PBF2",
            Self::Sgnp => b"SGNP",
        })
    }

    /// Look up an element by its wire id
    #[must_use]
    pub fn from_fourcc(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.fourcc() == code)
    }

    /// Elements holding keys of a high-level type
    pub const fn for_key_type(key_type: KeyType) -> Result<[Self; PROVISION_KEYS_QTY]> {
        match key_type {
            KeyType::Recovery => Ok([Self::Pbr1, Self::Pbr2]),
            KeyType::Auth => Ok([Self::Pba1, Self::Pba2]),
            KeyType::TrustList => Ok([Self::Pbt1, Self::Pbt2]),
            KeyType::Firmware => Ok([Self::Pbf1, Self::Pbf2]),
            _ => Err(Error::UnsupportedKeyType),
        }
    }
}

/// Store an element in its slot
pub fn save_element<M: SecModule>(sm: &mut M, element: ProvisionElement, data: &[u8]) -> Result<()> {
    if data.len() > PROVISION_ELEMENT_MAX_SIZE {
        return Err(Error::StorageTooLarge);
    }
    Ok(sm.slot_save(element.slot(), data)?)
}

/// Load an element from its slot, returning its length
pub fn load_element<M: SecModule>(sm: &M, element: ProvisionElement, out: &mut [u8]) -> Result<usize> {
    Ok(sm.slot_load(element.slot(), out)?)
}

/// Write the device's own public key record to `out`
pub fn own_pubkey_record<M: SecModule>(sm: &M, out: &mut [u8]) -> Result<usize> {
    let mut pubkey = [0u8; PUBKEY_MAX_SIZE];
    let (len, ec_type) = sm.get_pubkey(slot::PRIVATE_KEY, &mut pubkey)?;
    let record = PubkeyRecord {
        key_type: KeyType::IotDevice,
        ec_type,
        meta: &[],
        pubkey: &pubkey[..len],
    };
    let mut w = Writer::new(out);
    record.write(&mut w)?;
    Ok(w.finish())
}

/// Drop the device key pair and recovery keys, then generate a fresh key pair
pub fn reset_device_keys<M: SecModule>(sm: &mut M) -> Result<()> {
    for s in [slot::PRIVATE_KEY, slot::REC1, slot::REC2] {
        sm.slot_clean(s)?;
    }
    Ok(sm.create_keypair(slot::PRIVATE_KEY, EcType::Secp256r1)?)
}

/// Check whether the device key pair exists
#[must_use]
pub fn has_device_key<M: SecModule>(sm: &M) -> bool {
    let mut pubkey = [0u8; PUBKEY_MAX_SIZE];
    sm.get_pubkey(slot::PRIVATE_KEY, &mut pubkey).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_hal::sim::{MemSecureStorage, SeededRng};
    use iot_secmodule::SoftSecModule;

    #[test]
    fn test_fourcc_lookup() {
        for element in ProvisionElement::ALL {
            assert_eq!(ProvisionElement::from_fourcc(element.fourcc()), Some(element));
        }
        assert_eq!(ProvisionElement::from_fourcc(fourcc(b"DNID")), None);
    }

    #[test]
    fn test_slots_distinct() {
        let mut seen = [false; 16];
        for element in ProvisionElement::ALL {
            let s = usize::from(element.slot());
            assert!(!seen[s]);
            seen[s] = true;
        }
        assert!(!seen[usize::from(slot::PRIVATE_KEY)]);
    }

    #[test]
    fn test_reset_device_keys() {
        let mut sm = SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(2));
        assert!(!has_device_key(&sm));
        save_element(&mut sm, ProvisionElement::Pbr1, b"old recovery").unwrap();

        reset_device_keys(&mut sm).unwrap();
        assert!(has_device_key(&sm));
        let mut buf = [0u8; 64];
        assert_eq!(load_element(&sm, ProvisionElement::Pbr1, &mut buf), Err(Error::NotFound));

        let mut record = [0u8; 128];
        assert_eq!(own_pubkey_record(&sm, &mut record), Ok(4 + 65));
        assert_eq!(record[0], KeyType::IotDevice as u8);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Key and signature records
//!
//! Records are parsed in place: the decoded structs borrow their
//! variable-length fields from the input buffer. Lengths of raw keys and
//! signatures are not carried on the wire, they follow from the curve.
//!
//! ```text
//! PubkeyRecord: [key_type:1][ec_type:1][meta_sz:2][meta][pubkey]
//! PubkeyDated:  [start_date:4][expire_date:4][PubkeyRecord]
//! SignRecord:   [signer_type:1][ec_type:1][hash_type:1][signature][signer_pubkey]
//! ```

use iot_common::codec::{Reader, Writer};
use iot_common::constants::{PUBKEY_MAX_SIZE, SECP256R1_SIGNATURE_SIZE};
use iot_common::{Error, KeyType, Result};
use iot_secmodule::{EcType, HashType, SecModule};

/// Public key with its type and optional meta data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubkeyRecord<'a> {
    /// Role of the key
    pub key_type: KeyType,
    /// Curve of the key
    pub ec_type: EcType,
    /// Opaque meta data (the cloud URL for [`KeyType::Cloud`])
    pub meta: &'a [u8],
    /// Raw public key
    pub pubkey: &'a [u8],
}

impl<'a> PubkeyRecord<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = 4;

    /// Decode from a reader
    pub fn read(r: &mut Reader<'a>) -> Result<Self> {
        let key_type = KeyType::from_u8(r.u8()?)?;
        let ec_type = EcType::from_u8(r.u8()?)?;
        let meta_sz = usize::from(r.u16()?);
        let meta = r.take(meta_sz)?;
        let pubkey = r.take(ec_type.pubkey_len()?)?;
        Ok(Self {
            key_type,
            ec_type,
            meta,
            pubkey,
        })
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        let meta_sz = u16::try_from(self.meta.len()).map_err(|_| Error::IncorrectArgument)?;
        w.u8(self.key_type as u8)?
            .u8(self.ec_type as u8)?
            .u16(meta_sz)?
            .put(self.meta)?
            .put(self.pubkey)?;
        Ok(())
    }

    /// Serialized length
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.meta.len() + self.pubkey.len()
    }
}

/// Public key with a validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubkeyDated<'a> {
    /// Start of validity
    pub start_date: u32,
    /// End of validity
    pub expire_date: u32,
    /// The key itself
    pub key: PubkeyRecord<'a>,
}

impl<'a> PubkeyDated<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = 8 + PubkeyRecord::HEADER_SIZE;

    /// Decode from a reader
    pub fn read(r: &mut Reader<'a>) -> Result<Self> {
        Ok(Self {
            start_date: r.u32()?,
            expire_date: r.u32()?,
            key: PubkeyRecord::read(r)?,
        })
    }

    /// Decode a buffer that must hold exactly one record
    pub fn parse_exact(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let record = Self::read(&mut r)?;
        if r.remaining() != 0 {
            return Err(Error::IncorrectArgument);
        }
        Ok(record)
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.start_date)?.u32(self.expire_date)?;
        self.key.write(w)
    }

    /// Serialized length
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        8 + self.key.encoded_len()
    }
}

/// Signature together with the signer's public key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignRecord<'a> {
    /// Role of the signer
    pub signer_type: KeyType,
    /// Curve of the signer key
    pub ec_type: EcType,
    /// Digest algorithm the signature covers
    pub hash_type: HashType,
    /// Raw signature
    pub signature: &'a [u8],
    /// Raw public key of the signer
    pub signer_key: &'a [u8],
}

impl<'a> SignRecord<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = 3;

    /// Decode from a reader
    pub fn read(r: &mut Reader<'a>) -> Result<Self> {
        let signer_type = KeyType::from_u8(r.u8()?)?;
        let ec_type = EcType::from_u8(r.u8()?)?;
        let hash_type = HashType::from_u8(r.u8()?)?;
        let signature = r.take(ec_type.signature_len()?)?;
        let signer_key = r.take(ec_type.pubkey_len()?)?;
        Ok(Self {
            signer_type,
            ec_type,
            hash_type,
            signature,
            signer_key,
        })
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u8(self.signer_type as u8)?
            .u8(self.ec_type as u8)?
            .u8(self.hash_type as u8)?
            .put(self.signature)?
            .put(self.signer_key)?;
        Ok(())
    }

    /// Serialized length
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.signature.len() + self.signer_key.len()
    }

    /// Hash `data`, sign it with the key pair in `slot` and write the record to `out`
    pub fn create<M: SecModule>(
        sm: &M,
        slot: u8,
        signer_type: KeyType,
        hash_type: HashType,
        data: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        let mut digest = [0u8; 64];
        let digest_len = sm.hash(hash_type, data, &mut digest)?;

        let mut pubkey = [0u8; PUBKEY_MAX_SIZE];
        let (pubkey_len, ec_type) = sm.get_pubkey(slot, &mut pubkey)?;

        let mut signature = [0u8; SECP256R1_SIGNATURE_SIZE];
        let sig_len = sm.ecdsa_sign(slot, hash_type, &digest[..digest_len], &mut signature)?;

        let record = SignRecord {
            signer_type,
            ec_type,
            hash_type,
            signature: &signature[..sig_len],
            signer_key: &pubkey[..pubkey_len],
        };
        let mut w = Writer::new(out);
        record.write(&mut w)?;
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_hal::sim::{MemSecureStorage, SeededRng};
    use iot_secmodule::SoftSecModule;

    #[test]
    fn test_dated_key_layout() {
        let pubkey = [0x04u8; 65];
        let dated = PubkeyDated {
            start_date: 1,
            expire_date: 2,
            key: PubkeyRecord {
                key_type: KeyType::Cloud,
                ec_type: EcType::Secp256r1,
                meta: b"https://cloud",
                pubkey: &pubkey,
            },
        };
        let mut buf = [0u8; 128];
        let mut w = Writer::new(&mut buf);
        dated.write(&mut w).unwrap();
        let len = w.finish();
        assert_eq!(len, dated.encoded_len());
        assert_eq!(len, 12 + 13 + 65);
        assert_eq!(&buf[8..12], &[9, 3, 0, 13]);

        let parsed = PubkeyDated::parse_exact(&buf[..len]).unwrap();
        assert_eq!(parsed, dated);
        assert_eq!(PubkeyDated::parse_exact(&buf[..len + 1]), Err(Error::IncorrectArgument));
    }

    #[test]
    fn test_unknown_curve_rejected() {
        let raw = [0u8, 0, 0, 0, 0, 0, 0, 0, KeyType::Auth as u8, 10, 0, 0];
        assert_eq!(PubkeyDated::parse_exact(&raw), Err(Error::Unsupported));
    }

    #[test]
    fn test_create_sign_record() {
        let mut sm = SoftSecModule::new(MemSecureStorage::new(), SeededRng::new(21));
        sm.create_keypair(0, EcType::Secp256r1).unwrap();

        let mut out = [0u8; 160];
        let len = SignRecord::create(&sm, 0, KeyType::IotDevice, HashType::Sha256, b"payload", &mut out).unwrap();
        assert_eq!(len, 3 + 64 + 65);

        let record = SignRecord::read(&mut Reader::new(&out[..len])).unwrap();
        assert_eq!(record.signer_type, KeyType::IotDevice);

        let mut digest = [0u8; 32];
        sm.hash(HashType::Sha256, b"payload", &mut digest).unwrap();
        assert!(sm
            .ecdsa_verify(record.ec_type, record.signer_key, record.hash_type, &digest, record.signature)
            .is_ok());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Trust list wire structures and storage naming

use iot_common::codec::{Reader, Writer};
use iot_common::{Error, FileVersion, Result};
use iot_hal::{HalResult, StorageElementId};

use crate::keys::SignRecord;

/// Trust list header
///
/// Wire layout (23 bytes):
/// `[tl_size:4][version:16][pub_keys_count:2][signatures_count:1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlHeader {
    /// Total serialized size of header, keys and footer
    pub tl_size: u32,
    /// Trust list version
    pub version: FileVersion,
    /// Number of keys that follow
    pub pub_keys_count: u16,
    /// Number of signatures in the footer
    pub signatures_count: u8,
}

impl TlHeader {
    /// Serialized size in bytes
    pub const SIZE: usize = 4 + FileVersion::SIZE + 2 + 1;

    /// Decode a buffer holding exactly one header
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::IncorrectArgument);
        }
        let mut r = Reader::new(data);
        Ok(Self {
            tl_size: r.u32()?,
            version: FileVersion::read(&mut r)?,
            pub_keys_count: r.u16()?,
            signatures_count: r.u8()?,
        })
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.tl_size)?;
        self.version.write(w)?;
        w.u16(self.pub_keys_count)?.u8(self.signatures_count)?;
        Ok(())
    }

    /// Encode into the wire form
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        // Cannot fail: the buffer has the exact size.
        let _ = self.write(&mut Writer::new(&mut out));
        out
    }
}

/// Trust list footer
///
/// Wire layout: `[tl_type:1][SignRecord; signatures_count]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlFooter<'a> {
    /// Trust list type tag, covered by the signatures
    pub tl_type: u8,
    /// Concatenated signature records
    pub signatures: &'a [u8],
}

impl<'a> TlFooter<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = 1;

    /// Split a footer into its tag and signature area
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let (&tl_type, signatures) = data.split_first().ok_or(Error::IncorrectArgument)?;
        Ok(Self { tl_type, signatures })
    }

    /// Iterate over the signature records
    pub fn records(&self) -> impl Iterator<Item = Result<SignRecord<'a>>> {
        let mut r = Reader::new(self.signatures);
        let mut failed = false;
        core::iter::from_fn(move || {
            if failed || r.remaining() == 0 {
                return None;
            }
            let record = SignRecord::read(&mut r);
            failed = record.is_err();
            Some(record)
        })
    }
}

/// Part of a trust list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TlElement {
    /// Header
    Header = 1,
    /// One key
    Key = 2,
    /// Footer
    Footer = 3,
}

/// Trust list store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TlStore {
    /// Factory copy, replaced only by a verified update
    Static = 0,
    /// Copy served to readers
    Dynamic = 1,
    /// Staging area for an incoming trust list
    Tmp = 2,
}

impl TlStore {
    /// Every store
    pub const ALL: [Self; 3] = [Self::Static, Self::Dynamic, Self::Tmp];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    /// Storage element holding one part of this store
    pub fn element_id(self, element: TlElement, index: u16) -> HalResult<StorageElementId> {
        let [hi, lo] = index.to_be_bytes();
        StorageElementId::from_parts(&[b"TL", &[self as u8, element as u8, hi, lo]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size_and_layout() {
        let header = TlHeader {
            tl_size: 0x0000_0200,
            version: FileVersion::new(2, 1, 0, 0, 9),
            pub_keys_count: 3,
            signatures_count: 2,
        };
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 23);
        assert_eq!(&bytes[..4], &[0, 0, 2, 0]);
        assert_eq!(&bytes[20..], &[0, 3, 2]);
        assert_eq!(TlHeader::from_bytes(&bytes), Ok(header));
        assert_eq!(TlHeader::from_bytes(&bytes[..22]), Err(Error::IncorrectArgument));
    }

    #[test]
    fn test_element_ids_distinct() {
        let a = TlStore::Tmp.element_id(TlElement::Key, 1).unwrap();
        let b = TlStore::Dynamic.element_id(TlElement::Key, 1).unwrap();
        let c = TlStore::Tmp.element_id(TlElement::Key, 2).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(&a.0[..6], &[b'T', b'L', 2, 2, 0, 1]);
    }

    #[test]
    fn test_footer_needs_tag() {
        assert_eq!(TlFooter::parse(&[]), Err(Error::IncorrectArgument));
        let footer = TlFooter::parse(&[7]).unwrap();
        assert_eq!(footer.tl_type, 7);
        assert_eq!(footer.records().count(), 0);
    }
}

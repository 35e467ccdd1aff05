// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware descriptor, footer and header codecs
//!
//! All integers are big-endian on the wire and in storage.

use iot_common::codec::{Reader, Writer};
use iot_common::config::SignerPolicy;
use iot_common::{Error, FileInfo, FileVersion, Result};
use iot_provision::SignRecord;

/// Serialized size of a secp256r1 SHA-256 signature record
pub const SIGN_RECORD_SIZE: usize = SignRecord::HEADER_SIZE + 64 + 65;

/// Largest number of signatures a footer may carry
pub const MAX_SIGNATURES: usize = 4;

/// Largest footer the pipeline handles
pub const FOOTER_MAX_SIZE: usize = FirmwareFooter::HEADER_SIZE + MAX_SIGNATURES * SIGN_RECORD_SIZE;

/// Identity and geometry of a firmware image
///
/// Wire layout (47 bytes):
/// `[info:36][padding:1][chunk_size:2][firmware_length:4][app_size:4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareDescriptor {
    /// Product and version
    pub info: FileInfo,
    /// Reserved
    pub padding: u8,
    /// Preferred I/O chunk
    pub chunk_size: u16,
    /// Body length
    pub firmware_length: u32,
    /// Size of the installed application: body, fill and footer
    pub app_size: u32,
}

impl FirmwareDescriptor {
    /// Serialized size in bytes
    pub const SIZE: usize = FileInfo::SIZE + 1 + 2 + 4 + 4;

    /// Descriptor with only the product identity set
    #[must_use]
    pub fn for_product(info: &FileInfo) -> Self {
        Self {
            info: FileInfo {
                manufacture_id: info.manufacture_id,
                device_type: info.device_type,
                version: FileVersion::ZERO,
            },
            ..Self::default()
        }
    }

    /// Decode from a reader
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            info: FileInfo::read(r)?,
            padding: r.u8()?,
            chunk_size: r.u16()?,
            firmware_length: r.u32()?,
            app_size: r.u32()?,
        })
    }

    /// Decode from exactly [`SIZE`](Self::SIZE) bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::IncorrectArgument);
        }
        Self::read(&mut Reader::new(data))
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        self.info.write(w)?;
        w.u8(self.padding)?
            .u16(self.chunk_size)?
            .u32(self.firmware_length)?
            .u32(self.app_size)?;
        Ok(())
    }

    /// Encode into a fixed array
    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        let mut out = [0u8; Self::SIZE];
        self.write(&mut Writer::new(&mut out))?;
        Ok(out)
    }

    /// Check that two descriptors belong to the same product
    #[must_use]
    pub fn same_product(&self, other: &Self) -> bool {
        self.info.same_product(&other.info)
    }
}

/// Signed trailer of a firmware image
///
/// Wire layout: `[signatures_count:1][descriptor:47][SignRecord; count]`.
/// The signatures cover body, fill and the fixed part (count and
/// descriptor).
#[derive(Debug, Clone, Copy)]
pub struct FirmwareFooter<'a> {
    /// Number of signature records
    pub signatures_count: u8,
    /// Descriptor of the signed image
    pub descriptor: FirmwareDescriptor,
    /// Exactly `signatures_count` concatenated records
    pub signatures: &'a [u8],
}

impl<'a> FirmwareFooter<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = 1 + FirmwareDescriptor::SIZE;

    /// Parse a footer, ignoring trailing bytes
    ///
    /// Every declared record must be well formed.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let signatures_count = r.u8()?;
        let descriptor = FirmwareDescriptor::read(&mut r)?;

        let start = r.position();
        for _ in 0..signatures_count {
            SignRecord::read(&mut r)?;
        }
        let signatures = &data[start..r.position()];

        Ok(Self {
            signatures_count,
            descriptor,
            signatures,
        })
    }

    /// Serialized length of the footer
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.signatures.len()
    }

    /// Iterate over the signature records
    pub fn records(&self) -> impl Iterator<Item = Result<SignRecord<'a>>> {
        let mut r = Reader::new(self.signatures);
        (0..self.signatures_count).map(move |_| SignRecord::read(&mut r))
    }

    /// Footer length for an image signed once by every signer of `policy`
    #[must_use]
    pub fn expected_len(policy: &SignerPolicy) -> usize {
        Self::HEADER_SIZE + policy.len() * SIGN_RECORD_SIZE
    }
}

/// Header announcing a firmware image on the delivery channel
///
/// Wire layout (64 bytes):
/// `[code_offset:4][code_length:4][footer_offset:4][footer_length:4][signatures_count:1][descriptor:47]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FirmwareHeader {
    /// Offset of the body in a serialized image, equal to [`SIZE`](Self::SIZE)
    pub code_offset: u32,
    /// Body length
    pub code_length: u32,
    /// Offset of the footer in a serialized image
    pub footer_offset: u32,
    /// Footer length
    pub footer_length: u32,
    /// Number of signatures in the footer
    pub signatures_count: u8,
    /// Image descriptor
    pub descriptor: FirmwareDescriptor,
}

impl FirmwareHeader {
    /// Serialized size in bytes
    pub const SIZE: usize = 4 * 4 + 1 + FirmwareDescriptor::SIZE;

    /// Header for a descriptor and a footer of the given shape
    pub fn new(descriptor: FirmwareDescriptor, footer_length: usize, signatures_count: u8) -> Result<Self> {
        let code_offset = Self::SIZE as u32;
        let footer_length = u32::try_from(footer_length).map_err(|_| Error::IncorrectArgument)?;
        Ok(Self {
            code_offset,
            code_length: descriptor.firmware_length,
            footer_offset: code_offset
                .checked_add(descriptor.firmware_length)
                .ok_or(Error::IncorrectArgument)?,
            footer_length,
            signatures_count,
            descriptor,
        })
    }

    /// Decode from exactly [`SIZE`](Self::SIZE) bytes
    ///
    /// The code length must agree with the descriptor.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != Self::SIZE {
            return Err(Error::IncorrectArgument);
        }
        let mut r = Reader::new(data);
        let header = Self {
            code_offset: r.u32()?,
            code_length: r.u32()?,
            footer_offset: r.u32()?,
            footer_length: r.u32()?,
            signatures_count: r.u8()?,
            descriptor: FirmwareDescriptor::read(&mut r)?,
        };
        if header.code_length != header.descriptor.firmware_length {
            return Err(Error::IncorrectArgument);
        }
        Ok(header)
    }

    /// Encode into a fixed array
    pub fn to_bytes(&self) -> Result<[u8; Self::SIZE]> {
        let mut out = [0u8; Self::SIZE];
        let mut w = Writer::new(&mut out);
        w.u32(self.code_offset)?
            .u32(self.code_length)?
            .u32(self.footer_offset)?
            .u32(self.footer_length)?
            .u8(self.signatures_count)?;
        self.descriptor.write(&mut w)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::{DeviceType, KeyType, ManufactureId};

    fn create_test_descriptor() -> FirmwareDescriptor {
        FirmwareDescriptor {
            info: FileInfo {
                manufacture_id: ManufactureId::from_label(b"ACME0001").unwrap(),
                device_type: DeviceType::from_label(b"LAMP").unwrap(),
                version: FileVersion::new(1, 2, 3, 0, 42),
            },
            padding: 0,
            chunk_size: 256,
            firmware_length: 2048,
            app_size: 4096,
        }
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(FirmwareDescriptor::SIZE, 47);
        assert_eq!(FirmwareFooter::HEADER_SIZE, 48);
        assert_eq!(FirmwareHeader::SIZE, 64);
        assert_eq!(
            FirmwareFooter::expected_len(&SignerPolicy::pair(KeyType::Auth, KeyType::Firmware)),
            48 + 2 * 132
        );
    }

    #[test]
    fn test_descriptor_big_endian() {
        let bytes = create_test_descriptor().to_bytes().unwrap();
        assert_eq!(&bytes[37..39], &[0x01, 0x00]);
        assert_eq!(&bytes[39..43], &[0x00, 0x00, 0x08, 0x00]);
        assert_eq!(FirmwareDescriptor::from_bytes(&bytes).unwrap(), create_test_descriptor());
        assert!(FirmwareDescriptor::from_bytes(&bytes[..46]).is_err());
    }

    #[test]
    fn test_header_offsets() {
        let header = FirmwareHeader::new(create_test_descriptor(), 312, 2).unwrap();
        assert_eq!(header.code_offset, 64);
        assert_eq!(header.footer_offset, 64 + 2048);

        let mut bytes = header.to_bytes().unwrap();
        assert_eq!(FirmwareHeader::from_bytes(&bytes).unwrap(), header);

        // Code length disagreeing with the descriptor
        bytes[7] ^= 1;
        assert_eq!(FirmwareHeader::from_bytes(&bytes), Err(Error::IncorrectArgument));
    }

    #[test]
    fn test_footer_without_signatures() {
        let mut data = [0u8; FirmwareFooter::HEADER_SIZE + 5];
        data[1..48].copy_from_slice(&create_test_descriptor().to_bytes().unwrap());
        let footer = FirmwareFooter::parse(&data).unwrap();
        assert_eq!(footer.encoded_len(), 48);
        assert_eq!(footer.records().count(), 0);

        // Declared record missing
        data[0] = 1;
        assert!(FirmwareFooter::parse(&data).is_err());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FLDT wire structures
//!
//! Every message starts with the [`UpdateFileType`] it concerns. Variable
//! parts carry a `u16` length prefix.

use iot_common::codec::{Reader, Writer};
use iot_common::{Error, MacAddr, Result};
use iot_update::UpdateFileType;

/// Service id
pub const FLDT_SERVICE_ID: u32 = iot_common::fourcc(b"FLDT");

/// Largest file header carried by `GNFH`
pub const FLDT_HEADER_MAX_SIZE: usize = 128;

/// Element ids
pub mod element {
    use iot_common::fourcc;

    /// New file announcement from a gateway
    pub const INFV: u32 = fourcc(b"INFV");
    /// Get file type information
    pub const GFTI: u32 = fourcc(b"GFTI");
    /// Get new file header
    pub const GNFH: u32 = fourcc(b"GNFH");
    /// Get new file data
    pub const GNFD: u32 = fourcc(b"GNFD");
    /// Get new file footer
    pub const GNFF: u32 = fourcc(b"GNFF");
}

fn put_sized(w: &mut Writer<'_>, data: &[u8]) -> Result<()> {
    let len = u16::try_from(data.len()).map_err(|_| Error::BufferTooSmall)?;
    w.u16(len)?.put(data)?;
    Ok(())
}

fn finish_exact(r: &Reader<'_>) -> Result<()> {
    if r.remaining() == 0 {
        Ok(())
    } else {
        Err(Error::MalformedFrame)
    }
}

/// `INFV` request and `GFTI` response: a file a gateway can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfoWire {
    /// File and the version available
    pub file_type: UpdateFileType,
    /// Gateway serving it
    pub gateway_mac: MacAddr,
}

impl FileInfoWire {
    /// Serialized size
    pub const SIZE: usize = UpdateFileType::SIZE + MacAddr::SIZE;

    /// Decode a whole message
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let info = Self {
            file_type: UpdateFileType::read(&mut r)?,
            gateway_mac: MacAddr(r.array()?),
        };
        finish_exact(&r)?;
        Ok(info)
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        w.put(self.gateway_mac.as_bytes())?;
        Ok(w.finish())
    }
}

/// `GFTI`, `GNFH` and `GNFF` requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRequest {
    /// File the request concerns
    pub file_type: UpdateFileType,
}

impl TypeRequest {
    /// Serialized size
    pub const SIZE: usize = UpdateFileType::SIZE;

    /// Decode a whole message
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let file_type = UpdateFileType::read(&mut r)?;
        finish_exact(&r)?;
        Ok(Self { file_type })
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        Ok(w.finish())
    }
}

/// `GNFH` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderResponse<'a> {
    /// File and the version served
    pub file_type: UpdateFileType,
    /// Data size in offset units
    pub file_size: u32,
    /// A footer follows the data
    pub has_footer: bool,
    /// Serialized file header
    pub header: &'a [u8],
}

impl<'a> HeaderResponse<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = UpdateFileType::SIZE + 4 + 1 + 2;

    /// Decode a whole message
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let file_type = UpdateFileType::read(&mut r)?;
        let file_size = r.u32()?;
        let has_footer = r.u8()? != 0;
        let len = usize::from(r.u16()?);
        let header = r.take(len)?;
        finish_exact(&r)?;
        Ok(Self {
            file_type,
            file_size,
            has_footer,
            header,
        })
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        w.u32(self.file_size)?.u8(u8::from(self.has_footer))?;
        put_sized(&mut w, self.header)?;
        Ok(w.finish())
    }
}

/// `GNFD` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {
    /// File the request concerns
    pub file_type: UpdateFileType,
    /// Requested offset
    pub offset: u32,
}

impl DataRequest {
    /// Serialized size
    pub const SIZE: usize = UpdateFileType::SIZE + 4;

    /// Decode a whole message
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let request = Self {
            file_type: UpdateFileType::read(&mut r)?,
            offset: r.u32()?,
        };
        finish_exact(&r)?;
        Ok(request)
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        w.u32(self.offset)?;
        Ok(w.finish())
    }
}

/// `GNFD` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataResponse<'a> {
    /// File the data belongs to
    pub file_type: UpdateFileType,
    /// Offset of this chunk
    pub offset: u32,
    /// Offset to request next
    pub next_offset: u32,
    /// Chunk bytes
    pub data: &'a [u8],
}

impl<'a> DataResponse<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = UpdateFileType::SIZE + 4 + 4 + 2;

    /// Decode a whole message
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let file_type = UpdateFileType::read(&mut r)?;
        let offset = r.u32()?;
        let next_offset = r.u32()?;
        let len = usize::from(r.u16()?);
        let chunk = r.take(len)?;
        finish_exact(&r)?;
        Ok(Self {
            file_type,
            offset,
            next_offset,
            data: chunk,
        })
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        w.u32(self.offset)?.u32(self.next_offset)?;
        put_sized(&mut w, self.data)?;
        Ok(w.finish())
    }
}

/// `GNFF` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FooterResponse<'a> {
    /// File the footer belongs to
    pub file_type: UpdateFileType,
    /// Serialized footer
    pub footer: &'a [u8],
}

impl<'a> FooterResponse<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = UpdateFileType::SIZE + 2;

    /// Decode a whole message
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut r = Reader::new(data);
        let file_type = UpdateFileType::read(&mut r)?;
        let len = usize::from(r.u16()?);
        let footer = r.take(len)?;
        finish_exact(&r)?;
        Ok(Self { file_type, footer })
    }

    /// Encode into `out`
    pub fn write(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = Writer::new(out);
        self.file_type.write(&mut w)?;
        put_sized(&mut w, self.footer)?;
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::{DeviceType, FileInfo, FileVersion, ManufactureId};
    use iot_update::FILE_TYPE_FIRMWARE;

    fn create_test_type() -> UpdateFileType {
        UpdateFileType::new(
            FILE_TYPE_FIRMWARE,
            FileInfo {
                manufacture_id: ManufactureId::from_label(b"ACME0001").unwrap(),
                device_type: DeviceType::from_label(b"LAMP").unwrap(),
                version: FileVersion::new(0, 5, 0, 0, 0),
            },
        )
    }

    #[test]
    fn test_fixed_sizes() {
        assert_eq!(FileInfoWire::SIZE, 44);
        assert_eq!(DataRequest::SIZE, 42);
        assert_eq!(DataResponse::HEADER_SIZE, 48);
    }

    #[test]
    fn test_header_response_layout() {
        let response = HeaderResponse {
            file_type: create_test_type(),
            file_size: 2048,
            has_footer: true,
            header: &[0xAA; 64],
        };
        let mut out = [0u8; 256];
        let len = response.write(&mut out).unwrap();
        assert_eq!(len, HeaderResponse::HEADER_SIZE + 64);
        assert_eq!(&out[UpdateFileType::SIZE..UpdateFileType::SIZE + 7], &[0, 0, 8, 0, 1, 0, 64]);
        assert_eq!(HeaderResponse::parse(&out[..len]), Ok(response));
    }

    #[test]
    fn test_data_response_length_checked() {
        let response = DataResponse {
            file_type: create_test_type(),
            offset: 512,
            next_offset: 1024,
            data: &[1, 2, 3],
        };
        let mut out = [0u8; 64];
        let len = response.write(&mut out).unwrap();
        assert_eq!(DataResponse::parse(&out[..len]), Ok(response));
        assert!(DataResponse::parse(&out[..len - 1]).is_err());
        assert_eq!(DataResponse::parse(&out[..=len]), Err(Error::MalformedFrame));
    }
}

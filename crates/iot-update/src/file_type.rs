// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Update file types

use core::fmt;

use iot_common::codec::{Reader, Writer};
use iot_common::{FileInfo, FileVersion, Result};

/// Firmware image
pub const FILE_TYPE_FIRMWARE: u16 = 0;

/// Trust list
pub const FILE_TYPE_TRUST_LIST: u16 = 1;

/// First identifier available to applications
pub const FILE_TYPE_USER: u16 = 256;

/// Kind and identity of a distributable file
///
/// Wire layout (38 bytes): `[type:2][info:36]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateFileType {
    /// File kind (`FILE_TYPE_*`)
    pub type_id: u16,
    /// Product and version the file belongs to
    pub info: FileInfo,
}

impl UpdateFileType {
    /// Serialized size in bytes
    pub const SIZE: usize = 2 + FileInfo::SIZE;

    /// Create a file type
    #[must_use]
    pub const fn new(type_id: u16, info: FileInfo) -> Self {
        Self { type_id, info }
    }

    /// Check whether two descriptors name the same file, whatever the version
    #[must_use]
    pub fn same_kind(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.info.same_product(&other.info)
    }

    /// Version carried by the descriptor
    #[must_use]
    pub const fn version(&self) -> &FileVersion {
        &self.info.version
    }

    /// Copy of the descriptor with another version
    #[must_use]
    pub const fn with_version(mut self, version: FileVersion) -> Self {
        self.info.version = version;
        self
    }

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            type_id: r.u16()?,
            info: FileInfo::read(r)?,
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u16(self.type_id)?;
        self.info.write(w)
    }
}

impl fmt::Display for UpdateFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.type_id {
            FILE_TYPE_FIRMWARE => "firmware",
            FILE_TYPE_TRUST_LIST => "trust list",
            _ => "user file",
        };
        write!(
            f,
            "{} {:?}/{:?}",
            kind, self.info.manufacture_id, self.info.device_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::{DeviceType, ManufactureId};

    fn create_test_type(major: u8) -> UpdateFileType {
        UpdateFileType::new(
            FILE_TYPE_FIRMWARE,
            FileInfo {
                manufacture_id: ManufactureId::from_label(b"ACME0001").unwrap(),
                device_type: DeviceType::from_label(b"LAMP").unwrap(),
                version: FileVersion::new(major, 0, 0, 0, 0),
            },
        )
    }

    #[test]
    fn test_same_kind_ignores_version() {
        let a = create_test_type(1);
        let b = create_test_type(5);
        assert!(a.same_kind(&b));
        assert_ne!(a, b);

        let tl = UpdateFileType { type_id: FILE_TYPE_TRUST_LIST, ..a };
        assert!(!a.same_kind(&tl));
    }

    #[test]
    fn test_wire_size() {
        let ft = create_test_type(3);
        let mut buf = [0u8; UpdateFileType::SIZE];
        let mut w = Writer::new(&mut buf);
        ft.write(&mut w).unwrap();
        assert_eq!(w.finish(), 38);
        assert_eq!(&buf[..2], &[0, 0]);
        assert_eq!(&buf[2..10], b"ACME0001");
        assert_eq!(UpdateFileType::read(&mut Reader::new(&buf)).unwrap(), ft);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! File versions
//!
//! Every distributable file (firmware image, trust list) carries a
//! [`FileVersion`]. Only the ordinal fields (major, minor, patch,
//! milestone, build) take part in "is newer" decisions; the application
//! tag and the build timestamp are informational.

use core::cmp::Ordering;
use core::fmt;

use crate::codec::{Reader, Writer};
use crate::errors::Result;

/// Version of a distributable file
///
/// Wire layout (16 bytes, big-endian):
///
/// ```text
/// [app_type:4][major:1][minor:1][patch:1][milestone:1][build:4][timestamp:4]
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileVersion {
    /// Application tag (four ASCII characters)
    pub app_type: [u8; 4],
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
    /// Development milestone
    pub milestone: u8,
    /// Build number
    pub build: u32,
    /// Build timestamp (seconds since the SDK epoch)
    pub timestamp: u32,
}

impl FileVersion {
    /// Serialized size in bytes
    pub const SIZE: usize = 16;

    /// Version 0.0.0.0 with no tag
    pub const ZERO: Self = Self::new(0, 0, 0, 0, 0);

    /// Create a version with an empty application tag and timestamp
    #[must_use]
    pub const fn new(major: u8, minor: u8, patch: u8, milestone: u8, build: u32) -> Self {
        Self {
            app_type: [0; 4],
            major,
            minor,
            patch,
            milestone,
            build,
            timestamp: 0,
        }
    }

    /// Set the application tag
    #[must_use]
    pub const fn with_app_type(mut self, app_type: [u8; 4]) -> Self {
        self.app_type = app_type;
        self
    }

    /// Set the build timestamp
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Compare the ordinal fields only
    ///
    /// Two versions that differ just in `app_type` or `timestamp` compare
    /// as [`Ordering::Equal`].
    #[must_use]
    pub fn ordinal_cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch, self.milestone, self.build).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.milestone,
            other.build,
        ))
    }

    /// Check if this version is strictly newer than `other`
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.ordinal_cmp(other) == Ordering::Greater
    }

    /// Decode from the 16-byte wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            app_type: r.array()?,
            major: r.u8()?,
            minor: r.u8()?,
            patch: r.u8()?,
            milestone: r.u8()?,
            build: r.u32()?,
            timestamp: r.u32()?,
        })
    }

    /// Encode into the 16-byte wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.put(&self.app_type)?
            .u8(self.major)?
            .u8(self.minor)?
            .u8(self.patch)?
            .u8(self.milestone)?
            .u32(self.build)?
            .u32(self.timestamp)?;
        Ok(())
    }
}

impl fmt::Debug for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileVersion({self} @{})", self.timestamp)
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.milestone, self.build
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_fields_gate_newer() {
        let base = FileVersion::new(1, 2, 3, 0, 10);
        assert!(FileVersion::new(1, 2, 3, 0, 11).is_newer_than(&base));
        assert!(FileVersion::new(1, 2, 3, 1, 0).is_newer_than(&base));
        assert!(FileVersion::new(2, 0, 0, 0, 0).is_newer_than(&base));
        assert!(!FileVersion::new(1, 2, 2, 9, 99).is_newer_than(&base));
    }

    #[test]
    fn test_tag_and_timestamp_ignored() {
        let installed = FileVersion::new(1, 2, 3, 4, 5)
            .with_app_type(*b"APP0")
            .with_timestamp(100);
        let candidate = FileVersion::new(1, 2, 3, 4, 5)
            .with_app_type(*b"APP1")
            .with_timestamp(999);
        assert_eq!(candidate.ordinal_cmp(&installed), Ordering::Equal);
        assert!(!candidate.is_newer_than(&installed));
        assert_ne!(candidate, installed);
    }

    #[test]
    fn test_wire_layout() {
        let v = FileVersion::new(1, 2, 3, 4, 0x0102_0304)
            .with_app_type(*b"FWAP")
            .with_timestamp(0x0A0B_0C0D);
        let mut buf = [0u8; FileVersion::SIZE];
        v.write(&mut Writer::new(&mut buf)).unwrap();
        assert_eq!(&buf[..4], b"FWAP");
        assert_eq!(&buf[4..8], &[1, 2, 3, 4]);
        assert_eq!(&buf[8..12], &[1, 2, 3, 4]);
        assert_eq!(&buf[12..], &[0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(FileVersion::read(&mut Reader::new(&buf)).unwrap(), v);
    }
}

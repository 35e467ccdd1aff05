// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Update interface
//!
//! The serving side of a transfer uses the `get_*` half, the receiving side
//! the `set_*` half. Headers and footers are opaque blobs in their wire
//! form; data is addressed by offsets the interface itself defines through
//! [`inc_data_offset`](UpdateInterface::inc_data_offset), so a trust list
//! can count keys while a firmware image counts bytes.

use core::fmt;

use iot_common::{FileVersion, Result};

use crate::file_type::UpdateFileType;

/// Storage and verification backend for one kind of update file
pub trait UpdateInterface {
    /// Largest header this file kind produces
    fn header_size(&self, file_type: &UpdateFileType) -> Result<usize>;

    /// Amount of data described by a header, in offset units
    fn file_size(&self, file_type: &UpdateFileType, header: &[u8]) -> Result<u32>;

    /// Check whether a footer follows the data
    fn has_footer(&self, file_type: &UpdateFileType) -> bool;

    /// Offset that follows `current` once `loaded` bytes were transferred
    fn inc_data_offset(&self, file_type: &UpdateFileType, current: u32, loaded: u32) -> Result<u32>;

    /// Version of the locally stored file
    ///
    /// Returns [`Error::NotFound`](iot_common::Error::NotFound) when no file is stored.
    fn get_version(&mut self, file_type: &UpdateFileType) -> Result<FileVersion>;

    /// Serialize the stored header into `buffer`
    fn get_header(&mut self, file_type: &UpdateFileType, buffer: &mut [u8]) -> Result<usize>;

    /// Read data at `offset` into `buffer`, returning the amount read
    fn get_data(&mut self, file_type: &UpdateFileType, header: &[u8], buffer: &mut [u8], offset: u32)
        -> Result<usize>;

    /// Serialize the stored footer into `buffer`
    fn get_footer(&mut self, file_type: &UpdateFileType, header: &[u8], buffer: &mut [u8]) -> Result<usize>;

    /// Accept a new header, returning the size of the data that follows
    fn set_header(&mut self, file_type: &UpdateFileType, header: &[u8]) -> Result<u32>;

    /// Accept data at `offset`
    fn set_data(&mut self, file_type: &UpdateFileType, header: &[u8], data: &[u8], offset: u32) -> Result<()>;

    /// Accept the footer and verify the complete file
    fn set_footer(&mut self, file_type: &UpdateFileType, header: &[u8], footer: &[u8]) -> Result<()>;

    /// Release per-file resources
    fn free_item(&mut self, _file_type: &UpdateFileType) {}

    /// Decide whether `candidate` should replace `available`
    fn file_is_newer(&self, _file_type: &UpdateFileType, available: &FileVersion, candidate: &FileVersion) -> bool {
        candidate.is_newer_than(available)
    }

    /// Human-readable file kind
    fn describe_type(&self, file_type: &UpdateFileType, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{file_type}")
    }

    /// Human-readable version, optionally prefixed with the file kind
    fn describe_version(
        &self,
        file_type: &UpdateFileType,
        version: &FileVersion,
        out: &mut dyn fmt::Write,
        with_type: bool,
    ) -> fmt::Result {
        if with_type {
            self.describe_type(file_type, out)?;
            out.write_str(", ")?;
        }
        write!(out, "ver {version}")
    }
}

/// Resolves file types to their update interfaces
///
/// Interfaces usually borrow engine state (a security module, a storage
/// backend) from the implementor, so access is scoped to a closure.
pub trait UpdateRegistry {
    /// Run `f` against the interface serving `file_type`
    ///
    /// Returns `None` when the file type is unknown.
    fn with_interface<R>(
        &mut self,
        file_type: &UpdateFileType,
        f: impl FnOnce(&mut dyn UpdateInterface) -> R,
    ) -> Option<R>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::{Error, FileInfo};

    struct NullInterface;

    impl UpdateInterface for NullInterface {
        fn header_size(&self, _: &UpdateFileType) -> Result<usize> {
            Ok(0)
        }
        fn file_size(&self, _: &UpdateFileType, _: &[u8]) -> Result<u32> {
            Ok(0)
        }
        fn has_footer(&self, _: &UpdateFileType) -> bool {
            false
        }
        fn inc_data_offset(&self, _: &UpdateFileType, current: u32, loaded: u32) -> Result<u32> {
            Ok(current + loaded)
        }
        fn get_version(&mut self, _: &UpdateFileType) -> Result<FileVersion> {
            Err(Error::NotFound)
        }
        fn get_header(&mut self, _: &UpdateFileType, _: &mut [u8]) -> Result<usize> {
            Err(Error::NotFound)
        }
        fn get_data(&mut self, _: &UpdateFileType, _: &[u8], _: &mut [u8], _: u32) -> Result<usize> {
            Err(Error::NotFound)
        }
        fn get_footer(&mut self, _: &UpdateFileType, _: &[u8], _: &mut [u8]) -> Result<usize> {
            Err(Error::NotFound)
        }
        fn set_header(&mut self, _: &UpdateFileType, _: &[u8]) -> Result<u32> {
            Ok(0)
        }
        fn set_data(&mut self, _: &UpdateFileType, _: &[u8], _: &[u8], _: u32) -> Result<()> {
            Ok(())
        }
        fn set_footer(&mut self, _: &UpdateFileType, _: &[u8], _: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_newer_predicate() {
        let ft = UpdateFileType::new(crate::FILE_TYPE_USER, FileInfo::default());
        let iface = NullInterface;
        let old = FileVersion::new(0, 0, 0, 0, 0);
        let new = FileVersion::new(0, 0, 0, 0, 1);
        assert!(iface.file_is_newer(&ft, &old, &new));
        assert!(!iface.file_is_newer(&ft, &new, &old));
    }

    #[test]
    fn test_describe_version_with_type() {
        let ft = UpdateFileType::new(crate::FILE_TYPE_USER, FileInfo::default());
        let mut out: heapless::String<96> = heapless::String::new();
        NullInterface
            .describe_version(&ft, &FileVersion::new(1, 2, 3, 4, 5), &mut out, true)
            .unwrap();
        assert!(out.starts_with("user file"));
        assert!(out.ends_with(", ver 1.2.3.4.5"));
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Trust list as an update file
//!
//! Data offsets count keys rather than bytes: offset `n` carries key `n`
//! and every transfer step advances by one.

use iot_common::{Error, FileInfo, FileVersion, Result};
use iot_hal::StorageInterface;
use iot_secmodule::SecModule;
use iot_update::{UpdateFileType, UpdateInterface, FILE_TYPE_TRUST_LIST};

use super::engine::TrustList;
use super::format::{TlElement, TlHeader};

/// [`UpdateInterface`] over a trust list engine and a security module
pub struct TrustListUpdater<'a, S: StorageInterface, M: SecModule> {
    tl: &'a mut TrustList<S>,
    sm: &'a M,
}

impl<'a, S: StorageInterface, M: SecModule> TrustListUpdater<'a, S, M> {
    /// Borrow the engine and security module for one operation
    pub fn new(tl: &'a mut TrustList<S>, sm: &'a M) -> Self {
        Self { tl, sm }
    }
}

impl<S: StorageInterface> TrustList<S> {
    /// Update file type describing the trust list in use
    #[must_use]
    pub fn file_type(&self) -> UpdateFileType {
        let info = FileInfo {
            version: self.version().unwrap_or(FileVersion::ZERO),
            ..FileInfo::default()
        };
        UpdateFileType::new(FILE_TYPE_TRUST_LIST, info)
    }
}

fn offset_to_index(offset: u32) -> Result<u16> {
    u16::try_from(offset).map_err(|_| Error::IncorrectArgument)
}

impl<S: StorageInterface, M: SecModule> UpdateInterface for TrustListUpdater<'_, S, M> {
    fn header_size(&self, _file_type: &UpdateFileType) -> Result<usize> {
        Ok(TlHeader::SIZE)
    }

    fn file_size(&self, _file_type: &UpdateFileType, header: &[u8]) -> Result<u32> {
        Ok(u32::from(TlHeader::from_bytes(header)?.pub_keys_count))
    }

    fn has_footer(&self, _file_type: &UpdateFileType) -> bool {
        true
    }

    fn inc_data_offset(&self, _file_type: &UpdateFileType, current: u32, _loaded: u32) -> Result<u32> {
        current.checked_add(1).ok_or(Error::IncorrectArgument)
    }

    fn get_version(&mut self, _file_type: &UpdateFileType) -> Result<FileVersion> {
        self.tl.version().ok_or(Error::NotFound)
    }

    fn get_header(&mut self, _file_type: &UpdateFileType, buffer: &mut [u8]) -> Result<usize> {
        self.tl.load_part(TlElement::Header, 0, buffer)
    }

    fn get_data(&mut self, _file_type: &UpdateFileType, _header: &[u8], buffer: &mut [u8], offset: u32) -> Result<usize> {
        self.tl.load_part(TlElement::Key, offset_to_index(offset)?, buffer)
    }

    fn get_footer(&mut self, _file_type: &UpdateFileType, _header: &[u8], buffer: &mut [u8]) -> Result<usize> {
        self.tl.load_part(TlElement::Footer, 0, buffer)
    }

    fn set_header(&mut self, file_type: &UpdateFileType, header: &[u8]) -> Result<u32> {
        self.tl.save_part(self.sm, TlElement::Header, header)?;
        self.file_size(file_type, header)
    }

    fn set_data(&mut self, _file_type: &UpdateFileType, _header: &[u8], data: &[u8], _offset: u32) -> Result<()> {
        self.tl.save_part(self.sm, TlElement::Key, data)
    }

    fn set_footer(&mut self, _file_type: &UpdateFileType, _header: &[u8], footer: &[u8]) -> Result<()> {
        self.tl.save_part(self.sm, TlElement::Footer, footer)
    }

    fn describe_type(&self, _file_type: &UpdateFileType, out: &mut dyn core::fmt::Write) -> core::fmt::Result {
        out.write_str("Trust List")
    }
}

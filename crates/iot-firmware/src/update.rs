// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware as an update file
//!
//! The header is a [`FirmwareHeader`], data offsets are body byte offsets
//! and the footer is the signed image footer. A completed footer triggers
//! verification; an image that fails it, or whose footer cannot be stored
//! or installed, is deleted. Until the footer is in place a received image
//! does not change the reported version. A verified image for
//! the running product is installed right away, images for other products
//! are kept so they can be served.

use core::fmt;

use iot_common::{log_warn, Error, FileInfo, FileVersion, Result};
use iot_hal::{FirmwareInstallInterface, StorageInterface};
use iot_secmodule::SecModule;
use iot_update::{UpdateFileType, UpdateInterface, FILE_TYPE_FIRMWARE};

use crate::format::{FirmwareDescriptor, FirmwareFooter, FirmwareHeader, FOOTER_MAX_SIZE};
use crate::install::own_descriptor;
use crate::store::{FirmwareStore, SOURCE};

/// Update file type of a product's firmware
#[must_use]
pub fn firmware_file_type(info: FileInfo) -> UpdateFileType {
    UpdateFileType::new(FILE_TYPE_FIRMWARE, info)
}

/// [`UpdateInterface`] over a firmware store, a security module and an install target
pub struct FirmwareUpdater<'a, S, M, I>
where
    S: StorageInterface,
    M: SecModule,
    I: FirmwareInstallInterface,
{
    store: &'a mut FirmwareStore<S>,
    sm: &'a M,
    target: &'a mut I,
}

impl<'a, S, M, I> FirmwareUpdater<'a, S, M, I>
where
    S: StorageInterface,
    M: SecModule,
    I: FirmwareInstallInterface,
{
    /// Borrow the store, security module and install target for one operation
    pub fn new(store: &'a mut FirmwareStore<S>, sm: &'a M, target: &'a mut I) -> Self {
        Self { store, sm, target }
    }

    fn stored_header(&mut self, file_type: &UpdateFileType) -> Result<FirmwareHeader> {
        let info = &file_type.info;
        let descriptor = match self.store.load_descriptor(&info.manufacture_id, &info.device_type) {
            Ok(descriptor) => descriptor,
            Err(Error::NotFound) => FirmwareDescriptor::for_product(info),
            Err(e) => return Err(e),
        };

        let mut footer = [0u8; FOOTER_MAX_SIZE];
        match self.store.load_footer(&descriptor, &mut footer) {
            Ok(len) => FirmwareHeader::new(descriptor, len, footer[0]),
            Err(_) => {
                let policy = self.store.config().signers;
                let count = u8::try_from(policy.len()).unwrap_or(u8::MAX);
                FirmwareHeader::new(descriptor, FirmwareFooter::expected_len(&policy), count)
            }
        }
    }

    fn is_own_product(&self, descriptor: &FirmwareDescriptor) -> bool {
        own_descriptor(&*self.target).is_ok_and(|own| own.same_product(descriptor))
    }

    /// Stored descriptor of a product, only once its footer is in place
    fn complete_descriptor(&mut self, info: &FileInfo) -> Result<Option<FirmwareDescriptor>> {
        let descriptor = match self.store.load_descriptor(&info.manufacture_id, &info.device_type) {
            Ok(descriptor) => descriptor,
            Err(Error::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };
        match self.store.footer_len(&descriptor) {
            Ok(_) => Ok(Some(descriptor)),
            Err(Error::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn seal(&mut self, descriptor: &FirmwareDescriptor, footer: &[u8]) -> Result<()> {
        self.store.save_footer(descriptor, footer)?;
        self.store
            .verify(self.sm, descriptor)
            .map_err(|_| Error::VerificationFailed)?;
        if self.is_own_product(descriptor) {
            self.store.install(&mut *self.target, descriptor)?;
        }
        Ok(())
    }
}

fn write_label(out: &mut dyn fmt::Write, label: &[u8]) -> fmt::Result {
    let end = label.iter().position(|&b| b == 0).unwrap_or(label.len());
    match core::str::from_utf8(&label[..end]) {
        Ok(text) => out.write_str(text),
        Err(_) => label.iter().try_for_each(|b| write!(out, "{b:02x}")),
    }
}

impl<S, M, I> UpdateInterface for FirmwareUpdater<'_, S, M, I>
where
    S: StorageInterface,
    M: SecModule,
    I: FirmwareInstallInterface,
{
    fn header_size(&self, _file_type: &UpdateFileType) -> Result<usize> {
        Ok(FirmwareHeader::SIZE)
    }

    fn file_size(&self, _file_type: &UpdateFileType, header: &[u8]) -> Result<u32> {
        Ok(FirmwareHeader::from_bytes(header)?.code_length)
    }

    fn has_footer(&self, _file_type: &UpdateFileType) -> bool {
        true
    }

    fn inc_data_offset(&self, _file_type: &UpdateFileType, current: u32, loaded: u32) -> Result<u32> {
        current.checked_add(loaded).ok_or(Error::IncorrectArgument)
    }

    fn get_version(&mut self, file_type: &UpdateFileType) -> Result<FileVersion> {
        let info = &file_type.info;
        // A partially received image never counts
        let stored = self.complete_descriptor(info)?.map(|d| d.info.version);
        let running = match own_descriptor(&*self.target) {
            Ok(own) if own.info.same_product(info) => Some(own.info.version),
            _ => None,
        };
        match (stored, running) {
            (Some(stored), Some(running)) if running.is_newer_than(&stored) => Ok(running),
            (Some(version), _) | (None, Some(version)) => Ok(version),
            (None, None) => Err(Error::NotFound),
        }
    }

    fn get_header(&mut self, file_type: &UpdateFileType, buffer: &mut [u8]) -> Result<usize> {
        let header = self.stored_header(file_type)?.to_bytes()?;
        buffer
            .get_mut(..header.len())
            .ok_or(Error::BufferTooSmall)?
            .copy_from_slice(&header);
        Ok(header.len())
    }

    fn get_data(&mut self, _file_type: &UpdateFileType, header: &[u8], buffer: &mut [u8], offset: u32) -> Result<usize> {
        let header = FirmwareHeader::from_bytes(header)?;
        self.store.load_chunk(&header.descriptor, offset, buffer)
    }

    fn get_footer(&mut self, _file_type: &UpdateFileType, header: &[u8], buffer: &mut [u8]) -> Result<usize> {
        let header = FirmwareHeader::from_bytes(header)?;
        self.store.load_footer(&header.descriptor, buffer)
    }

    fn set_header(&mut self, file_type: &UpdateFileType, header: &[u8]) -> Result<u32> {
        let header = FirmwareHeader::from_bytes(header)?;
        if !header.descriptor.info.same_product(&file_type.info) {
            return Err(Error::IncorrectArgument);
        }
        self.store.begin_image(&header.descriptor)?;
        Ok(header.code_length)
    }

    fn set_data(&mut self, _file_type: &UpdateFileType, header: &[u8], data: &[u8], offset: u32) -> Result<()> {
        let header = FirmwareHeader::from_bytes(header)?;
        self.store.save_chunk(&header.descriptor, data, offset)
    }

    fn set_footer(&mut self, _file_type: &UpdateFileType, header: &[u8], footer: &[u8]) -> Result<()> {
        let descriptor = FirmwareHeader::from_bytes(header)?.descriptor;
        if let Err(e) = self.seal(&descriptor, footer) {
            log_warn!(
                self.store.logs,
                self.store.ops,
                SOURCE,
                "firmware {} dropped: {}",
                descriptor.info.version,
                e
            );
            self.store.delete_firmware(&descriptor)?;
            return Err(e);
        }
        Ok(())
    }

    fn free_item(&mut self, file_type: &UpdateFileType) {
        // Abandoned transfer: drop what was received unless it is complete
        let info = &file_type.info;
        let Ok(descriptor) = self.store.load_descriptor(&info.manufacture_id, &info.device_type) else {
            return;
        };
        if matches!(self.store.footer_len(&descriptor), Err(Error::NotFound)) {
            if let Err(e) = self.store.delete_firmware(&descriptor) {
                log_warn!(self.store.logs, self.store.ops, SOURCE, "cannot drop partial image: {}", e);
            }
        }
    }

    fn describe_type(&self, file_type: &UpdateFileType, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("Firmware (manufacturer = \"")?;
        write_label(out, file_type.info.manufacture_id.as_bytes())?;
        out.write_str("\", device = \"")?;
        write_label(out, file_type.info.device_type.as_bytes())?;
        out.write_str("\")")
    }
}

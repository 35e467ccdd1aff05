// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Version gating and image install

use iot_common::{log_info, log_warn, Error, Result};
use iot_hal::{FirmwareInstallInterface, StorageInterface};
use iot_update::compare_version;

use crate::format::{FirmwareDescriptor, FirmwareFooter, FOOTER_MAX_SIZE};
use crate::store::{FirmwareStore, SOURCE};
use crate::verify::{fill_size, piece_len, IO_CHUNK};

/// Descriptor of the running image, read from its footer
pub fn own_descriptor<I: FirmwareInstallInterface>(target: &I) -> Result<FirmwareDescriptor> {
    let mut buf = [0u8; FOOTER_MAX_SIZE];
    let len = target.own_footer(&mut buf)?;
    Ok(FirmwareFooter::parse(&buf[..len])?.descriptor)
}

/// Accept `candidate` only for the running product and only when newer
pub fn compare_own_version<I: FirmwareInstallInterface>(target: &I, candidate: &FirmwareDescriptor) -> Result<()> {
    let own = own_descriptor(target)?;
    if !own.same_product(candidate) {
        return Err(Error::IncorrectArgument);
    }
    compare_version(&candidate.info.version, &own.info.version)
}

impl<S: StorageInterface> FirmwareStore<S> {
    /// Write a stored image into the install area
    ///
    /// The image is laid out exactly as it was hashed: body, `0xFF` fill,
    /// footer.
    pub fn install<I: FirmwareInstallInterface>(&mut self, target: &mut I, descriptor: &FirmwareDescriptor) -> Result<()> {
        self.ops = self.ops.wrapping_add(1);

        // 1. Version gate
        if let Err(e) = compare_own_version(target, descriptor) {
            log_warn!(self.logs, self.ops, SOURCE, "install of {} refused: {}", descriptor.info.version, e);
            return Err(e);
        }

        let footer_len = self.footer_len(descriptor)?;
        let fill = fill_size(descriptor, footer_len)?;
        target.prepare_space()?;
        let mut buf = [0u8; IO_CHUNK];

        // 2. Body
        let mut offset: u32 = 0;
        while offset < descriptor.firmware_length {
            let len = piece_len(descriptor, descriptor.firmware_length - offset)?;
            let read = self.load_chunk(descriptor, offset, &mut buf[..len])?;
            if read == 0 {
                return Err(Error::FileRead);
            }
            target.append_data(&buf[..read])?;
            offset += read as u32;
        }

        // 3. Fill
        buf.fill(0xFF);
        let mut left = fill;
        while left > 0 {
            let len = piece_len(descriptor, left)?;
            target.append_data(&buf[..len])?;
            left -= len as u32;
        }

        // 4. Footer
        let mut footer = [0u8; FOOTER_MAX_SIZE];
        let len = self.load_footer(descriptor, &mut footer)?;
        target.append_data(&footer[..len])?;

        log_info!(self.logs, self.ops, SOURCE, "firmware {} installed", descriptor.info.version);
        Ok(())
    }
}

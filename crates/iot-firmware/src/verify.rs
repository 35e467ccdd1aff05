// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware image verification

use iot_common::{log_info, log_warn, Error, Result};
use iot_hal::storage::read_at;
use iot_hal::StorageInterface;
use iot_provision::verify_signatures;
use iot_secmodule::{Hash, SecModule, Sha256};

use crate::format::{FirmwareDescriptor, FirmwareFooter, FOOTER_MAX_SIZE};
use crate::store::{data_id, FirmwareStore, SOURCE};

/// Largest piece read or hashed at once
pub(crate) const IO_CHUNK: usize = 512;

/// Number of `0xFF` bytes between the body and the footer
///
/// Fails with [`Error::InvalidImageLayout`] when body and footer do not fit
/// in `app_size`.
pub fn fill_size(descriptor: &FirmwareDescriptor, footer_len: usize) -> Result<u32> {
    let footer_len = u32::try_from(footer_len).map_err(|_| Error::InvalidImageLayout)?;
    descriptor
        .app_size
        .checked_sub(descriptor.firmware_length)
        .and_then(|rest| rest.checked_sub(footer_len))
        .ok_or(Error::InvalidImageLayout)
}

/// Size of the next piece given the descriptor's chunk size
pub(crate) fn piece_len(descriptor: &FirmwareDescriptor, remaining: u32) -> Result<usize> {
    if descriptor.chunk_size == 0 {
        return Err(Error::IncorrectArgument);
    }
    let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
    Ok(usize::from(descriptor.chunk_size).min(IO_CHUNK).min(remaining))
}

impl<S: StorageInterface> FirmwareStore<S> {
    /// SHA-256 over body, fill and the fixed footer part of a stored image
    pub fn image_digest(&mut self, descriptor: &FirmwareDescriptor) -> Result<[u8; 32]> {
        let footer_len = self.footer_len(descriptor)?;
        let fill = fill_size(descriptor, footer_len)?;
        let mut hasher = Sha256::default();
        let mut buf = [0u8; IO_CHUNK];

        // 1. Body
        let mut offset: u32 = 0;
        while offset < descriptor.firmware_length {
            let len = piece_len(descriptor, descriptor.firmware_length - offset)?;
            let read = self.load_chunk(descriptor, offset, &mut buf[..len])?;
            if read == 0 {
                return Err(Error::FileRead);
            }
            hasher.update(&buf[..read]);
            offset += read as u32;
        }

        // 2. Fill
        buf.fill(0xFF);
        let mut left = fill;
        while left > 0 {
            let len = piece_len(descriptor, left)?;
            hasher.update(&buf[..len]);
            left -= len as u32;
        }

        // 3. Signature count and descriptor
        let mut fixed = [0u8; FirmwareFooter::HEADER_SIZE];
        read_at(
            &mut self.storage,
            &data_id(descriptor)?,
            descriptor.firmware_length as usize,
            &mut fixed,
        )?;
        hasher.update(&fixed);

        Ok(hasher.finalize())
    }

    /// Verify a stored image against the signer policy
    ///
    /// The footer must carry the descriptor the image was stored under and
    /// a valid signature from every required signer type.
    pub fn verify<M: SecModule>(&mut self, sm: &M, descriptor: &FirmwareDescriptor) -> Result<()> {
        self.ops = self.ops.wrapping_add(1);
        match self.check_image(sm, descriptor) {
            Ok(()) => {
                log_info!(self.logs, self.ops, SOURCE, "firmware {} verified", descriptor.info.version);
                Ok(())
            }
            Err(e) => {
                log_warn!(self.logs, self.ops, SOURCE, "firmware {} rejected: {}", descriptor.info.version, e);
                Err(e)
            }
        }
    }

    fn check_image<M: SecModule>(&mut self, sm: &M, descriptor: &FirmwareDescriptor) -> Result<()> {
        let digest = self.image_digest(descriptor)?;

        let mut buf = [0u8; FOOTER_MAX_SIZE];
        let len = self.load_footer(descriptor, &mut buf)?;
        let footer = FirmwareFooter::parse(&buf[..len]).map_err(|_| Error::VerificationFailed)?;
        if footer.descriptor != *descriptor {
            return Err(Error::VerificationFailed);
        }

        let policy = self.config.signers;
        verify_signatures(sm, &policy, &digest, footer.signatures_count, footer.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::FileInfo;

    fn create_test_descriptor(firmware_length: u32, app_size: u32) -> FirmwareDescriptor {
        FirmwareDescriptor {
            info: FileInfo::default(),
            padding: 0,
            chunk_size: 128,
            firmware_length,
            app_size,
        }
    }

    #[test]
    fn test_fill_accounting() {
        assert_eq!(fill_size(&create_test_descriptor(1000, 2000), 312), Ok(688));
        assert_eq!(fill_size(&create_test_descriptor(1000, 1312), 312), Ok(0));
        assert_eq!(
            fill_size(&create_test_descriptor(1000, 1311), 312),
            Err(Error::InvalidImageLayout)
        );
        assert_eq!(fill_size(&create_test_descriptor(1000, 900), 0), Err(Error::InvalidImageLayout));
    }

    #[test]
    fn test_piece_len() {
        let descriptor = create_test_descriptor(0, 0);
        assert_eq!(piece_len(&descriptor, 1000), Ok(128));
        assert_eq!(piece_len(&descriptor, 5), Ok(5));

        let large = FirmwareDescriptor {
            chunk_size: 4096,
            ..descriptor
        };
        assert_eq!(piece_len(&large, 10_000), Ok(IO_CHUNK));

        let zero = FirmwareDescriptor {
            chunk_size: 0,
            ..descriptor
        };
        assert_eq!(piece_len(&zero, 10), Err(Error::IncorrectArgument));
    }
}

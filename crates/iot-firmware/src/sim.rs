// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Signed image builder
//!
//! Produces firmware images signed by a provisioning [`Factory`], laid
//! out as the device stores and installs them.

use std::vec;
use std::vec::Vec;

use iot_common::codec::Writer;
use iot_common::{Error, FileInfo, KeyType, Result};
use iot_provision::sim::Factory;

use crate::format::{FirmwareDescriptor, FirmwareFooter, FirmwareHeader, SIGN_RECORD_SIZE};

/// A complete signed firmware image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    /// Image descriptor
    pub descriptor: FirmwareDescriptor,
    /// Body
    pub body: Vec<u8>,
    /// Serialized footer with signatures
    pub footer: Vec<u8>,
}

impl FirmwareImage {
    /// Build and sign an image
    ///
    /// `fill` is the number of `0xFF` bytes between body and footer.
    pub fn build(
        factory: &Factory,
        info: FileInfo,
        body: Vec<u8>,
        chunk_size: u16,
        fill: u32,
        signers: &[KeyType],
    ) -> Result<Self> {
        let signatures_count = u8::try_from(signers.len()).map_err(|_| Error::IncorrectArgument)?;
        let footer_len = FirmwareFooter::HEADER_SIZE + signers.len() * SIGN_RECORD_SIZE;
        let firmware_length = u32::try_from(body.len()).map_err(|_| Error::IncorrectArgument)?;
        let app_size = u32::try_from(footer_len)
            .ok()
            .and_then(|footer_len| firmware_length.checked_add(fill)?.checked_add(footer_len))
            .ok_or(Error::IncorrectArgument)?;

        let descriptor = FirmwareDescriptor {
            info,
            padding: 0,
            chunk_size,
            firmware_length,
            app_size,
        };

        let mut footer = vec![0u8; FirmwareFooter::HEADER_SIZE];
        {
            let mut w = Writer::new(&mut footer);
            w.u8(signatures_count)?;
            descriptor.write(&mut w)?;
        }

        let mut signed = body.clone();
        signed.resize(body.len() + fill as usize, 0xFF);
        signed.extend_from_slice(&footer);
        for &signer in signers {
            footer.extend_from_slice(&factory.sign(signer, &signed)?);
        }

        Ok(Self { descriptor, body, footer })
    }

    /// Header announcing the image
    pub fn header(&self) -> Result<FirmwareHeader> {
        FirmwareHeader::new(self.descriptor, self.footer.len(), self.footer[0])
    }

    /// Serialized header
    pub fn header_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.header()?.to_bytes()?.to_vec())
    }

    /// Bytes the install area holds after installing the image
    #[must_use]
    pub fn installed_bytes(&self) -> Vec<u8> {
        let fill = self.descriptor.app_size as usize - self.body.len() - self.footer.len();
        let mut out = self.body.clone();
        out.resize(self.body.len() + fill, 0xFF);
        out.extend_from_slice(&self.footer);
        out
    }
}

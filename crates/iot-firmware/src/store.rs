// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware descriptor and image storage
//!
//! Descriptors live in one flat file of fixed-size records scanned
//! linearly. Each product has a data file holding the body at offset zero
//! and the footer at `firmware_length`.

use heapless::Vec;

use iot_common::config::FirmwareConfig;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, DeviceType, Error, ManufactureId, Result};
use iot_hal::storage::{element_size, read_at, remove, write_at};
use iot_hal::{StorageElementId, StorageInterface};

use crate::format::{FirmwareDescriptor, FirmwareFooter, FOOTER_MAX_SIZE};

/// Most products a descriptor file tracks
pub const MAX_DESCRIPTORS: usize = 16;

const DESCRIPTORS_FILE: &[u8] = b"firmware_descriptors";

pub(crate) const SOURCE: &str = "fw";

/// Firmware storage over a storage backend
pub struct FirmwareStore<S: StorageInterface> {
    pub(crate) storage: S,
    pub(crate) config: FirmwareConfig,
    pub(crate) logs: LogBuffer,
    pub(crate) ops: u32,
}

fn descriptors_id() -> Result<StorageElementId> {
    Ok(StorageElementId::from_bytes(DESCRIPTORS_FILE)?)
}

pub(crate) fn data_id(descriptor: &FirmwareDescriptor) -> Result<StorageElementId> {
    Ok(StorageElementId::from_parts(&[
        b"FW",
        descriptor.info.manufacture_id.as_bytes(),
        descriptor.info.device_type.as_bytes(),
    ])?)
}

fn record_offset(index: usize) -> usize {
    index * FirmwareDescriptor::SIZE
}

impl<S: StorageInterface> FirmwareStore<S> {
    /// Create a store
    pub fn new(storage: S, config: FirmwareConfig) -> Self {
        Self {
            storage,
            config,
            logs: LogBuffer::new(),
            ops: 0,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &FirmwareConfig {
        &self.config
    }

    /// Log ring
    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Storage backend, mutable
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Release the storage backend
    pub fn deinit(&mut self) -> Result<()> {
        Ok(self.storage.deinit()?)
    }

    // =========================================================================
    // Descriptors
    // =========================================================================

    fn descriptor_count(&mut self) -> Result<usize> {
        let size = element_size(&mut self.storage, &descriptors_id()?)?;
        Ok(size.map_or(0, |size| size / FirmwareDescriptor::SIZE))
    }

    fn descriptor_at(&mut self, index: usize) -> Result<FirmwareDescriptor> {
        let mut buf = [0u8; FirmwareDescriptor::SIZE];
        read_at(&mut self.storage, &descriptors_id()?, record_offset(index), &mut buf)?;
        FirmwareDescriptor::from_bytes(&buf)
    }

    fn find_descriptor(
        &mut self,
        manufacture_id: &ManufactureId,
        device_type: &DeviceType,
    ) -> Result<Option<(usize, FirmwareDescriptor)>> {
        for index in 0..self.descriptor_count()? {
            let descriptor = self.descriptor_at(index)?;
            if descriptor.info.manufacture_id == *manufacture_id && descriptor.info.device_type == *device_type {
                return Ok(Some((index, descriptor)));
            }
        }
        Ok(None)
    }

    /// Store a descriptor, replacing the record of the same product
    pub fn save_descriptor(&mut self, descriptor: &FirmwareDescriptor) -> Result<()> {
        let info = &descriptor.info;
        let index = match self.find_descriptor(&info.manufacture_id, &info.device_type)? {
            Some((index, _)) => index,
            None => {
                let count = self.descriptor_count()?;
                if count >= MAX_DESCRIPTORS {
                    return Err(Error::StorageTooLarge);
                }
                count
            }
        };
        write_at(
            &mut self.storage,
            &descriptors_id()?,
            record_offset(index),
            &descriptor.to_bytes()?,
        )?;
        Ok(())
    }

    /// Descriptor stored for a product
    pub fn load_descriptor(
        &mut self,
        manufacture_id: &ManufactureId,
        device_type: &DeviceType,
    ) -> Result<FirmwareDescriptor> {
        self.find_descriptor(manufacture_id, device_type)?
            .map(|(_, descriptor)| descriptor)
            .ok_or(Error::NotFound)
    }

    /// Start receiving a new image: store its descriptor and drop old data
    pub fn begin_image(&mut self, descriptor: &FirmwareDescriptor) -> Result<()> {
        self.ops = self.ops.wrapping_add(1);
        self.save_descriptor(descriptor)?;
        remove(&mut self.storage, &data_id(descriptor)?)?;
        log_debug!(
            self.logs,
            self.ops,
            SOURCE,
            "receiving {:?} {}",
            descriptor.info.device_type,
            descriptor.info.version
        );
        Ok(())
    }

    /// Remove the descriptor and data file of a product
    pub fn delete_firmware(&mut self, descriptor: &FirmwareDescriptor) -> Result<()> {
        self.ops = self.ops.wrapping_add(1);
        let mut kept: Vec<FirmwareDescriptor, MAX_DESCRIPTORS> = Vec::new();
        for index in 0..self.descriptor_count()? {
            let stored = self.descriptor_at(index)?;
            if !stored.same_product(descriptor) {
                kept.push(stored).map_err(|_| Error::StorageTooLarge)?;
            }
        }

        let id = descriptors_id()?;
        remove(&mut self.storage, &id)?;
        for (index, stored) in kept.iter().enumerate() {
            write_at(&mut self.storage, &id, record_offset(index), &stored.to_bytes()?)?;
        }

        remove(&mut self.storage, &data_id(descriptor)?)?;
        log_info!(
            self.logs,
            self.ops,
            SOURCE,
            "deleted firmware {:?} {}",
            descriptor.info.device_type,
            descriptor.info.version
        );
        Ok(())
    }

    // =========================================================================
    // Image data
    // =========================================================================

    /// Store part of the body
    pub fn save_chunk(&mut self, descriptor: &FirmwareDescriptor, chunk: &[u8], offset: u32) -> Result<()> {
        if chunk.is_empty() {
            return Err(Error::NullArgument);
        }
        let len = u32::try_from(chunk.len()).map_err(|_| Error::IncorrectArgument)?;
        match offset.checked_add(len) {
            Some(end) if end <= descriptor.firmware_length => {}
            _ => return Err(Error::IncorrectArgument),
        }
        write_at(&mut self.storage, &data_id(descriptor)?, offset as usize, chunk)?;
        Ok(())
    }

    /// Read body bytes at `offset`, returning how many were read
    pub fn load_chunk(&mut self, descriptor: &FirmwareDescriptor, offset: u32, buffer: &mut [u8]) -> Result<usize> {
        if offset >= descriptor.firmware_length {
            return Err(Error::IncorrectArgument);
        }
        let left = (descriptor.firmware_length - offset) as usize;
        let len = buffer.len().min(left);
        read_at(&mut self.storage, &data_id(descriptor)?, offset as usize, &mut buffer[..len])?;
        Ok(len)
    }

    /// Store the footer after the body
    ///
    /// Bytes past the last declared signature are not stored.
    pub fn save_footer(&mut self, descriptor: &FirmwareDescriptor, footer: &[u8]) -> Result<()> {
        let len = FirmwareFooter::parse(footer)?.encoded_len();
        if len > FOOTER_MAX_SIZE {
            return Err(Error::StorageTooLarge);
        }
        write_at(
            &mut self.storage,
            &data_id(descriptor)?,
            descriptor.firmware_length as usize,
            &footer[..len],
        )?;
        Ok(())
    }

    /// Length of the stored footer
    pub fn footer_len(&mut self, descriptor: &FirmwareDescriptor) -> Result<usize> {
        let size = element_size(&mut self.storage, &data_id(descriptor)?)?.ok_or(Error::NotFound)?;
        match size.checked_sub(descriptor.firmware_length as usize) {
            Some(0) | None => Err(Error::NotFound),
            Some(len) if len > FOOTER_MAX_SIZE => Err(Error::StorageTooLarge),
            Some(len) => Ok(len),
        }
    }

    /// Read the stored footer, returning its length
    pub fn load_footer(&mut self, descriptor: &FirmwareDescriptor, buffer: &mut [u8]) -> Result<usize> {
        let len = self.footer_len(descriptor)?;
        let dst = buffer.get_mut(..len).ok_or(Error::BufferTooSmall)?;
        read_at(
            &mut self.storage,
            &data_id(descriptor)?,
            descriptor.firmware_length as usize,
            dst,
        )?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::{FileInfo, FileVersion};
    use iot_hal::sim::MemStorage;

    fn create_test_store() -> FirmwareStore<MemStorage> {
        FirmwareStore::new(MemStorage::new(), FirmwareConfig::default())
    }

    fn create_test_descriptor(device: &[u8], build: u32) -> FirmwareDescriptor {
        FirmwareDescriptor {
            info: FileInfo {
                manufacture_id: ManufactureId::from_label(b"ACME0001").unwrap(),
                device_type: DeviceType::from_label(device).unwrap(),
                version: FileVersion::new(1, 0, 0, 0, build),
            },
            padding: 0,
            chunk_size: 64,
            firmware_length: 100,
            app_size: 1024,
        }
    }

    #[test]
    fn test_descriptor_update_in_place() {
        let mut store = create_test_store();
        let lamp = create_test_descriptor(b"LAMP", 1);
        let plug = create_test_descriptor(b"PLUG", 1);
        store.save_descriptor(&lamp).unwrap();
        store.save_descriptor(&plug).unwrap();
        store.save_descriptor(&create_test_descriptor(b"LAMP", 2)).unwrap();

        assert_eq!(store.descriptor_count().unwrap(), 2);
        let loaded = store.load_descriptor(&lamp.info.manufacture_id, &lamp.info.device_type).unwrap();
        assert_eq!(loaded.info.version.build, 2);
        assert_eq!(
            store.load_descriptor(&lamp.info.manufacture_id, &DeviceType::from_label(b"FAN").unwrap()),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn test_delete_keeps_other_products() {
        let mut store = create_test_store();
        let lamp = create_test_descriptor(b"LAMP", 1);
        let plug = create_test_descriptor(b"PLUG", 1);
        store.save_descriptor(&lamp).unwrap();
        store.save_descriptor(&plug).unwrap();
        store.save_chunk(&lamp, &[0xAB; 100], 0).unwrap();

        store.delete_firmware(&lamp).unwrap();
        assert_eq!(store.descriptor_count().unwrap(), 1);
        assert!(store.load_descriptor(&plug.info.manufacture_id, &plug.info.device_type).is_ok());
        assert!(store.storage().element(&data_id(&lamp).unwrap()).is_none());
    }

    #[test]
    fn test_chunk_bounds() {
        let mut store = create_test_store();
        let lamp = create_test_descriptor(b"LAMP", 1);
        store.save_chunk(&lamp, &[1; 60], 0).unwrap();
        store.save_chunk(&lamp, &[2; 40], 60).unwrap();
        assert_eq!(store.save_chunk(&lamp, &[3; 2], 99), Err(Error::IncorrectArgument));

        let mut buf = [0u8; 64];
        assert_eq!(store.load_chunk(&lamp, 50, &mut buf), Ok(50));
        assert_eq!(&buf[..10], &[1; 10]);
        assert_eq!(&buf[10..50], &[2; 40]);
        assert_eq!(store.load_chunk(&lamp, 100, &mut buf), Err(Error::IncorrectArgument));
    }

    #[test]
    fn test_footer_stored_after_body() {
        let mut store = create_test_store();
        let lamp = create_test_descriptor(b"LAMP", 1);
        assert_eq!(store.footer_len(&lamp), Err(Error::NotFound));

        store.save_chunk(&lamp, &[0; 100], 0).unwrap();
        let mut footer = [0u8; 60];
        footer[1..48].copy_from_slice(&lamp.to_bytes().unwrap());
        store.save_footer(&lamp, &footer).unwrap();

        let mut buf = [0u8; FOOTER_MAX_SIZE];
        assert_eq!(store.load_footer(&lamp, &mut buf), Ok(48));
        assert_eq!(&buf[1..48], &lamp.to_bytes().unwrap());
    }
}

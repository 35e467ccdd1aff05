// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Storage element identifiers and whole-element helpers
//!
//! The helpers wrap the open / operate / sync / close sequence so callers
//! never leak a handle on an error path.

use core::fmt;

use iot_common::constants::STORAGE_ELEMENT_ID_SIZE;

use crate::error::{HalError, HalResult};
use crate::traits::StorageInterface;

/// 32-byte storage element identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageElementId(pub [u8; STORAGE_ELEMENT_ID_SIZE]);

impl StorageElementId {
    /// Build an id from a prefix, zero padded
    pub fn from_bytes(prefix: &[u8]) -> HalResult<Self> {
        if prefix.len() > STORAGE_ELEMENT_ID_SIZE {
            return Err(HalError::InvalidParameter);
        }
        let mut id = [0u8; STORAGE_ELEMENT_ID_SIZE];
        id[..prefix.len()].copy_from_slice(prefix);
        Ok(Self(id))
    }

    /// Build an id by concatenating several parts
    pub fn from_parts(parts: &[&[u8]]) -> HalResult<Self> {
        let mut id = [0u8; STORAGE_ELEMENT_ID_SIZE];
        let mut pos = 0;
        for part in parts {
            let end = pos + part.len();
            id.get_mut(pos..end)
                .ok_or(HalError::InvalidParameter)?
                .copy_from_slice(part);
            pos = end;
        }
        Ok(Self(id))
    }
}

impl fmt::Debug for StorageElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        write!(f, "StorageElementId({:02x?})", &self.0[..end])
    }
}

/// Size of an element, or `None` if it does not exist
pub fn element_size<S: StorageInterface>(storage: &mut S, id: &StorageElementId) -> HalResult<Option<usize>> {
    let handle = storage.open(id)?;
    let size = storage.size(&handle);
    storage.close(handle)?;
    match size {
        Ok(size) => Ok(Some(size)),
        Err(HalError::StorageNotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read part of an element
pub fn read_at<S: StorageInterface>(
    storage: &mut S,
    id: &StorageElementId,
    offset: usize,
    buffer: &mut [u8],
) -> HalResult<()> {
    let handle = storage.open(id)?;
    let res = storage.load(&handle, offset, buffer);
    storage.close(handle)?;
    res
}

/// Read a whole element into `buffer`, returning its length
pub fn read_all<S: StorageInterface>(storage: &mut S, id: &StorageElementId, buffer: &mut [u8]) -> HalResult<usize> {
    let handle = storage.open(id)?;
    let res = storage.size(&handle).and_then(|size| {
        let dst = buffer.get_mut(..size).ok_or(HalError::BufferTooSmall)?;
        storage.load(&handle, 0, dst)?;
        Ok(size)
    });
    storage.close(handle)?;
    res
}

/// Write part of an element and flush it
pub fn write_at<S: StorageInterface>(storage: &mut S, id: &StorageElementId, offset: usize, data: &[u8]) -> HalResult<()> {
    let handle = storage.open(id)?;
    let res = storage
        .save(&handle, offset, data)
        .and_then(|()| storage.sync(&handle));
    storage.close(handle)?;
    res
}

/// Replace an element with `data`
pub fn write_all<S: StorageInterface>(storage: &mut S, id: &StorageElementId, data: &[u8]) -> HalResult<()> {
    remove(storage, id)?;
    write_at(storage, id, 0, data)
}

/// Delete an element, treating a missing one as success
pub fn remove<S: StorageInterface>(storage: &mut S, id: &StorageElementId) -> HalResult<()> {
    match storage.delete(id) {
        Ok(()) | Err(HalError::StorageNotFound) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_parts() {
        let id = StorageElementId::from_parts(&[b"ACME", &[1, 2], b"X"]).unwrap();
        assert_eq!(&id.0[..7], b"ACME\x01\x02X");
        assert!(id.0[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_id_too_long() {
        let long = [0xAAu8; 33];
        assert_eq!(StorageElementId::from_bytes(&long), Err(HalError::InvalidParameter));
        assert!(StorageElementId::from_parts(&[&long[..20], &long[..13]]).is_err());
    }
}

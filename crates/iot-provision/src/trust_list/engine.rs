// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Staged trust list storage engine

use iot_common::config::TrustListConfig;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, Error, FileVersion, KeyType, Result};
use iot_hal::storage::{element_size, read_all, remove, write_all};
use iot_hal::StorageInterface;
use iot_secmodule::{Hash, SecModule, Sha256};

use super::format::{TlElement, TlFooter, TlHeader, TlStore};
use crate::keys::PubkeyDated;
use crate::verification::verify_signatures;

/// Largest single part (key or footer) of a trust list
pub const TL_MAX_PART_SIZE: usize = 512;

const SOURCE: &str = "tl";

#[derive(Debug, Clone, Copy, Default)]
struct StoreState {
    header: Option<TlHeader>,
    keys_written: u16,
    ready: bool,
}

/// Cursor over the DYNAMIC keys of one type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySearch {
    key_type: KeyType,
    next: u16,
}

impl KeySearch {
    /// Start a search from the first key
    #[must_use]
    pub const fn new(key_type: KeyType) -> Self {
        Self { key_type, next: 0 }
    }

    /// Key type searched for
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }
}

/// Trust list engine over a storage backend
///
/// Operations that verify signatures take the security module by reference;
/// the engine never keeps it.
pub struct TrustList<S: StorageInterface> {
    storage: S,
    config: TrustListConfig,
    stores: [StoreState; 3],
    logs: LogBuffer,
    ops: u32,
    version_observer: Option<fn(&FileVersion)>,
}

impl<S: StorageInterface> TrustList<S> {
    /// Create an engine; nothing is ready until [`init`](Self::init) succeeds
    pub fn new(storage: S, config: TrustListConfig) -> Self {
        Self {
            storage,
            config,
            stores: [StoreState::default(); 3],
            logs: LogBuffer::new(),
            ops: 0,
            version_observer: None,
        }
    }

    /// Load the trust list at startup
    ///
    /// DYNAMIC is used when it verifies. Otherwise a verified STATIC copy
    /// is restored into DYNAMIC. With neither, [`Error::VerificationFailed`]
    /// is returned and the engine stays usable for provisioning.
    pub fn init<M: SecModule>(&mut self, sm: &M) -> Result<()> {
        self.stores = [StoreState::default(); 3];

        if self.verify_storage(sm, TlStore::Dynamic).is_ok() {
            log_info!(self.logs, self.ops, SOURCE, "dynamic trust list loaded");
            return Ok(());
        }

        if self.verify_storage(sm, TlStore::Static).is_ok() {
            log_info!(self.logs, self.ops, SOURCE, "restoring dynamic trust list from static");
            self.copy_store(TlStore::Static, TlStore::Dynamic)?;
            return self.verify_storage(sm, TlStore::Dynamic);
        }

        log_warn!(self.logs, self.ops, SOURCE, "no valid trust list");
        Err(Error::VerificationFailed)
    }

    /// Register a callback receiving the version of every committed trust list
    pub fn set_version_observer(&mut self, observer: fn(&FileVersion)) {
        self.version_observer = Some(observer);
    }

    /// Check whether readers can use the trust list
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state(TlStore::Dynamic).ready
    }

    /// Check whether a store holds a verified trust list
    #[must_use]
    pub fn is_store_ready(&self, store: TlStore) -> bool {
        self.state(store).ready
    }

    /// Header of the trust list in use
    #[must_use]
    pub fn header(&self) -> Option<TlHeader> {
        let state = self.state(TlStore::Dynamic);
        if state.ready {
            state.header
        } else {
            None
        }
    }

    /// Version of the trust list in use
    #[must_use]
    pub fn version(&self) -> Option<FileVersion> {
        self.header().map(|h| h.version)
    }

    /// Engine configuration
    #[must_use]
    pub const fn config(&self) -> &TrustListConfig {
        &self.config
    }

    /// Engine log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Underlying storage
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying storage, mutable
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Stage one part of an incoming trust list
    ///
    /// Parts always go to TMP. The footer completes the list: TMP is
    /// verified and, on success, copied into STATIC and DYNAMIC. TMP is
    /// cleared after every footer whatever the outcome.
    pub fn save_part<M: SecModule>(&mut self, sm: &M, element: TlElement, data: &[u8]) -> Result<()> {
        self.ops = self.ops.wrapping_add(1);
        match element {
            TlElement::Header => self.save_header(data),
            TlElement::Key => self.save_key(data),
            TlElement::Footer => {
                let res = self.save_footer(data).and_then(|()| self.commit_tmp(sm));
                let cleanup = self.invalidate(TlStore::Tmp);
                res.and(cleanup)
            }
        }
    }

    fn save_header(&mut self, data: &[u8]) -> Result<()> {
        let header = TlHeader::from_bytes(data)?;
        if header.tl_size > self.config.max_size {
            log_warn!(self.logs, self.ops, SOURCE, "trust list of {} bytes rejected", header.tl_size);
            return Err(Error::StorageTooLarge);
        }

        *self.state_mut(TlStore::Tmp) = StoreState {
            header: Some(header),
            keys_written: 0,
            ready: false,
        };
        write_all(&mut self.storage, &TlStore::Tmp.element_id(TlElement::Header, 0)?, data)?;
        log_debug!(
            self.logs,
            self.ops,
            SOURCE,
            "staging trust list {} with {} keys",
            header.version,
            header.pub_keys_count
        );
        Ok(())
    }

    fn save_key(&mut self, data: &[u8]) -> Result<()> {
        let state = *self.state(TlStore::Tmp);
        let header = state.header.ok_or(Error::NotReady)?;
        if state.keys_written >= header.pub_keys_count {
            return Err(Error::IncorrectArgument);
        }
        if data.len() > TL_MAX_PART_SIZE {
            return Err(Error::StorageTooLarge);
        }
        PubkeyDated::parse_exact(data)?;

        let id = TlStore::Tmp.element_id(TlElement::Key, state.keys_written)?;
        write_all(&mut self.storage, &id, data)?;
        self.state_mut(TlStore::Tmp).keys_written += 1;
        Ok(())
    }

    fn save_footer(&mut self, data: &[u8]) -> Result<()> {
        let state = *self.state(TlStore::Tmp);
        let header = state.header.ok_or(Error::NotReady)?;
        if state.keys_written != header.pub_keys_count {
            log_warn!(
                self.logs,
                self.ops,
                SOURCE,
                "footer after {} of {} keys",
                state.keys_written,
                header.pub_keys_count
            );
            return Err(Error::IncorrectArgument);
        }
        if data.len() > TL_MAX_PART_SIZE {
            return Err(Error::StorageTooLarge);
        }
        TlFooter::parse(data)?;
        write_all(&mut self.storage, &TlStore::Tmp.element_id(TlElement::Footer, 0)?, data)?;
        Ok(())
    }

    fn commit_tmp<M: SecModule>(&mut self, sm: &M) -> Result<()> {
        self.verify_storage(sm, TlStore::Tmp)?;
        self.apply_tmp_to(TlStore::Static)?;
        self.apply_tmp_to(TlStore::Dynamic)?;

        if let Some(version) = self.version() {
            log_info!(self.logs, self.ops, SOURCE, "trust list {} committed", version);
            if let Some(observer) = self.version_observer {
                observer(&version);
            }
        }
        Ok(())
    }

    /// Copy a verified TMP store into `store`
    pub fn apply_tmp_to(&mut self, store: TlStore) -> Result<()> {
        if store == TlStore::Tmp {
            return Err(Error::IncorrectArgument);
        }
        self.copy_store(TlStore::Tmp, store)
    }

    // =========================================================================
    // Store maintenance
    // =========================================================================

    /// Verify the trust list held by a store and update its ready flag
    pub fn verify_storage<M: SecModule>(&mut self, sm: &M, store: TlStore) -> Result<()> {
        match self.verify_store(sm, store) {
            Ok(header) => {
                *self.state_mut(store) = StoreState {
                    header: Some(header),
                    keys_written: header.pub_keys_count,
                    ready: true,
                };
                Ok(())
            }
            Err(e) => {
                self.state_mut(store).ready = false;
                log_warn!(self.logs, self.ops, SOURCE, "{:?} store rejected: {}", store, e);
                Err(e)
            }
        }
    }

    fn verify_store<M: SecModule>(&mut self, sm: &M, store: TlStore) -> Result<TlHeader> {
        let mut buf = [0u8; TL_MAX_PART_SIZE];
        let mut hasher = Sha256::default();

        // 1. Header
        let len = read_all(&mut self.storage, &store.element_id(TlElement::Header, 0)?, &mut buf)?;
        let header = TlHeader::from_bytes(&buf[..len])?;
        if header.tl_size > self.config.max_size {
            return Err(Error::StorageTooLarge);
        }
        hasher.update(&buf[..len]);

        // 2. Keys, in order
        for index in 0..header.pub_keys_count {
            let len = read_all(&mut self.storage, &store.element_id(TlElement::Key, index)?, &mut buf)?;
            hasher.update(&buf[..len]);
        }

        // 3. Footer type tag
        let len = read_all(&mut self.storage, &store.element_id(TlElement::Footer, 0)?, &mut buf)?;
        let footer = TlFooter::parse(&buf[..len])?;
        hasher.update(&[footer.tl_type]);
        let digest = hasher.finalize();

        // 4. Signatures
        verify_signatures(sm, &self.config.signers, &digest, header.signatures_count, footer.records())?;

        Ok(header)
    }

    fn copy_store(&mut self, src: TlStore, dst: TlStore) -> Result<()> {
        let state = *self.state(src);
        let header = match state.header {
            Some(header) if state.ready => header,
            _ => return Err(Error::NotReady),
        };

        self.invalidate(dst)?;

        let mut buf = [0u8; TL_MAX_PART_SIZE];
        self.copy_element(src, dst, TlElement::Header, 0, &mut buf)?;
        for index in 0..header.pub_keys_count {
            self.copy_element(src, dst, TlElement::Key, index, &mut buf)?;
        }
        self.copy_element(src, dst, TlElement::Footer, 0, &mut buf)?;

        *self.state_mut(dst) = StoreState {
            header: Some(header),
            keys_written: header.pub_keys_count,
            ready: true,
        };
        Ok(())
    }

    fn copy_element(
        &mut self,
        src: TlStore,
        dst: TlStore,
        element: TlElement,
        index: u16,
        buf: &mut [u8],
    ) -> Result<()> {
        let len = read_all(&mut self.storage, &src.element_id(element, index)?, buf)?;
        write_all(&mut self.storage, &dst.element_id(element, index)?, &buf[..len])?;
        Ok(())
    }

    /// Delete every part of a store and mark it not ready
    pub fn invalidate(&mut self, store: TlStore) -> Result<()> {
        let declared = match self.state(store).header {
            Some(header) => header.pub_keys_count,
            None => self.stored_key_count(store),
        };
        *self.state_mut(store) = StoreState::default();

        let mut index: u16 = 0;
        loop {
            let id = store.element_id(TlElement::Key, index)?;
            if index >= declared && element_size(&mut self.storage, &id)?.is_none() {
                break;
            }
            remove(&mut self.storage, &id)?;
            index = match index.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        remove(&mut self.storage, &store.element_id(TlElement::Header, 0)?)?;
        remove(&mut self.storage, &store.element_id(TlElement::Footer, 0)?)?;
        Ok(())
    }

    fn stored_key_count(&mut self, store: TlStore) -> u16 {
        let mut buf = [0u8; TlHeader::SIZE];
        store
            .element_id(TlElement::Header, 0)
            .ok()
            .and_then(|id| read_all(&mut self.storage, &id, &mut buf).ok())
            .and_then(|len| TlHeader::from_bytes(&buf[..len]).ok())
            .map_or(0, |h| h.pub_keys_count)
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Read one part of the trust list in use
    pub fn load_part(&mut self, element: TlElement, index: u16, buf: &mut [u8]) -> Result<usize> {
        let header = self.header().ok_or(Error::NotReady)?;
        if element == TlElement::Key && index >= header.pub_keys_count {
            return Err(Error::NotFound);
        }
        let index = if element == TlElement::Key { index } else { 0 };
        let id = TlStore::Dynamic.element_id(element, index)?;
        Ok(read_all(&mut self.storage, &id, buf)?)
    }

    /// Load the first key of `key_type` into `buf`
    pub fn find_first_key(&mut self, key_type: KeyType, buf: &mut [u8]) -> Result<(KeySearch, usize)> {
        let mut search = KeySearch::new(key_type);
        let len = self.find_next_key(&mut search, buf)?;
        Ok((search, len))
    }

    /// Load the next key matching a search into `buf`
    pub fn find_next_key(&mut self, search: &mut KeySearch, buf: &mut [u8]) -> Result<usize> {
        let count = self.header().ok_or(Error::NotReady)?.pub_keys_count;
        while search.next < count {
            let index = search.next;
            search.next += 1;
            let len = self.load_part(TlElement::Key, index, buf)?;
            let matches = PubkeyDated::parse_exact(&buf[..len]).is_ok_and(|k| k.key.key_type == search.key_type);
            if matches {
                return Ok(len);
            }
        }
        Err(Error::NotFound)
    }

    /// Copy the cloud URL (meta data of the first cloud key) into `out`
    pub fn cloud_url(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut buf = [0u8; TL_MAX_PART_SIZE];
        let (_, len) = self.find_first_key(KeyType::Cloud, &mut buf)?;
        let key = PubkeyDated::parse_exact(&buf[..len])?;
        let meta = key.key.meta;
        out.get_mut(..meta.len())
            .ok_or(Error::BufferTooSmall)?
            .copy_from_slice(meta);
        Ok(meta.len())
    }

    /// Forget all store state and release the storage backend
    pub fn deinit(&mut self) -> Result<()> {
        self.stores = [StoreState::default(); 3];
        Ok(self.storage.deinit()?)
    }

    fn state(&self, store: TlStore) -> &StoreState {
        &self.stores[store.index()]
    }

    fn state_mut(&mut self, store: TlStore) -> &mut StoreState {
        &mut self.stores[store.index()]
    }
}

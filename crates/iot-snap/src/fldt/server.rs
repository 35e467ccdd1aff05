// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FLDT server
//!
//! Entries are created on first use and refreshed on every `GFTI` or
//! [`FldtServer::add_file_type`]; each caches the header and data size of
//! the file currently stored.

use core::any::Any;

use iot_common::config::FldtConfig;
use iot_common::constants::{FLDT_MAX_CHUNK_SIZE, FLDT_MAX_FILE_TYPES};
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, Error, FileVersion, MacAddr, Result};
use iot_update::{UpdateFileType, UpdateRegistry};

use super::wire::{
    element, DataRequest, DataResponse, FileInfoWire, FooterResponse, HeaderResponse, TypeRequest,
    FLDT_HEADER_MAX_SIZE, FLDT_SERVICE_ID,
};
use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "fldt-server";

/// A file the server can serve
#[derive(Debug)]
struct ServerEntry {
    /// Kind together with the stored version
    file_type: UpdateFileType,
    header: heapless::Vec<u8, FLDT_HEADER_MAX_SIZE>,
    file_size: u32,
}

/// File delivery server
pub struct FldtServer {
    config: FldtConfig,
    entries: heapless::Vec<ServerEntry, FLDT_MAX_FILE_TYPES>,
    logs: LogBuffer,
}

impl FldtServer {
    /// Create a server with no entries
    #[must_use]
    pub const fn new(config: FldtConfig) -> Self {
        Self {
            config,
            entries: heapless::Vec::new(),
            logs: LogBuffer::new(),
        }
    }

    /// Number of file types known to the server
    #[must_use]
    pub fn file_type_count(&self) -> usize {
        self.entries.len()
    }

    /// Version currently served for a file kind
    #[must_use]
    pub fn served_version(&self, file_type: &UpdateFileType) -> Option<&FileVersion> {
        self.find(file_type).map(|i| self.entries[i].file_type.version())
    }

    /// Server log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Refresh the entry for `file_type` and optionally announce it with `INFV`
    pub fn add_file_type<C: UpdateRegistry>(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        file_type: &UpdateFileType,
        broadcast: bool,
    ) -> Result<()> {
        let index = self.refresh(ctx, snap.tick(), file_type)?;
        if broadcast {
            let announce = FileInfoWire {
                file_type: self.entries[index].file_type,
                gateway_mac: snap.own_mac(NetifRef::Default),
            };
            let mut content = [0u8; FileInfoWire::SIZE];
            let len = announce.write(&mut content)?;
            snap.send_request(
                NetifRef::Routing,
                MacAddr::BROADCAST,
                FLDT_SERVICE_ID,
                element::INFV,
                &content[..len],
            )?;
            log_info!(self.logs, snap.tick(), SOURCE, "announced {}", announce.file_type);
        }
        Ok(())
    }

    fn find(&self, file_type: &UpdateFileType) -> Option<usize> {
        self.entries.iter().position(|e| e.file_type.same_kind(file_type))
    }

    /// Reload header, size and version from the update interface
    fn refresh<C: UpdateRegistry>(&mut self, ctx: &mut C, tick: u32, file_type: &UpdateFileType) -> Result<usize> {
        let mut header = [0u8; FLDT_HEADER_MAX_SIZE];
        let loaded = ctx.with_interface(file_type, |iface| -> Result<_> {
            let version = iface.get_version(file_type)?;
            let current = file_type.with_version(version);
            if iface.header_size(&current)? > FLDT_HEADER_MAX_SIZE {
                return Err(Error::BufferTooSmall);
            }
            let len = iface.get_header(&current, &mut header)?;
            let size = iface.file_size(&current, &header[..len])?;
            Ok((current, len, size))
        });
        let (current, len, file_size) = match loaded {
            Some(Ok(loaded)) => loaded,
            // Nothing to serve for this kind
            None | Some(Err(Error::NotFound)) => return Err(Error::CommandNoResponse),
            Some(Err(e)) => {
                log_warn!(self.logs, tick, SOURCE, "cannot load {}: {}", file_type, e);
                return Err(e);
            }
        };
        let header = heapless::Vec::from_slice(&header[..len]).map_err(|()| Error::BufferTooSmall)?;

        let entry = ServerEntry {
            file_type: current,
            header,
            file_size,
        };
        if let Some(index) = self.find(file_type) {
            self.entries[index] = entry;
            return Ok(index);
        }
        if self.entries.len() >= self.config.max_file_types {
            return Err(Error::TooManyFileTypes);
        }
        self.entries.push(entry).map_err(|_| Error::TooManyFileTypes)?;
        log_debug!(self.logs, tick, SOURCE, "tracking {}", current);
        Ok(self.entries.len() - 1)
    }

    fn entry_for<C: UpdateRegistry>(&mut self, ctx: &mut C, tick: u32, file_type: &UpdateFileType) -> Result<usize> {
        match self.find(file_type) {
            Some(index) => Ok(index),
            None => self.refresh(ctx, tick, file_type),
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn file_info<C: UpdateRegistry>(
        &mut self,
        ctx: &mut C,
        snap: &dyn SnapSender,
        request: &Incoming<'_>,
        response: &mut [u8],
    ) -> Result<usize> {
        let req = TypeRequest::parse(request.content)?;
        let index = self.refresh(ctx, snap.tick(), &req.file_type)?;
        FileInfoWire {
            file_type: self.entries[index].file_type,
            gateway_mac: snap.own_mac(NetifRef::Index(request.netif)),
        }
        .write(response)
    }

    fn header<C: UpdateRegistry>(&mut self, ctx: &mut C, tick: u32, content: &[u8], response: &mut [u8]) -> Result<usize> {
        let req = TypeRequest::parse(content)?;
        let index = self.entry_for(ctx, tick, &req.file_type)?;
        let entry = &self.entries[index];
        let has_footer = ctx
            .with_interface(&entry.file_type, |iface| iface.has_footer(&entry.file_type))
            .ok_or(Error::NotFound)?;
        HeaderResponse {
            file_type: entry.file_type,
            file_size: entry.file_size,
            has_footer,
            header: &entry.header,
        }
        .write(response)
    }

    fn data<C: UpdateRegistry>(&mut self, ctx: &mut C, tick: u32, content: &[u8], response: &mut [u8]) -> Result<usize> {
        let req = DataRequest::parse(content)?;
        let index = self.entry_for(ctx, tick, &req.file_type)?;
        let entry = &self.entries[index];
        if req.offset >= entry.file_size {
            log_warn!(self.logs, tick, SOURCE, "offset {} beyond {}", req.offset, entry.file_size);
            return Err(Error::IncorrectArgument);
        }

        let max = response
            .len()
            .saturating_sub(DataResponse::HEADER_SIZE)
            .min(self.config.max_chunk)
            .min(FLDT_MAX_CHUNK_SIZE);
        let mut chunk = [0u8; FLDT_MAX_CHUNK_SIZE];
        let (len, next_offset) = ctx
            .with_interface(&entry.file_type, |iface| -> Result<_> {
                let len = iface.get_data(&entry.file_type, &entry.header, &mut chunk[..max], req.offset)?;
                let loaded = u32::try_from(len).map_err(|_| Error::IncorrectArgument)?;
                let next = iface.inc_data_offset(&entry.file_type, req.offset, loaded)?;
                Ok((len, next))
            })
            .ok_or(Error::NotFound)??;

        DataResponse {
            file_type: entry.file_type,
            offset: req.offset,
            next_offset,
            data: &chunk[..len],
        }
        .write(response)
    }

    fn footer<C: UpdateRegistry>(&mut self, ctx: &mut C, tick: u32, content: &[u8], response: &mut [u8]) -> Result<usize> {
        let req = TypeRequest::parse(content)?;
        let index = self.entry_for(ctx, tick, &req.file_type)?;
        let entry = &self.entries[index];
        let mut footer = [0u8; FLDT_MAX_CHUNK_SIZE];
        let len = ctx
            .with_interface(&entry.file_type, |iface| -> Result<_> {
                if !iface.has_footer(&entry.file_type) {
                    return Err(Error::Unsupported);
                }
                iface.get_footer(&entry.file_type, &entry.header, &mut footer)
            })
            .ok_or(Error::NotFound)??;
        FooterResponse {
            file_type: entry.file_type,
            footer: &footer[..len],
        }
        .write(response)
    }
}

impl<C: UpdateRegistry> Service<C> for FldtServer {
    fn id(&self) -> u32 {
        FLDT_SERVICE_ID
    }

    fn on_request(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        response: &mut [u8],
    ) -> Result<usize> {
        let tick = snap.tick();
        match request.element() {
            element::GFTI => self.file_info(ctx, snap, request, response),
            element::GNFH => self.header(ctx, tick, request.content, response),
            element::GNFD => self.data(ctx, tick, request.content, response),
            element::GNFF => self.footer(ctx, tick, request.content, response),
            _ => Err(Error::CommandNoResponse),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

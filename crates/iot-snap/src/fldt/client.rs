// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FLDT client
//!
//! One entry per tracked file kind. Every outgoing command is remembered
//! so the periodic tick can resend it when the gateway stays silent.

use core::any::Any;

use iot_common::codec::Reader;
use iot_common::config::FldtConfig;
use iot_common::constants::FLDT_MAX_FILE_TYPES;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_error, log_info, log_warn, Error, FileVersion, MacAddr, Result};
use iot_update::{UpdateFileType, UpdateRegistry};

use super::wire::{
    element, DataRequest, DataResponse, FileInfoWire, FooterResponse, HeaderResponse, TypeRequest,
    FLDT_HEADER_MAX_SIZE, FLDT_SERVICE_ID,
};
use super::{FldtContext, GotFile};
use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "fldt-client";

/// Where a tracked file stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// Nothing in flight
    Idle,
    /// Waiting for file information
    Info,
    /// Waiting for the header
    Header,
    /// Waiting for the chunk at this offset
    Data {
        /// Requested offset
        offset: u32,
    },
    /// Waiting for the footer
    Footer,
}

impl TransferStage {
    /// A download is running
    #[must_use]
    pub const fn is_transfer(self) -> bool {
        matches!(self, Self::Header | Self::Data { .. } | Self::Footer)
    }
}

/// Last command sent for an entry
#[derive(Debug)]
struct Outstanding {
    dest: MacAddr,
    element_id: u32,
    request: heapless::Vec<u8, { DataRequest::SIZE }>,
    ticks: u32,
    resends: u32,
}

#[derive(Debug)]
struct ClientEntry {
    /// Kind together with the version held locally
    file_type: UpdateFileType,
    /// Version being downloaded
    offered: UpdateFileType,
    gateway: MacAddr,
    header: heapless::Vec<u8, FLDT_HEADER_MAX_SIZE>,
    file_size: u32,
    has_footer: bool,
    stage: TransferStage,
    outstanding: Option<Outstanding>,
}

impl ClientEntry {
    fn new(file_type: UpdateFileType) -> Self {
        Self {
            file_type,
            offered: file_type,
            gateway: MacAddr::ZERO,
            header: heapless::Vec::new(),
            file_size: 0,
            has_footer: false,
            stage: TransferStage::Idle,
            outstanding: None,
        }
    }

    /// Send a command and remember it for resending
    fn send(
        &mut self,
        snap: &mut dyn SnapSender,
        dest: MacAddr,
        element_id: u32,
        request: &[u8],
        stage: TransferStage,
    ) -> Result<()> {
        let stored = heapless::Vec::from_slice(request).map_err(|()| Error::BufferTooSmall)?;
        self.stage = stage;
        self.outstanding = Some(Outstanding {
            dest,
            element_id,
            request: stored,
            ticks: 0,
            resends: 0,
        });
        snap.send_request(NetifRef::Default, dest, FLDT_SERVICE_ID, element_id, request)
    }

    fn reset(&mut self) {
        self.stage = TransferStage::Idle;
        self.outstanding = None;
    }

    fn ask_info(&mut self, snap: &mut dyn SnapSender) -> Result<()> {
        let mut request = [0u8; TypeRequest::SIZE];
        let len = TypeRequest {
            file_type: self.file_type,
        }
        .write(&mut request)?;
        self.send(snap, MacAddr::BROADCAST, element::GFTI, &request[..len], TransferStage::Info)
    }

    fn ask_header(&mut self, snap: &mut dyn SnapSender) -> Result<()> {
        let mut request = [0u8; TypeRequest::SIZE];
        let len = TypeRequest {
            file_type: self.offered,
        }
        .write(&mut request)?;
        self.send(snap, self.gateway, element::GNFH, &request[..len], TransferStage::Header)
    }

    fn ask_data(&mut self, snap: &mut dyn SnapSender, offset: u32) -> Result<()> {
        let mut request = [0u8; DataRequest::SIZE];
        let len = DataRequest {
            file_type: self.offered,
            offset,
        }
        .write(&mut request)?;
        self.send(snap, self.gateway, element::GNFD, &request[..len], TransferStage::Data { offset })
    }

    fn ask_footer(&mut self, snap: &mut dyn SnapSender) -> Result<()> {
        let mut request = [0u8; TypeRequest::SIZE];
        let len = TypeRequest {
            file_type: self.offered,
        }
        .write(&mut request)?;
        self.send(snap, self.gateway, element::GNFF, &request[..len], TransferStage::Footer)
    }

    /// Ask for the data after `offset`, or for the footer once complete
    fn ask_next(&mut self, snap: &mut dyn SnapSender, offset: u32) -> Result<Option<bool>> {
        if offset < self.file_size {
            self.ask_data(snap, offset)?;
            Ok(None)
        } else if self.has_footer {
            self.ask_footer(snap)?;
            Ok(None)
        } else {
            Ok(Some(true))
        }
    }
}

/// File delivery client
pub struct FldtClient {
    config: FldtConfig,
    entries: heapless::Vec<ClientEntry, FLDT_MAX_FILE_TYPES>,
    logs: LogBuffer,
}

impl FldtClient {
    /// Create a client tracking no files
    #[must_use]
    pub const fn new(config: FldtConfig) -> Self {
        Self {
            config,
            entries: heapless::Vec::new(),
            logs: LogBuffer::new(),
        }
    }

    /// Client log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Number of tracked file kinds
    #[must_use]
    pub fn file_type_count(&self) -> usize {
        self.entries.len()
    }

    /// Stage of a tracked file
    #[must_use]
    pub fn stage(&self, file_type: &UpdateFileType) -> Option<TransferStage> {
        self.find(file_type).map(|i| self.entries[i].stage)
    }

    /// Version held locally for a tracked file
    #[must_use]
    pub fn current_version(&self, file_type: &UpdateFileType) -> Option<FileVersion> {
        self.find(file_type).map(|i| *self.entries[i].file_type.version())
    }

    fn find(&self, file_type: &UpdateFileType) -> Option<usize> {
        self.entries.iter().position(|e| e.file_type.same_kind(file_type))
    }

    /// Start tracking a file kind and ask gateways about it
    ///
    /// The local version comes from the update interface; a file that is
    /// not stored yet counts as version zero.
    pub fn add_file_type<C: UpdateRegistry>(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        file_type: &UpdateFileType,
    ) -> Result<()> {
        let tick = snap.tick();
        let version = match ctx.with_interface(file_type, |iface| iface.get_version(file_type)) {
            None => return Err(Error::NotFound),
            Some(Ok(version)) => version,
            Some(Err(e)) => {
                log_warn!(self.logs, tick, SOURCE, "no local {}: {}", file_type, e);
                FileVersion::ZERO
            }
        };
        let file_type = file_type.with_version(version);

        let index = match self.find(&file_type) {
            Some(index) => {
                self.entries[index] = ClientEntry::new(file_type);
                index
            }
            None => {
                if self.entries.len() >= self.config.max_file_types {
                    return Err(Error::TooManyFileTypes);
                }
                self.entries
                    .push(ClientEntry::new(file_type))
                    .map_err(|_| Error::TooManyFileTypes)?;
                self.entries.len() - 1
            }
        };
        log_info!(self.logs, tick, SOURCE, "tracking {} {}", file_type, version);
        self.entries[index].ask_info(snap)
    }

    /// Ask gateways about every tracked file that is not downloading
    pub fn request_all_files(&mut self, snap: &mut dyn SnapSender) -> Result<()> {
        for entry in self.entries.iter_mut().filter(|e| !e.stage.is_transfer()) {
            entry.ask_info(snap)?;
        }
        Ok(())
    }

    /// Release every tracked file
    pub fn destroy<C: UpdateRegistry>(&mut self, ctx: &mut C) {
        for entry in &self.entries {
            ctx.with_interface(&entry.file_type, |iface| iface.free_item(&entry.file_type));
        }
        self.entries.clear();
    }

    // =========================================================================
    // Transfer steps
    // =========================================================================

    /// A gateway offers a file, from `INFV` or a `GFTI` answer
    fn offer<C: FldtContext>(&mut self, ctx: &mut C, snap: &mut dyn SnapSender, info: &FileInfoWire) -> Result<()> {
        let tick = snap.tick();
        let index = self.find(&info.file_type).ok_or(Error::NotFound)?;
        let entry = &mut self.entries[index];
        if entry.stage.is_transfer() {
            log_debug!(self.logs, tick, SOURCE, "{} already downloading", entry.file_type);
            return Ok(());
        }

        let current = entry.file_type;
        let newer = ctx
            .with_interface(&current, |iface| {
                iface.file_is_newer(&current, current.version(), info.file_type.version())
            })
            .unwrap_or(false);
        entry.reset();
        entry.gateway = info.gateway_mac;
        if !newer {
            log_debug!(self.logs, tick, SOURCE, "{} {} is current", current, info.file_type.version());
            return Ok(());
        }

        entry.offered = current.with_version(*info.file_type.version());
        log_info!(
            self.logs,
            tick,
            SOURCE,
            "downloading {} {} from {}",
            current,
            info.file_type.version(),
            info.gateway_mac
        );
        entry.ask_header(snap)
    }

    fn on_header<C: FldtContext>(&mut self, ctx: &mut C, snap: &mut dyn SnapSender, index: usize, content: &[u8]) -> Result<Option<bool>> {
        let response = HeaderResponse::parse(content)?;
        let entry = &mut self.entries[index];
        if entry.stage != TransferStage::Header {
            return Ok(None);
        }
        let offered = entry.offered;
        let size = ctx
            .with_interface(&offered, |iface| iface.set_header(&offered, response.header))
            .ok_or(Error::NotFound)??;
        if size != response.file_size {
            return Err(Error::IncorrectArgument);
        }
        entry.header = heapless::Vec::from_slice(response.header).map_err(|()| Error::BufferTooSmall)?;
        entry.file_size = response.file_size;
        entry.has_footer = response.has_footer;
        entry.ask_next(snap, 0)
    }

    fn on_data<C: FldtContext>(&mut self, ctx: &mut C, snap: &mut dyn SnapSender, index: usize, content: &[u8]) -> Result<Option<bool>> {
        let response = DataResponse::parse(content)?;
        let entry = &mut self.entries[index];
        // Duplicate answers to a resent request carry an old offset
        if entry.stage != (TransferStage::Data { offset: response.offset }) {
            return Ok(None);
        }
        if response.data.is_empty() || response.next_offset <= response.offset {
            return Err(Error::IncorrectArgument);
        }
        let offered = entry.offered;
        ctx.with_interface(&offered, |iface| {
            iface.set_data(&offered, &entry.header, response.data, response.offset)
        })
        .ok_or(Error::NotFound)??;
        entry.ask_next(snap, response.next_offset)
    }

    fn on_footer<C: FldtContext>(&mut self, ctx: &mut C, index: usize, content: &[u8]) -> Result<Option<bool>> {
        let response = FooterResponse::parse(content)?;
        let entry = &mut self.entries[index];
        if entry.stage != TransferStage::Footer {
            return Ok(None);
        }
        let offered = entry.offered;
        let verified = ctx
            .with_interface(&offered, |iface| iface.set_footer(&offered, &entry.header, response.footer))
            .ok_or(Error::NotFound)?;
        Ok(Some(verified.is_ok()))
    }

    /// Close a transfer and report it
    fn finish<C: FldtContext>(&mut self, ctx: &mut C, tick: u32, index: usize, success: bool) {
        let entry = &mut self.entries[index];
        let previous = *entry.file_type.version();
        entry.reset();
        if success {
            entry.file_type = entry.offered;
            log_info!(self.logs, tick, SOURCE, "got {} {}", entry.offered, entry.offered.version());
        } else {
            log_error!(self.logs, tick, SOURCE, "download of {} failed", entry.offered);
            let offered = entry.offered;
            ctx.with_interface(&offered, |iface| iface.free_item(&offered));
        }
        ctx.got_file(&GotFile {
            file_type: entry.offered,
            previous,
            gateway: entry.gateway,
            success,
        });
    }

    fn locate(&self, content: &[u8], src: MacAddr) -> Option<usize> {
        let mut r = Reader::new(content);
        let file_type = UpdateFileType::read(&mut r).ok()?;
        let index = self.find(&file_type)?;
        (self.entries[index].gateway == src).then_some(index)
    }
}

impl<C: FldtContext> Service<C> for FldtClient {
    fn id(&self) -> u32 {
        FLDT_SERVICE_ID
    }

    fn on_request(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        _response: &mut [u8],
    ) -> Result<usize> {
        if request.element() != element::INFV {
            return Err(Error::CommandNoResponse);
        }
        let info = FileInfoWire::parse(request.content)?;
        self.offer(ctx, snap, &info)?;
        Ok(0)
    }

    fn on_response(&mut self, ctx: &mut C, snap: &mut dyn SnapSender, response: &Incoming<'_>) {
        let tick = snap.tick();
        let element_id = response.element();

        if element_id == element::GFTI {
            if !response.is_ack() {
                return;
            }
            match FileInfoWire::parse(response.content) {
                Ok(info) => {
                    if let Err(e) = self.offer(ctx, snap, &info) {
                        log_warn!(self.logs, tick, SOURCE, "offer rejected: {}", e);
                    }
                }
                Err(e) => log_warn!(self.logs, tick, SOURCE, "bad file info: {}", e),
            }
            return;
        }

        let Some(index) = self.locate(response.content, response.src()) else {
            return;
        };
        if !self.entries[index].stage.is_transfer() {
            return;
        }
        let step = if response.is_ack() {
            match element_id {
                element::GNFH => self.on_header(ctx, snap, index, response.content),
                element::GNFD => self.on_data(ctx, snap, index, response.content),
                element::GNFF => self.on_footer(ctx, index, response.content),
                _ => Ok(None),
            }
        } else {
            Err(Error::Nack)
        };
        match step {
            Ok(None) => {}
            Ok(Some(success)) => self.finish(ctx, tick, index, success),
            Err(e) => {
                log_warn!(self.logs, tick, SOURCE, "{:08x} failed: {}", element_id, e);
                self.finish(ctx, tick, index, false);
            }
        }
    }

    fn periodic(&mut self, ctx: &mut C, snap: &mut dyn SnapSender) {
        let tick = snap.tick();
        for index in 0..self.entries.len() {
            let entry = &mut self.entries[index];
            let Some(outstanding) = entry.outstanding.as_mut() else {
                continue;
            };
            outstanding.ticks += 1;
            if outstanding.ticks <= self.config.wait_ticks {
                continue;
            }
            outstanding.ticks = 0;
            outstanding.resends += 1;

            if outstanding.resends > self.config.retry_limit {
                log_warn!(self.logs, tick, SOURCE, "retry limit reached for {}", entry.file_type);
                if entry.stage.is_transfer() {
                    self.finish(ctx, tick, index, false);
                } else {
                    entry.reset();
                }
                continue;
            }

            let res = snap.send_request(
                NetifRef::Default,
                outstanding.dest,
                FLDT_SERVICE_ID,
                outstanding.element_id,
                &outstanding.request,
            );
            if let Err(e) = res {
                log_warn!(self.logs, tick, SOURCE, "resend failed: {}", e);
            }
        }
    }

    fn deinit(&mut self, ctx: &mut C) {
        self.destroy(ctx);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_stages() {
        assert!(!TransferStage::Idle.is_transfer());
        assert!(!TransferStage::Info.is_transfer());
        assert!(TransferStage::Header.is_transfer());
        assert!(TransferStage::Data { offset: 512 }.is_transfer());
        assert!(TransferStage::Footer.is_transfer());
    }

    #[test]
    fn test_next_step_after_data() {
        let mut entry = ClientEntry::new(UpdateFileType::default());
        entry.file_size = 1024;
        entry.has_footer = false;
        struct Sink(crate::service::DeviceIdentity, u32);
        impl SnapSender for Sink {
            fn own_mac(&self, _: NetifRef) -> MacAddr {
                MacAddr::ZERO
            }
            fn device(&self) -> &crate::service::DeviceIdentity {
                &self.0
            }
            fn send_frame(&mut self, _: NetifRef, _: &crate::frame::FrameHeader, _: &[u8]) -> Result<()> {
                self.1 += 1;
                Ok(())
            }
            fn next_transaction_id(&mut self) -> u32 {
                0
            }
            fn tick(&self) -> u32 {
                0
            }
        }
        let mut sink = Sink(crate::service::DeviceIdentity::default(), 0);

        assert_eq!(entry.ask_next(&mut sink, 512).unwrap(), None);
        assert_eq!(entry.stage, TransferStage::Data { offset: 512 });
        assert_eq!(entry.ask_next(&mut sink, 1024).unwrap(), Some(true));

        entry.has_footer = true;
        assert_eq!(entry.ask_next(&mut sink, 1024).unwrap(), None);
        assert_eq!(entry.stage, TransferStage::Footer);
        assert_eq!(sink.1, 2);
    }
}

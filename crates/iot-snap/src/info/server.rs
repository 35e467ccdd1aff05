// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! INFO server
//!
//! Announces the device once, answers enumeration and information
//! requests, and reports the polled elements every period.

use core::any::Any;

use iot_common::codec::Writer;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, DeviceRoles, Error, FileVersion, MacAddr, Result};

use super::{element, read_exact, GeneralInfo, InfoDevice, PollElements, PollRequest, StatInfo, INFO_SERVICE_ID};
use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "info";

/// Context of a device running an INFO server
pub trait InfoContext {
    /// Version of the running firmware
    fn firmware_version(&mut self) -> FileVersion {
        FileVersion::ZERO
    }

    /// Version of the active trust list
    fn trust_list_version(&mut self) -> FileVersion {
        FileVersion::ZERO
    }

    /// Another device announced its start
    fn device_started(&mut self, _device: &InfoDevice) {}
}

/// Reports requested with `POLL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PollState {
    elements: PollElements,
    period: u16,
    counter: u16,
    recipient: MacAddr,
}

impl PollState {
    const IDLE: Self = Self {
        elements: PollElements::empty(),
        period: 0,
        counter: 0,
        recipient: MacAddr::BROADCAST,
    };

    fn apply(&mut self, request: &PollRequest) {
        if request.enable {
            self.elements |= request.elements;
            self.period = request.period;
            // Report on the next tick
            self.counter = request.period;
            self.recipient = request.recipient;
        } else {
            self.elements.remove(request.elements);
        }
    }

    /// Advance one tick, returning true when a report is due
    fn tick(&mut self) -> bool {
        self.counter = self.counter.saturating_add(1);
        if self.counter >= self.period {
            self.counter = 0;
            true
        } else {
            false
        }
    }
}

/// Device information server
pub struct InfoServer {
    announced: bool,
    poll: PollState,
    files_refresh: bool,
    logs: LogBuffer,
}

impl InfoServer {
    /// Server that announces itself on its first tick
    #[must_use]
    pub const fn new() -> Self {
        Self {
            announced: false,
            poll: PollState::IDLE,
            files_refresh: false,
            logs: LogBuffer::new(),
        }
    }

    /// Elements currently reported
    #[must_use]
    pub const fn polled(&self) -> PollElements {
        self.poll.elements
    }

    /// Check and clear the request to refresh tracked files
    ///
    /// Set when a thing hears a gateway announce its start; the caller
    /// then runs [`FldtClient::request_all_files`](crate::fldt::FldtClient::request_all_files).
    pub fn take_files_refresh(&mut self) -> bool {
        core::mem::take(&mut self.files_refresh)
    }

    /// Server log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Broadcast the start notification
    pub fn announce(&mut self, snap: &mut dyn SnapSender) -> Result<()> {
        self.announced = true;
        let device = Self::own_device(snap, NetifRef::Default);
        let mut buf = [0u8; InfoDevice::SIZE];
        device.write(&mut Writer::new(&mut buf))?;
        snap.send_request(NetifRef::Default, MacAddr::BROADCAST, INFO_SERVICE_ID, element::SNOT, &buf)
    }

    fn own_device(snap: &dyn SnapSender, netif: NetifRef) -> InfoDevice {
        InfoDevice {
            roles: snap.device().roles,
            mac: snap.own_mac(netif),
        }
    }

    fn general_info<C: InfoContext>(ctx: &mut C, snap: &dyn SnapSender) -> GeneralInfo {
        let device = snap.device();
        GeneralInfo {
            manufacture_id: device.manufacture_id,
            device_type: device.device_type,
            mac: snap.own_mac(NetifRef::Default),
            firmware_version: ctx.firmware_version(),
            trust_list_version: ctx.trust_list_version(),
            roles: device.roles,
        }
    }

    fn statistics(snap: &dyn SnapSender) -> StatInfo {
        let stats = snap.statistics();
        StatInfo {
            sent: stats.sent,
            received: stats.received,
            mac: snap.own_mac(NetifRef::Default),
        }
    }

    fn start_notification<C: InfoContext>(
        &mut self,
        ctx: &mut C,
        snap: &dyn SnapSender,
        request: &Incoming<'_>,
    ) -> Result<usize> {
        let device = read_exact(request.content, InfoDevice::SIZE, InfoDevice::read)?;
        let tick = snap.tick();
        log_debug!(self.logs, tick, SOURCE, "{} started", device.mac);

        if device.mac != snap.own_mac(NetifRef::Default)
            && snap.device().roles.contains(DeviceRoles::THING)
            && device.roles.contains(DeviceRoles::GATEWAY)
        {
            log_info!(self.logs, tick, SOURCE, "gateway {} started, files to refresh", device.mac);
            self.files_refresh = true;
        }
        ctx.device_started(&device);
        Err(Error::CommandNoResponse)
    }

    fn report<C: InfoContext>(&mut self, ctx: &mut C, snap: &mut dyn SnapSender) -> Result<()> {
        let dest = self.poll.recipient;
        if self.poll.elements.contains(PollElements::GENERAL) {
            let mut buf = [0u8; GeneralInfo::SIZE];
            Self::general_info(ctx, snap).write(&mut Writer::new(&mut buf))?;
            snap.send_request(NetifRef::Default, dest, INFO_SERVICE_ID, element::GINF, &buf)?;
        }
        if self.poll.elements.contains(PollElements::STATISTICS) {
            let mut buf = [0u8; StatInfo::SIZE];
            Self::statistics(snap).write(&mut Writer::new(&mut buf))?;
            snap.send_request(NetifRef::Default, dest, INFO_SERVICE_ID, element::STAT, &buf)?;
        }
        Ok(())
    }
}

impl Default for InfoServer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: InfoContext> Service<C> for InfoServer {
    fn id(&self) -> u32 {
        INFO_SERVICE_ID
    }

    fn on_request(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        response: &mut [u8],
    ) -> Result<usize> {
        let mut w = Writer::new(response);
        match request.element() {
            element::SNOT => return self.start_notification(ctx, snap, request),
            element::ENUM => Self::own_device(snap, NetifRef::Index(request.netif)).write(&mut w)?,
            element::GINF => Self::general_info(ctx, snap).write(&mut w)?,
            element::STAT => Self::statistics(snap).write(&mut w)?,
            element::POLL => {
                let poll = read_exact(request.content, PollRequest::SIZE, PollRequest::read)?;
                self.poll.apply(&poll);
                log_info!(
                    self.logs,
                    snap.tick(),
                    SOURCE,
                    "polling {:?} every {} for {}",
                    self.poll.elements,
                    self.poll.period,
                    self.poll.recipient
                );
            }
            _ => return Err(Error::CommandNoResponse),
        }
        Ok(w.finish())
    }

    fn periodic(&mut self, ctx: &mut C, snap: &mut dyn SnapSender) {
        if !self.announced {
            if let Err(e) = self.announce(snap) {
                log_warn!(self.logs, snap.tick(), SOURCE, "start notification failed: {}", e);
            }
        }
        if self.poll.tick() && !self.poll.elements.is_empty() {
            if let Err(e) = self.report(ctx, snap) {
                log_warn!(self.logs, snap.tick(), SOURCE, "report to {} failed: {}", self.poll.recipient, e);
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

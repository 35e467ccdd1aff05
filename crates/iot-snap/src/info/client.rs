// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! INFO client
//!
//! Runs on a monitoring station: enumerates devices, switches their
//! polling on and off and hands the reports they push to the context.

use core::any::Any;

use iot_common::codec::Writer;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, Error, MacAddr, Result};

use super::{element, read_exact, GeneralInfo, InfoDevice, PollElements, PollRequest, StatInfo, INFO_SERVICE_ID};
use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "info-client";

/// Capacity of the enumerated device list
pub const INFO_DEVICES_CAPACITY: usize = 50;

/// Context of a station running an INFO client
pub trait InfoClientContext {
    /// A device broadcast its start notification
    fn device_announced(&mut self, _device: &InfoDevice) {}

    /// A polled device reported its general information
    fn general_info(&mut self, _info: &GeneralInfo) {}

    /// A polled device reported its traffic counters
    fn statistics(&mut self, _stat: &StatInfo) {}
}

/// Device information client
pub struct InfoClient {
    devices: heapless::Vec<InfoDevice, INFO_DEVICES_CAPACITY>,
    devices_max: usize,
    logs: LogBuffer,
}

impl InfoClient {
    /// Client keeping up to `devices_max` enumeration answers
    #[must_use]
    pub fn new(devices_max: usize) -> Self {
        Self {
            devices: heapless::Vec::new(),
            devices_max: devices_max.min(INFO_DEVICES_CAPACITY),
            logs: LogBuffer::new(),
        }
    }

    /// Devices that answered since the last enumeration started
    #[must_use]
    pub fn devices(&self) -> &[InfoDevice] {
        &self.devices
    }

    /// Client log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Forget previous answers and broadcast `ENUM`
    pub fn start_enum(&mut self, snap: &mut dyn SnapSender, netif: NetifRef) -> Result<()> {
        self.devices.clear();
        snap.send_request(netif, MacAddr::BROADCAST, INFO_SERVICE_ID, element::ENUM, &[])
    }

    /// Switch polling of `elements` on or off
    ///
    /// `dest` of `None` addresses every device. Reports come back to this
    /// station's default interface.
    pub fn set_polling(
        &mut self,
        snap: &mut dyn SnapSender,
        dest: Option<MacAddr>,
        elements: PollElements,
        enable: bool,
        period: u16,
    ) -> Result<()> {
        let request = PollRequest {
            elements,
            enable,
            period,
            recipient: snap.own_mac(NetifRef::Default),
        };
        let mut buf = [0u8; PollRequest::SIZE];
        request.write(&mut Writer::new(&mut buf))?;
        let dest = dest.unwrap_or(MacAddr::BROADCAST);
        log_debug!(self.logs, snap.tick(), SOURCE, "poll {:?} on {} enable={}", elements, dest, enable);
        snap.send_request(NetifRef::Default, dest, INFO_SERVICE_ID, element::POLL, &buf)
    }

    fn remember_device(&mut self, tick: u32, content: &[u8]) {
        let Ok(device) = read_exact(content, InfoDevice::SIZE, InfoDevice::read) else {
            log_warn!(self.logs, tick, SOURCE, "bad enumeration answer");
            return;
        };
        if self.devices.len() >= self.devices_max || self.devices.push(device).is_err() {
            log_warn!(self.logs, tick, SOURCE, "device list full, {} ignored", device.mac);
            return;
        }
        log_info!(self.logs, tick, SOURCE, "found {} ({:?})", device.mac, device.roles);
    }
}

impl<C: InfoClientContext> Service<C> for InfoClient {
    fn id(&self) -> u32 {
        INFO_SERVICE_ID
    }

    fn on_request(
        &mut self,
        ctx: &mut C,
        _snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        _response: &mut [u8],
    ) -> Result<usize> {
        match request.element() {
            element::SNOT => {
                let device = read_exact(request.content, InfoDevice::SIZE, InfoDevice::read)?;
                ctx.device_announced(&device);
                Err(Error::CommandNoResponse)
            }
            element::GINF => {
                ctx.general_info(&read_exact(request.content, GeneralInfo::SIZE, GeneralInfo::read)?);
                Ok(0)
            }
            element::STAT => {
                ctx.statistics(&read_exact(request.content, StatInfo::SIZE, StatInfo::read)?);
                Ok(0)
            }
            _ => Err(Error::CommandNoResponse),
        }
    }

    fn on_response(&mut self, _ctx: &mut C, snap: &mut dyn SnapSender, response: &Incoming<'_>) {
        let tick = snap.tick();
        match response.element() {
            element::ENUM if response.is_ack() => self.remember_device(tick, response.content),
            element::ENUM => log_warn!(self.logs, tick, SOURCE, "ENUM refused by {}", response.src()),
            _ => {}
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::DeviceRoles;

    fn create_test_answer(last: u8) -> [u8; InfoDevice::SIZE] {
        let device = InfoDevice {
            roles: DeviceRoles::THING,
            mac: MacAddr::new([2, 0, 0, 0, 0, last]),
        };
        let mut out = [0u8; InfoDevice::SIZE];
        device.write(&mut Writer::new(&mut out)).unwrap();
        out
    }

    #[test]
    fn test_answers_bounded() {
        let mut client = InfoClient::new(2);
        for last in 1..=3 {
            client.remember_device(0, &create_test_answer(last));
        }
        let macs: heapless::Vec<u8, 4> = client.devices().iter().map(|d| d.mac.0[5]).collect();
        assert_eq!(macs.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_bad_answer_ignored() {
        let mut client = InfoClient::new(4);
        client.remember_device(0, &[0u8; 3]);
        assert!(client.devices().is_empty());
        assert!(client.logs().contains("bad enumeration answer"));
    }

    #[test]
    fn test_limit_clamped_to_capacity() {
        let client = InfoClient::new(usize::MAX);
        assert_eq!(client.devices_max, INFO_DEVICES_CAPACITY);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PRVS server
//!
//! Runs on the device being provisioned. Key material is reached through
//! the [`PrvsBackend`] context; the server itself only tracks the
//! provisioning state and the last request id per element.

use core::any::Any;

use iot_common::codec::{Reader, Writer};
use iot_common::constants::PUBKEY_MAX_SIZE;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, Error, KeyType, Result};
use iot_provision::keys::SignRecord;
use iot_provision::slots::{self, own_pubkey_record, save_element, slot};
use iot_provision::{ProvisionElement, TlElement};
use iot_secmodule::HashType;

use super::{element, parse_set, DeviceAnnounce, DeviceInfo, PrvsBackend, ProvisionState, PRVS_SERVICE_ID};
use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "prvs";

/// Elements whose last request id is remembered
const TRACKED_ELEMENTS: usize = 16;

/// Largest signature record kept in the signature slot
const SIGNATURE_MAX_SIZE: usize = 256;

/// Provisioning server
pub struct PrvsServer {
    state: ProvisionState,
    last_requests: heapless::Vec<(u32, u16), TRACKED_ELEMENTS>,
    logs: LogBuffer,
}

impl PrvsServer {
    /// Server for a device that has never been provisioned
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ProvisionState::Uninitialized,
            last_requests: heapless::Vec::new(),
            logs: LogBuffer::new(),
        }
    }

    /// Server whose state reflects what the backend already holds
    pub fn restore<C: PrvsBackend>(ctx: &mut C) -> Self {
        let (sm, tl) = ctx.provision_parts();
        let state = if !slots::has_device_key(&*sm) {
            ProvisionState::Uninitialized
        } else if tl.is_ready() {
            ProvisionState::Provisioned
        } else {
            ProvisionState::KeyGenerated
        };
        Self {
            state,
            ..Self::new()
        }
    }

    /// Current provisioning state
    #[must_use]
    pub const fn state(&self) -> ProvisionState {
        self.state
    }

    /// Server log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    fn last_request(&self, element: u32) -> Option<u16> {
        self.last_requests
            .iter()
            .find(|(e, _)| *e == element)
            .map(|(_, id)| *id)
    }

    fn record_request(&mut self, element: u32, request_id: u16) {
        if let Some(entry) = self.last_requests.iter_mut().find(|(e, _)| *e == element) {
            entry.1 = request_id;
        } else if self.last_requests.push((element, request_id)).is_err() {
            // Full: forget the oldest element
            self.last_requests.remove(0);
            let _ = self.last_requests.push((element, request_id));
        }
    }

    /// Apply a set request once per request id
    fn set_once(
        &mut self,
        tick: u32,
        element: u32,
        content: &[u8],
        apply: impl FnOnce(&[u8]) -> Result<()>,
    ) -> Result<usize> {
        let (request_id, data) = parse_set(content)?;
        if self.last_request(element) == Some(request_id) {
            log_debug!(self.logs, tick, SOURCE, "repeated request {} for {:08x}", request_id, element);
            return Ok(0);
        }
        apply(data)?;
        self.record_request(element, request_id);
        Ok(0)
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn discover(&self, snap: &dyn SnapSender, netif: usize, response: &mut [u8]) -> Result<usize> {
        if self.state != ProvisionState::Uninitialized {
            return Err(Error::CommandNoResponse);
        }
        let announce = DeviceAnnounce {
            mac: snap.own_mac(NetifRef::Index(netif)),
            roles: snap.device().roles,
        };
        let mut w = Writer::new(response);
        announce.write(&mut w)?;
        Ok(w.finish())
    }

    fn device_info<C: PrvsBackend>(
        ctx: &mut C,
        snap: &dyn SnapSender,
        netif: usize,
        response: &mut [u8],
    ) -> Result<usize> {
        let (sm, _) = ctx.provision_parts();

        let mut data = [0u8; PUBKEY_MAX_SIZE + 8 + SIGNATURE_MAX_SIZE];
        let key_len = own_pubkey_record(&*sm, &mut data)?;
        // Signature slot is empty until the station stores SGNP
        let sign_len = slots::load_element(&*sm, ProvisionElement::Sgnp, &mut data[key_len..]).unwrap_or(0);
        let data = &data[..key_len + sign_len];

        let device = snap.device();
        let info = DeviceInfo {
            manufacture_id: device.manufacture_id,
            device_type: device.device_type,
            serial: device.serial,
            mac: snap.own_mac(NetifRef::Index(netif)),
            data,
        };
        let mut w = Writer::new(response);
        info.write_header(&mut w, data.len())?;
        w.put(data)?;
        Ok(w.finish())
    }

    fn save_provision<C: PrvsBackend>(&mut self, ctx: &mut C, tick: u32, response: &mut [u8]) -> Result<usize> {
        let (sm, _) = ctx.provision_parts();
        if self.state == ProvisionState::Uninitialized {
            slots::reset_device_keys(sm)?;
            self.state = ProvisionState::KeyGenerated;
            log_info!(self.logs, tick, SOURCE, "device key pair generated");
        }
        own_pubkey_record(&*sm, response)
    }

    fn sign<C: PrvsBackend>(ctx: &mut C, content: &[u8], response: &mut [u8]) -> Result<usize> {
        let (sm, _) = ctx.provision_parts();
        let mut r = Reader::new(content);
        let hash_type = HashType::from_u8(r.u8()?)?;
        SignRecord::create(
            &*sm,
            slot::PRIVATE_KEY,
            KeyType::IotDevice,
            hash_type,
            r.rest(),
            response,
        )
    }

    fn trust_list_part<C: PrvsBackend>(
        &mut self,
        ctx: &mut C,
        tick: u32,
        request: &Incoming<'_>,
        part: TlElement,
    ) -> Result<usize> {
        let (sm, tl) = ctx.provision_parts();
        let res = self.set_once(tick, request.element(), request.content, |data| {
            tl.save_part(&*sm, part, data)
        });
        match (&res, part) {
            (Ok(_), TlElement::Footer) if tl.is_ready() => {
                self.state = ProvisionState::Provisioned;
                log_info!(self.logs, tick, SOURCE, "trust list installed");
            }
            (Err(e), _) => log_warn!(self.logs, tick, SOURCE, "trust list part rejected: {}", e),
            _ => {}
        }
        res
    }
}

impl Default for PrvsServer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: PrvsBackend> Service<C> for PrvsServer {
    fn id(&self) -> u32 {
        PRVS_SERVICE_ID
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
            element::DNID => self.discover(snap, request.netif, response),
            element::DEVI => Self::device_info(ctx, snap, request.netif, response),
            element::ASAV => self.save_provision(ctx, tick, response),
            element::ASGN => Self::sign(ctx, request.content, response),
            element::TLH => self.trust_list_part(ctx, tick, request, TlElement::Header),
            element::TLC => self.trust_list_part(ctx, tick, request, TlElement::Key),
            element::TLF => self.trust_list_part(ctx, tick, request, TlElement::Footer),
            code => {
                let Some(target) = ProvisionElement::from_fourcc(code) else {
                    return Err(Error::CommandNoResponse);
                };
                let (sm, _) = ctx.provision_parts();
                self.set_once(tick, code, request.content, |data| save_element(sm, target, data))
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

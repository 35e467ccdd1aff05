// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PRVS client
//!
//! [`PrvsClient`] is the service half registered with the station's engine;
//! it owns the single pending request slot. [`PrvsSession`] wraps the
//! engine with a timer and a pump closure and offers blocking helpers.

use core::any::Any;

use iot_common::codec::{Reader, Writer};
use iot_common::config::PrvsConfig;
use iot_common::constants::SNAP_MAX_CONTENT_SIZE;
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_warn, Error, MacAddr, Result};
use iot_hal::{NetifInterface, TimerInterface};
use iot_provision::{PubkeyDated, TlHeader};
use iot_secmodule::HashType;

use super::{element, write_set, DeviceAnnounce, DeviceInfo, PRVS_SERVICE_ID};
use crate::service::{Incoming, NetifRef, Service, SnapSender};
use crate::snap::Snap;

/// Log source tag
const SOURCE: &str = "prvs-client";

/// Capacity of the discovered device list
pub const DEVICE_LIST_CAPACITY: usize = 50;

/// Delay between two pump polls
const POLL_INTERVAL_MS: u32 = 10;

/// Response content copied out of the receive path
pub type Content = heapless::Vec<u8, SNAP_MAX_CONTENT_SIZE>;

/// Devices answering a discovery
pub type DeviceList = heapless::Vec<DeviceAnnounce, DEVICE_LIST_CAPACITY>;

/// Outcome of a request
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Ack(Content),
    Nack,
}

/// The one outstanding request
#[derive(Debug)]
struct Pending {
    element: u32,
    dest: MacAddr,
    reply: Option<Reply>,
}

/// Provisioning client service
pub struct PrvsClient {
    config: PrvsConfig,
    pending: Option<Pending>,
    devices: DeviceList,
    request_id: u16,
    logs: LogBuffer,
}

impl PrvsClient {
    /// Create an idle client
    #[must_use]
    pub const fn new(config: PrvsConfig) -> Self {
        Self {
            config,
            pending: None,
            devices: heapless::Vec::new(),
            request_id: 0,
            logs: LogBuffer::new(),
        }
    }

    /// Client configuration
    #[must_use]
    pub const fn config(&self) -> &PrvsConfig {
        &self.config
    }

    /// Check for an outstanding request
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Devices collected since the last discovery started
    #[must_use]
    pub fn devices(&self) -> &[DeviceAnnounce] {
        &self.devices
    }

    /// Client log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Allocate the id for a new set request
    pub fn next_request_id(&mut self) -> u16 {
        self.request_id = self.request_id.wrapping_add(1);
        self.request_id
    }

    /// Send a request and occupy the pending slot
    ///
    /// Fails with [`Error::Busy`] while another request is outstanding.
    pub fn start(
        &mut self,
        snap: &mut dyn SnapSender,
        dest: MacAddr,
        element_id: u32,
        content: &[u8],
    ) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::Busy);
        }
        if element_id == element::DNID {
            self.devices.clear();
        }
        snap.send_request(NetifRef::Default, dest, PRVS_SERVICE_ID, element_id, content)?;
        self.pending = Some(Pending {
            element: element_id,
            dest,
            reply: None,
        });
        log_debug!(self.logs, snap.tick(), SOURCE, "request {:08x} to {}", element_id, dest);
        Ok(())
    }

    /// Take the reply of the pending request if it has arrived
    ///
    /// `None` while waiting; the slot is freed once a reply is taken.
    pub fn take_reply(&mut self) -> Option<Result<Content>> {
        let reply = self.pending.as_mut()?.reply.take()?;
        self.pending = None;
        Some(match reply {
            Reply::Ack(content) => Ok(content),
            Reply::Nack => Err(Error::Nack),
        })
    }

    /// Give up on the pending request; late responses are then ignored
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    fn remember_device(&mut self, tick: u32, content: &[u8]) {
        let Ok(announce) = DeviceAnnounce::read(&mut Reader::new(content)) else {
            log_warn!(self.logs, tick, SOURCE, "bad discovery answer");
            return;
        };
        // Answers are kept in arrival order, repeats included
        if self.devices.len() >= self.config.dnid_list_max || self.devices.push(announce).is_err() {
            log_warn!(self.logs, tick, SOURCE, "device list full, {} ignored", announce.mac);
            return;
        }
        log_info!(self.logs, tick, SOURCE, "found {}", announce.mac);
    }
}

impl<C> Service<C> for PrvsClient {
    fn id(&self) -> u32 {
        PRVS_SERVICE_ID
    }

    fn on_request(
        &mut self,
        _ctx: &mut C,
        _snap: &mut dyn SnapSender,
        _request: &Incoming<'_>,
        _response: &mut [u8],
    ) -> Result<usize> {
        Err(Error::CommandNoResponse)
    }

    fn on_response(&mut self, _ctx: &mut C, snap: &mut dyn SnapSender, response: &Incoming<'_>) {
        let tick = snap.tick();
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        if response.element() != pending.element {
            log_debug!(self.logs, tick, SOURCE, "late response {:08x} ignored", response.element());
            return;
        }
        if pending.element == element::DNID {
            if response.is_ack() {
                self.remember_device(tick, response.content);
            }
            return;
        }
        if !pending.dest.is_broadcast() && response.src() != pending.dest {
            return;
        }
        pending.reply = Some(if response.is_ack() {
            let mut content = Content::new();
            // Content never exceeds the frame limit
            let _ = content.extend_from_slice(response.content);
            Reply::Ack(content)
        } else {
            Reply::Nack
        });
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// =============================================================================
// Trust list splitting
// =============================================================================

/// A serialized trust list cut into the parts PRVS uploads one by one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustListParts<'a> {
    /// Header bytes
    pub header: &'a [u8],
    /// Decoded header
    pub info: TlHeader,
    /// All keys back to back
    pub keys: &'a [u8],
    /// Footer bytes
    pub footer: &'a [u8],
}

impl<'a> TrustListParts<'a> {
    /// Split a blob laid out as `[header][keys...][footer]`
    pub fn split(blob: &'a [u8]) -> Result<Self> {
        let header = blob.get(..TlHeader::SIZE).ok_or(Error::IncorrectArgument)?;
        let info = TlHeader::from_bytes(header)?;

        let mut r = Reader::new(&blob[TlHeader::SIZE..]);
        for _ in 0..info.pub_keys_count {
            PubkeyDated::read(&mut r)?;
        }
        let keys_end = TlHeader::SIZE + r.position();
        Ok(Self {
            header,
            info,
            keys: &blob[TlHeader::SIZE..keys_end],
            footer: &blob[keys_end..],
        })
    }

    /// Each dated key record in order
    pub fn keys(&self) -> impl Iterator<Item = Result<&'a [u8]>> {
        let mut rest = self.keys;
        core::iter::from_fn(move || {
            if rest.is_empty() {
                return None;
            }
            let mut r = Reader::new(rest);
            match PubkeyDated::read(&mut r) {
                Ok(_) => {
                    let (key, tail) = rest.split_at(r.position());
                    rest = tail;
                    Some(Ok(key))
                }
                Err(e) => {
                    rest = &[];
                    Some(Err(e))
                }
            }
        })
    }
}

// =============================================================================
// Blocking session
// =============================================================================

/// Blocking provisioning helpers over a station engine
///
/// `pump` is called between polls to move frames through the receive path;
/// it receives the engine and its context.
pub struct PrvsSession<'a, N, C, T, P>
where
    N: NetifInterface,
    T: TimerInterface,
    P: FnMut(&mut Snap<N, C>, &mut C) -> Result<()>,
{
    snap: &'a mut Snap<N, C>,
    ctx: &'a mut C,
    timer: &'a mut T,
    pump: P,
    config: PrvsConfig,
}

impl<'a, N, C, T, P> PrvsSession<'a, N, C, T, P>
where
    N: NetifInterface,
    T: TimerInterface,
    P: FnMut(&mut Snap<N, C>, &mut C) -> Result<()>,
{
    /// Open a session; the engine must carry a registered [`PrvsClient`]
    pub fn new(snap: &'a mut Snap<N, C>, ctx: &'a mut C, timer: &'a mut T, pump: P) -> Result<Self> {
        let config = *snap.service_mut::<PrvsClient>().ok_or(Error::NotFound)?.config();
        Ok(Self {
            snap,
            ctx,
            timer,
            pump,
            config,
        })
    }

    fn start(&mut self, dest: MacAddr, element_id: u32, content: &[u8]) -> Result<()> {
        self.snap
            .with_service::<PrvsClient, _>(|client, sender| client.start(sender, dest, element_id, content))
            .ok_or(Error::NotFound)?
    }

    fn client(&mut self) -> Result<&mut PrvsClient> {
        self.snap.service_mut::<PrvsClient>().ok_or(Error::NotFound)
    }

    /// Poll until the pending request is answered
    fn wait(&mut self) -> Result<Content> {
        for _ in 0..self.config.wait_polls {
            (self.pump)(&mut *self.snap, &mut *self.ctx)?;
            if let Some(reply) = self.client()?.take_reply() {
                return reply;
            }
            self.timer.delay_ms(POLL_INTERVAL_MS);
        }
        self.client()?.cancel();
        Err(Error::Timeout)
    }

    /// Send one request and wait for its reply
    pub fn request(&mut self, dest: MacAddr, element_id: u32, content: &[u8]) -> Result<Content> {
        self.start(dest, element_id, content)?;
        self.wait()
    }

    /// Broadcast a discovery and collect answers for the whole wait window
    pub fn enum_devices(&mut self) -> Result<DeviceList> {
        self.start(MacAddr::BROADCAST, element::DNID, &[])?;
        for _ in 0..self.config.wait_polls {
            (self.pump)(&mut *self.snap, &mut *self.ctx)?;
            self.timer.delay_ms(POLL_INTERVAL_MS);
        }
        let client = self.client()?;
        client.cancel();
        Ok(client.devices.clone())
    }

    /// Fetch a device's identity and key record
    pub fn device_info(&mut self, dest: MacAddr) -> Result<Content> {
        let content = self.request(dest, element::DEVI, &[])?;
        let mut r = Reader::new(&content);
        DeviceInfo::read(&mut r)?;
        if r.remaining() != 0 {
            return Err(Error::MalformedFrame);
        }
        Ok(content)
    }

    /// Have the device generate its key pair; returns its public key record
    pub fn save_provision(&mut self, dest: MacAddr) -> Result<Content> {
        self.request(dest, element::ASAV, &[])
    }

    /// Write one element, retrying on timeout
    ///
    /// Retries reuse the request id so the device applies the write once.
    pub fn set(&mut self, dest: MacAddr, element_id: u32, data: &[u8]) -> Result<()> {
        let request_id = self.client()?.next_request_id();
        let mut content = [0u8; SNAP_MAX_CONTENT_SIZE];
        let len = write_set(request_id, data, &mut content)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.request(dest, element_id, &content[..len]) {
                Err(Error::Timeout) if attempts < self.config.retry_limit => {
                    let tick = self.timer.now_ms();
                    let client = self.client()?;
                    log_warn!(client.logs, tick, SOURCE, "retry {} of {:08x}", attempts, element_id);
                }
                res => return res.map(|_| ()),
            }
        }
    }

    /// Read an element
    pub fn get(&mut self, dest: MacAddr, element_id: u32) -> Result<Content> {
        self.request(dest, element_id, &[])
    }

    /// Have the device sign `data`; returns the signature record
    pub fn sign_data(&mut self, dest: MacAddr, hash_type: HashType, data: &[u8]) -> Result<Content> {
        let mut content = [0u8; SNAP_MAX_CONTENT_SIZE];
        let mut w = Writer::new(&mut content);
        w.u8(hash_type as u8)?.put(data)?;
        let len = w.finish();
        self.request(dest, element::ASGN, &content[..len])
    }

    /// Stage the header of a serialized trust list
    pub fn set_tl_header(&mut self, dest: MacAddr, blob: &[u8]) -> Result<TlHeader> {
        let parts = TrustListParts::split(blob)?;
        self.set(dest, element::TLH, parts.header)?;
        Ok(parts.info)
    }

    /// Stage every key of a serialized trust list
    pub fn set_tl_keys(&mut self, dest: MacAddr, blob: &[u8]) -> Result<u16> {
        let parts = TrustListParts::split(blob)?;
        let mut sent = 0u16;
        for key in parts.keys() {
            self.set(dest, element::TLC, key?)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Send the footer of a serialized trust list, committing it on the device
    pub fn set_tl_footer(&mut self, dest: MacAddr, blob: &[u8]) -> Result<()> {
        let parts = TrustListParts::split(blob)?;
        self.set(dest, element::TLF, parts.footer)
    }

    /// Upload a whole trust list: header, keys, then footer
    pub fn upload_trust_list(&mut self, dest: MacAddr, blob: &[u8]) -> Result<()> {
        self.set_tl_header(dest, blob)?;
        self.set_tl_keys(dest, blob)?;
        self.set_tl_footer(dest, blob)
    }
}

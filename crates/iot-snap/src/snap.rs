// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SNAP engine
//!
//! Owns the network interfaces, their reassembly buffers and the service
//! table. Incoming bytes are reassembled, optionally repeated to the other
//! interfaces of a gateway, filtered by address and dispatched to the
//! services whose id matches.

use alloc::boxed::Box;
use alloc::vec::Vec;

use heapless::Deque;

use iot_common::config::SnapConfig;
use iot_common::constants::{SNAP_MAX_CONTENT_SIZE, SNAP_MAX_FRAME_SIZE, SNAP_MAX_NETIFS};
use iot_common::log::LogBuffer;
use iot_common::{log_debug, log_info, log_trace, log_warn, DeviceRoles, Error, MacAddr, Result};
use iot_hal::NetifInterface;

use crate::frame::{decode, encode, FrameFlags, FrameHeader};
use crate::reassembly::{Feed, Reassembler};
use crate::service::{DeviceIdentity, Incoming, NetifRef, Service, SnapSender};

/// Log source tag
const SOURCE: &str = "snap";

/// Upper bound on the routing loop cache
const SEEN_CACHE_MAX: usize = 64;

/// Hook that sees every accepted frame before dispatch
///
/// Returning `true` consumes the frame.
pub type Preprocessor = fn(&Incoming<'_>) -> bool;

/// Traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapStats {
    /// Frames transmitted, counted per interface
    pub sent: u32,
    /// Frames accepted for this device
    pub received: u32,
    /// Transmissions an interface refused, repeats included
    pub tx_failed: u32,
}

struct NetifSlot<N> {
    netif: N,
    reassembly: Reassembler,
}

/// Engine state shared with services through [`SnapSender`]
struct SnapCore<N> {
    netifs: heapless::Vec<NetifSlot<N>, SNAP_MAX_NETIFS>,
    identity: DeviceIdentity,
    config: SnapConfig,
    stats: SnapStats,
    logs: LogBuffer,
    ops: u32,
    transaction_id: u32,
    /// (source, transaction id) of recently repeated frames
    seen: Deque<(MacAddr, u32), SEEN_CACHE_MAX>,
}

impl<N: NetifInterface> SnapCore<N> {
    fn slot_index(&self, netif: NetifRef) -> Result<usize> {
        let index = match netif {
            NetifRef::Default | NetifRef::Routing => 0,
            NetifRef::Index(index) => index,
        };
        if index < self.netifs.len() {
            Ok(index)
        } else {
            Err(Error::IncorrectArgument)
        }
    }

    fn mac_of(&self, index: usize) -> MacAddr {
        self.netifs
            .get(index)
            .map_or(MacAddr::ZERO, |slot| slot.netif.mac())
    }

    fn transmit(&mut self, netif: NetifRef, frame: &[u8]) -> Result<()> {
        if netif == NetifRef::Routing {
            let mut res = Ok(());
            for index in 0..self.netifs.len() {
                if let Err(e) = self.transmit_on(index, frame) {
                    res = res.and(Err(e));
                }
            }
            return res;
        }
        let index = self.slot_index(netif)?;
        self.transmit_on(index, frame)
    }

    fn transmit_on(&mut self, index: usize, frame: &[u8]) -> Result<()> {
        let slot = self.netifs.get_mut(index).ok_or(Error::IncorrectArgument)?;
        match slot.netif.tx(frame) {
            Ok(()) => {
                self.stats.sent = self.stats.sent.wrapping_add(1);
                Ok(())
            }
            Err(e) => {
                self.stats.tx_failed = self.stats.tx_failed.wrapping_add(1);
                log_warn!(self.logs, self.ops, SOURCE, "tx on netif {} failed: {}", index, e);
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Routing
    // =========================================================================

    fn should_route(&self, netif: usize, header: &FrameHeader) -> bool {
        let own = self.mac_of(netif);
        self.config.routing
            && self.identity.roles.contains(DeviceRoles::GATEWAY)
            && self.netifs.len() > 1
            && !header.dest.is_broadcast()
            && header.dest != own
            && header.src != own
    }

    /// Remember a frame, returning `false` if it was repeated before
    fn remember(&mut self, key: (MacAddr, u32)) -> bool {
        let capacity = self.config.seen_cache.min(SEEN_CACHE_MAX);
        if capacity == 0 {
            return true;
        }
        if self.seen.iter().any(|seen| *seen == key) {
            return false;
        }
        while self.seen.len() >= capacity {
            self.seen.pop_front();
        }
        // Room was made above
        let _ = self.seen.push_back(key);
        true
    }

    fn route(&mut self, from: usize, header: &FrameHeader, frame: &[u8]) {
        if !self.remember((header.src, header.transaction_id)) {
            log_debug!(
                self.logs,
                self.ops,
                SOURCE,
                "not repeating {} txn {}",
                header.src,
                header.transaction_id
            );
            return;
        }
        for index in 0..self.netifs.len() {
            if index != from && self.transmit_on(index, frame).is_err() {
                log_debug!(self.logs, self.ops, SOURCE, "repeat of txn {} dropped", header.transaction_id);
            }
        }
    }

    fn respond(&mut self, netif: usize, request: &FrameHeader, flags: FrameFlags, content: &[u8]) {
        let header = FrameHeader {
            src: self.mac_of(netif),
            dest: request.src,
            flags,
            transaction_id: self.next_transaction_id(),
            ..*request
        };
        if let Err(e) = self.send_frame(NetifRef::Index(netif), &header, content) {
            log_warn!(self.logs, self.ops, SOURCE, "response to {} lost: {}", request.src, e);
        }
    }
}

impl<N: NetifInterface> SnapSender for SnapCore<N> {
    fn own_mac(&self, netif: NetifRef) -> MacAddr {
        self.slot_index(netif)
            .map_or(MacAddr::ZERO, |index| self.mac_of(index))
    }

    fn device(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn send_frame(&mut self, netif: NetifRef, header: &FrameHeader, content: &[u8]) -> Result<()> {
        let mut frame = [0u8; SNAP_MAX_FRAME_SIZE];
        let len = encode(header, content, &mut frame)?;
        self.transmit(netif, &frame[..len])
    }

    fn next_transaction_id(&mut self) -> u32 {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        self.transaction_id
    }

    fn tick(&self) -> u32 {
        self.ops
    }

    fn statistics(&self) -> SnapStats {
        self.stats
    }
}

// =============================================================================
// Engine
// =============================================================================

/// SNAP protocol engine
///
/// `N` is the network interface type, `C` the context handed to services.
pub struct Snap<N: NetifInterface, C> {
    core: SnapCore<N>,
    services: Vec<Box<dyn Service<C>>>,
    preprocessor: Option<Preprocessor>,
}

impl<N: NetifInterface, C> Snap<N, C> {
    /// Bring up the default interface and create the engine
    pub fn init(config: SnapConfig, identity: DeviceIdentity, mut netif: N) -> Result<Self> {
        if config.max_netifs == 0 || config.max_netifs > SNAP_MAX_NETIFS {
            return Err(Error::IncorrectArgument);
        }
        netif.init()?;

        let mut netifs = heapless::Vec::new();
        netifs
            .push(NetifSlot {
                netif,
                reassembly: Reassembler::new(),
            })
            .map_err(|_| Error::TooManyInterfaces)?;

        let mut core = SnapCore {
            netifs,
            identity,
            config,
            stats: SnapStats::default(),
            logs: LogBuffer::new(),
            ops: 0,
            transaction_id: 0,
            seen: Deque::new(),
        };
        let mac = core.mac_of(0);
        log_info!(core.logs, core.ops, SOURCE, "up on {} roles {:#x}", mac, identity.roles.bits());

        Ok(Self {
            core,
            services: Vec::new(),
            preprocessor: None,
        })
    }

    /// Add another interface, returning its index
    ///
    /// Only a routing engine carries more than the default interface.
    pub fn netif_add(&mut self, mut netif: N) -> Result<usize> {
        let limit = if self.core.config.routing {
            self.core.config.max_netifs
        } else {
            1
        };
        if self.core.netifs.len() >= limit {
            return Err(Error::TooManyInterfaces);
        }
        netif.init()?;
        self.core
            .netifs
            .push(NetifSlot {
                netif,
                reassembly: Reassembler::new(),
            })
            .map_err(|_| Error::TooManyInterfaces)?;
        Ok(self.core.netifs.len() - 1)
    }

    /// Append a service to the dispatch table
    pub fn register_service(&mut self, service: Box<dyn Service<C>>) -> Result<()> {
        if self.services.len() >= self.core.config.max_services {
            return Err(Error::TooManyServices);
        }
        let id = service.id();
        self.services.push(service);
        log_debug!(
            self.core.logs,
            self.core.ops,
            SOURCE,
            "service {:08x} registered",
            id
        );
        Ok(())
    }

    /// Install or remove the frame preprocessor
    pub fn set_preprocessor(&mut self, preprocessor: Option<Preprocessor>) {
        self.preprocessor = preprocessor;
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    /// Feed bytes received on interface `netif`
    ///
    /// Every frame completed by `data` is processed before returning.
    pub fn receive(&mut self, ctx: &mut C, netif: usize, mut data: &[u8]) -> Result<()> {
        if netif >= self.core.netifs.len() {
            return Err(Error::IncorrectArgument);
        }
        let mut frame = [0u8; SNAP_MAX_FRAME_SIZE];

        while !data.is_empty() {
            let (used, feed) = self.core.netifs[netif].reassembly.push(data, &mut frame);
            data = &data[used..];
            match feed {
                Feed::Pending => {}
                Feed::Frame(len) => self.process_frame(ctx, netif, &frame[..len]),
                Feed::Malformed => {
                    log_warn!(self.core.logs, self.core.ops, SOURCE, "oversized frame dropped");
                }
            }
        }
        Ok(())
    }

    fn process_frame(&mut self, ctx: &mut C, netif: usize, frame: &[u8]) {
        self.core.ops = self.core.ops.wrapping_add(1);
        let Ok((header, content)) = decode(frame) else {
            log_warn!(self.core.logs, self.core.ops, SOURCE, "malformed frame dropped");
            return;
        };

        if self.core.should_route(netif, &header) {
            self.core.route(netif, &header, frame);
        }

        let own = self.core.mac_of(netif);
        if header.src == own || !(header.dest.is_broadcast() || header.dest == own) {
            log_trace!(self.core.logs, self.core.ops, SOURCE, "frame for {} ignored", header.dest);
            return;
        }
        self.core.stats.received = self.core.stats.received.wrapping_add(1);

        let incoming = Incoming {
            netif,
            header,
            content,
        };
        if let Some(preprocessor) = self.preprocessor {
            if preprocessor(&incoming) {
                return;
            }
        }
        self.dispatch(ctx, &incoming);
    }

    fn dispatch(&mut self, ctx: &mut C, incoming: &Incoming<'_>) {
        let Self { core, services, .. } = self;
        let mut response = [0u8; SNAP_MAX_CONTENT_SIZE];

        for service in services.iter_mut() {
            if service.id() != incoming.header.service_id {
                continue;
            }
            if incoming.header.is_response() {
                service.on_response(ctx, core, incoming);
                continue;
            }
            match service.on_request(ctx, core, incoming, &mut response) {
                Ok(len) => {
                    let len = len.min(response.len());
                    core.respond(incoming.netif, &incoming.header, FrameFlags::ACK, &response[..len]);
                }
                Err(Error::CommandNoResponse) => {}
                Err(e) => {
                    log_debug!(
                        core.logs,
                        core.ops,
                        SOURCE,
                        "NACK {:08x}/{:08x}: {}",
                        incoming.header.service_id,
                        incoming.header.element_id,
                        e
                    );
                    core.respond(incoming.netif, &incoming.header, FrameFlags::NACK, &[]);
                }
            }
        }
    }

    /// Run every service's periodic handler
    pub fn periodic(&mut self, ctx: &mut C) {
        let Self { core, services, .. } = self;
        core.ops = core.ops.wrapping_add(1);
        for service in services.iter_mut() {
            service.periodic(ctx, core);
        }
    }

    // =========================================================================
    // Send path
    // =========================================================================

    /// Transmit an encoded frame
    pub fn send(&mut self, netif: NetifRef, frame: &[u8]) -> Result<()> {
        self.core.transmit(netif, frame)
    }

    /// Send a request with a fresh transaction id
    pub fn send_request(
        &mut self,
        netif: NetifRef,
        dest: MacAddr,
        service_id: u32,
        element_id: u32,
        content: &[u8],
    ) -> Result<()> {
        self.core.send_request(netif, dest, service_id, element_id, content)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Run `f` against the first registered service of type `T`
    pub fn with_service<T: 'static, R>(&mut self, f: impl FnOnce(&mut T, &mut dyn SnapSender) -> R) -> Option<R> {
        let Self { core, services, .. } = self;
        let service = services
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())?;
        Some(f(service, core))
    }

    /// First registered service of type `T`
    pub fn service_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.services
            .iter_mut()
            .find_map(|s| s.as_any_mut().downcast_mut::<T>())
    }

    /// Number of registered services
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Traffic counters
    #[must_use]
    pub const fn statistics(&self) -> SnapStats {
        self.core.stats
    }

    /// Device identity
    #[must_use]
    pub const fn identity(&self) -> &DeviceIdentity {
        &self.core.identity
    }

    /// MAC address of an interface
    #[must_use]
    pub fn own_mac(&self, netif: NetifRef) -> MacAddr {
        self.core.own_mac(netif)
    }

    /// Interface by index
    #[must_use]
    pub fn netif(&self, index: usize) -> Option<&N> {
        self.core.netifs.get(index).map(|slot| &slot.netif)
    }

    /// Number of interfaces
    #[must_use]
    pub fn netif_count(&self) -> usize {
        self.core.netifs.len()
    }

    /// Engine log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.core.logs
    }

    /// Shut down services then interfaces, in registration order
    pub fn deinit(&mut self, ctx: &mut C) -> Result<()> {
        for service in &mut self.services {
            service.deinit(ctx);
        }

        let mut res = Ok(());
        for slot in &mut self.core.netifs {
            slot.reassembly.reset();
            if let Err(e) = slot.netif.deinit() {
                res = res.and(Err(e.into()));
            }
        }
        self.services.clear();
        log_info!(self.core.logs, self.core.ops, SOURCE, "down");
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::any::Any;
    use iot_common::fourcc;
    use iot_hal::sim::QueueNetif;

    const ECHO: u32 = fourcc(b"ECHO");

    struct EchoService {
        id: u32,
        responses: u32,
        ticks: u32,
    }

    impl Service<u32> for EchoService {
        fn id(&self) -> u32 {
            self.id
        }

        fn on_request(
            &mut self,
            ctx: &mut u32,
            _snap: &mut dyn SnapSender,
            request: &Incoming<'_>,
            response: &mut [u8],
        ) -> Result<usize> {
            *ctx += 1;
            match request.content {
                b"quiet" => Err(Error::CommandNoResponse),
                b"fail" => Err(Error::IncorrectArgument),
                content => {
                    response[..content.len()].copy_from_slice(content);
                    Ok(content.len())
                }
            }
        }

        fn on_response(&mut self, _ctx: &mut u32, _snap: &mut dyn SnapSender, _response: &Incoming<'_>) {
            self.responses += 1;
        }

        fn periodic(&mut self, _ctx: &mut u32, _snap: &mut dyn SnapSender) {
            self.ticks += 1;
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn create_test_snap(config: SnapConfig) -> Snap<QueueNetif, u32> {
        let mut snap = Snap::init(
            config,
            DeviceIdentity::default(),
            QueueNetif::new(MacAddr::new([2, 0, 0, 0, 0, 1])),
        )
        .unwrap();
        snap.register_service(Box::new(EchoService {
            id: ECHO,
            responses: 0,
            ticks: 0,
        }))
        .unwrap();
        snap
    }

    fn create_test_frame(src: [u8; 6], dest: MacAddr, flags: FrameFlags, content: &[u8]) -> Vec<u8> {
        let mut header = FrameHeader::request(MacAddr::new(src), dest, ECHO, fourcc(b"PING"), 7);
        header.flags = flags;
        let mut out = [0u8; SNAP_MAX_FRAME_SIZE];
        let len = encode(&header, content, &mut out).unwrap();
        out[..len].to_vec()
    }

    #[test]
    fn test_request_answered_with_ack() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let outbox = snap.netif(0).unwrap().outbox();
        let mut calls = 0;

        let frame = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::BROADCAST, FrameFlags::empty(), b"hi");
        snap.receive(&mut calls, 0, &frame).unwrap();
        assert_eq!(calls, 1);

        let sent = outbox.borrow_mut().pop_front().unwrap();
        let (header, content) = decode(&sent).unwrap();
        assert_eq!(header.flags, FrameFlags::ACK);
        assert_eq!(header.src, MacAddr::new([2, 0, 0, 0, 0, 1]));
        assert_eq!(header.dest, MacAddr::new([2, 0, 0, 0, 0, 9]));
        assert_eq!(header.element_id, fourcc(b"PING"));
        assert_ne!(header.transaction_id, 7);
        assert_eq!(content, b"hi");
        assert_eq!(snap.statistics(), SnapStats { sent: 1, received: 1, tx_failed: 0 });
    }

    #[test]
    fn test_nack_and_silence() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let outbox = snap.netif(0).unwrap().outbox();
        let mut calls = 0;

        let quiet = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::BROADCAST, FrameFlags::empty(), b"quiet");
        snap.receive(&mut calls, 0, &quiet).unwrap();
        assert!(outbox.borrow().is_empty());

        let fail = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::BROADCAST, FrameFlags::empty(), b"fail");
        snap.receive(&mut calls, 0, &fail).unwrap();
        let sent = outbox.borrow_mut().pop_front().unwrap();
        let (header, content) = decode(&sent).unwrap();
        assert_eq!(header.flags, FrameFlags::NACK);
        assert!(content.is_empty());
    }

    #[test]
    fn test_responses_not_answered() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let outbox = snap.netif(0).unwrap().outbox();
        let mut calls = 0;

        let ack = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::new([2, 0, 0, 0, 0, 1]), FrameFlags::ACK, b"x");
        snap.receive(&mut calls, 0, &ack).unwrap();
        assert_eq!(calls, 0);
        assert!(outbox.borrow().is_empty());
        assert_eq!(snap.service_mut::<EchoService>().unwrap().responses, 1);
    }

    #[test]
    fn test_address_filter() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let mut calls = 0;

        // Own source
        let own = create_test_frame([2, 0, 0, 0, 0, 1], MacAddr::BROADCAST, FrameFlags::empty(), b"a");
        snap.receive(&mut calls, 0, &own).unwrap();
        // Other destination
        let other = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::new([2, 0, 0, 0, 0, 5]), FrameFlags::empty(), b"a");
        snap.receive(&mut calls, 0, &other).unwrap();
        assert_eq!(calls, 0);

        // Unicast to us
        let unicast = create_test_frame([2, 0, 0, 0, 0, 9], MacAddr::new([2, 0, 0, 0, 0, 1]), FrameFlags::empty(), b"a");
        snap.receive(&mut calls, 0, &unicast).unwrap();
        assert_eq!(calls, 1);
        assert_eq!(snap.statistics().received, 1);
    }

    #[test]
    fn test_service_limit() {
        let config = SnapConfig {
            max_services: 1,
            ..SnapConfig::DEFAULT
        };
        let mut snap = create_test_snap(config);
        let extra = Box::new(EchoService {
            id: fourcc(b"MORE"),
            responses: 0,
            ticks: 0,
        });
        assert_eq!(snap.register_service(extra).err(), Some(Error::TooManyServices));
    }

    #[test]
    fn test_periodic_reaches_services() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let mut calls = 0;
        snap.periodic(&mut calls);
        snap.periodic(&mut calls);
        assert_eq!(snap.with_service(|echo: &mut EchoService, _| echo.ticks), Some(2));
    }

    #[test]
    fn test_transaction_ids_increase() {
        let mut snap = create_test_snap(SnapConfig::DEFAULT);
        let outbox = snap.netif(0).unwrap().outbox();
        for _ in 0..3 {
            snap.send_request(NetifRef::Default, MacAddr::BROADCAST, ECHO, fourcc(b"PING"), b"")
                .unwrap();
        }
        let ids: Vec<u32> = outbox
            .borrow()
            .iter()
            .map(|f| decode(f).unwrap().0.transaction_id)
            .collect();
        assert!(ids.windows(2).all(|w| w[1] == w[0].wrapping_add(1)));
    }
}

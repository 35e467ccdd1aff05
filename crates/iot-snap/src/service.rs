// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Service plumbing
//!
//! A [`Service`] receives the frames addressed to its id together with the
//! caller's context and a [`SnapSender`] for emitting new requests.

use core::any::Any;

use iot_common::{DeviceRoles, DeviceSerial, DeviceType, ManufactureId, MacAddr, Result};

use crate::frame::FrameHeader;
use crate::snap::SnapStats;

/// Interface selector for outgoing frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetifRef {
    /// First registered interface
    Default,
    /// Interface by registration index
    Index(usize),
    /// Every interface
    Routing,
}

/// Identity the device announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceIdentity {
    /// Manufacturer
    pub manufacture_id: ManufactureId,
    /// Product
    pub device_type: DeviceType,
    /// Unit serial number
    pub serial: DeviceSerial,
    /// Announced roles
    pub roles: DeviceRoles,
}

/// An accepted frame handed to a service
#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    /// Index of the receiving interface
    pub netif: usize,
    /// Decoded header
    pub header: FrameHeader,
    /// Content bytes
    pub content: &'a [u8],
}

impl Incoming<'_> {
    /// Command within the service
    #[must_use]
    pub const fn element(&self) -> u32 {
        self.header.element_id
    }

    /// Sender
    #[must_use]
    pub const fn src(&self) -> MacAddr {
        self.header.src
    }

    /// Check for a positive response
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.header.flags.contains(crate::frame::FrameFlags::ACK)
    }
}

/// Outgoing side of the engine as seen by services
pub trait SnapSender {
    /// MAC address of an interface
    fn own_mac(&self, netif: NetifRef) -> MacAddr;

    /// Device identity
    fn device(&self) -> &DeviceIdentity;

    /// Encode and transmit one frame
    fn send_frame(&mut self, netif: NetifRef, header: &FrameHeader, content: &[u8]) -> Result<()>;

    /// Allocate a transaction id
    fn next_transaction_id(&mut self) -> u32;

    /// Engine tick used to stamp log records
    fn tick(&self) -> u32;

    /// Traffic counters of the engine
    fn statistics(&self) -> SnapStats {
        SnapStats::default()
    }

    /// Send a request frame with a fresh transaction id
    fn send_request(
        &mut self,
        netif: NetifRef,
        dest: MacAddr,
        service_id: u32,
        element_id: u32,
        content: &[u8],
    ) -> Result<()> {
        let header = FrameHeader::request(
            self.own_mac(netif),
            dest,
            service_id,
            element_id,
            self.next_transaction_id(),
        );
        self.send_frame(netif, &header, content)
    }
}

/// A protocol service registered with the engine
///
/// `C` is the caller's context, passed by reference on every call.
pub trait Service<C> {
    /// Four-character service id
    fn id(&self) -> u32;

    /// Handle a request, writing the response content to `response`
    ///
    /// `Ok(len)` sends an ACK carrying `response[..len]`,
    /// [`Error::CommandNoResponse`](iot_common::Error::CommandNoResponse)
    /// sends nothing and any other error sends an empty NACK.
    fn on_request(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        response: &mut [u8],
    ) -> Result<usize>;

    /// Handle an ACK or NACK
    fn on_response(&mut self, _ctx: &mut C, _snap: &mut dyn SnapSender, _response: &Incoming<'_>) {}

    /// Periodic tick
    fn periodic(&mut self, _ctx: &mut C, _snap: &mut dyn SnapSender) {}

    /// Release resources on engine shutdown
    fn deinit(&mut self, _ctx: &mut C) {}

    /// Concrete service access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

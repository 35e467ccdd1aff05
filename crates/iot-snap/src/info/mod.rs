// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! INFO device information service
//!
//! Every device runs [`InfoServer`]; a monitoring station runs
//! [`InfoClient`]:
//!
//! ```text
//! station                        device
//!                     ◀────────── SNOT (broadcast, first tick)
//!   ENUM (broadcast)  ──────────▶
//!                     ◀────────── roles + MAC
//!   POLL mask/period  ──────────▶
//!                     ◀────────── GINF / STAT every period
//! ```
//!
//! Polled elements travel as requests from the device to the recipient
//! named in the `POLL` request.

pub mod client;
pub mod server;

use iot_common::codec::{Reader, Writer};
use iot_common::{fourcc, DeviceRoles, DeviceType, FileVersion, MacAddr, ManufactureId, Result};

pub use client::{InfoClient, InfoClientContext};
pub use server::{InfoContext, InfoServer};

/// Service id
pub const INFO_SERVICE_ID: u32 = fourcc(b"INFO");

/// Element ids
pub mod element {
    use iot_common::fourcc;

    /// Start notification
    pub const SNOT: u32 = fourcc(b"SNOT");
    /// Enumerate devices
    pub const ENUM: u32 = fourcc(b"ENUM");
    /// General information
    pub const GINF: u32 = fourcc(b"GINF");
    /// Traffic statistics
    pub const STAT: u32 = fourcc(b"STAT");
    /// Enable or disable polling
    pub const POLL: u32 = fourcc(b"POLL");
}

bitflags::bitflags! {
    /// Elements a device sends on its own once polling is enabled
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct PollElements: u32 {
        /// General information (`GINF`)
        const GENERAL = 0x01;
        /// Traffic statistics (`STAT`)
        const STATISTICS = 0x02;
    }
}

// =============================================================================
// Wire structures
// =============================================================================

/// `SNOT` request and `ENUM` response
///
/// Layout: `[roles:4][mac:6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoDevice {
    /// Announced roles
    pub roles: DeviceRoles,
    /// Address on the default interface
    pub mac: MacAddr,
}

impl InfoDevice {
    /// Serialized size
    pub const SIZE: usize = 4 + MacAddr::SIZE;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            roles: DeviceRoles::from_bits_retain(r.u32()?),
            mac: MacAddr(r.array()?),
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.roles.bits())?.put(self.mac.as_bytes())?;
        Ok(())
    }
}

/// `GINF` content
///
/// Layout: `[manufacturer:16][device_type:4][mac:6][fw_version:16][tl_version:16][roles:4]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralInfo {
    /// Manufacturer
    pub manufacture_id: ManufactureId,
    /// Product
    pub device_type: DeviceType,
    /// Address on the default interface
    pub mac: MacAddr,
    /// Running firmware
    pub firmware_version: FileVersion,
    /// Active trust list
    pub trust_list_version: FileVersion,
    /// Announced roles
    pub roles: DeviceRoles,
}

impl GeneralInfo {
    /// Serialized size
    pub const SIZE: usize = ManufactureId::SIZE + DeviceType::SIZE + MacAddr::SIZE + 2 * FileVersion::SIZE + 4;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            manufacture_id: ManufactureId(r.array()?),
            device_type: DeviceType(r.array()?),
            mac: MacAddr(r.array()?),
            firmware_version: FileVersion::read(r)?,
            trust_list_version: FileVersion::read(r)?,
            roles: DeviceRoles::from_bits_retain(r.u32()?),
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.put(self.manufacture_id.as_bytes())?
            .put(self.device_type.as_bytes())?
            .put(self.mac.as_bytes())?;
        self.firmware_version.write(w)?;
        self.trust_list_version.write(w)?;
        w.u32(self.roles.bits())?;
        Ok(())
    }
}

/// `STAT` content
///
/// Layout: `[sent:4][received:4][mac:6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatInfo {
    /// Frames transmitted
    pub sent: u32,
    /// Frames accepted
    pub received: u32,
    /// Address on the default interface
    pub mac: MacAddr,
}

impl StatInfo {
    /// Serialized size
    pub const SIZE: usize = 8 + MacAddr::SIZE;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            sent: r.u32()?,
            received: r.u32()?,
            mac: MacAddr(r.array()?),
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.sent)?.u32(self.received)?.put(self.mac.as_bytes())?;
        Ok(())
    }
}

/// `POLL` request
///
/// Layout: `[elements:4][enable:1][period:2][recipient:6]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    /// Elements to switch
    pub elements: PollElements,
    /// Switch on or off
    pub enable: bool,
    /// Ticks between two reports
    pub period: u16,
    /// Where reports go
    pub recipient: MacAddr,
}

impl PollRequest {
    /// Serialized size
    pub const SIZE: usize = 4 + 1 + 2 + MacAddr::SIZE;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            elements: PollElements::from_bits_truncate(r.u32()?),
            enable: r.u8()? != 0,
            period: r.u16()?,
            recipient: MacAddr(r.array()?),
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.elements.bits())?
            .u8(u8::from(self.enable))?
            .u16(self.period)?
            .put(self.recipient.as_bytes())?;
        Ok(())
    }
}

/// Decode a fixed-size structure that must fill `content` exactly
pub(crate) fn read_exact<T>(content: &[u8], size: usize, read: impl FnOnce(&mut Reader<'_>) -> Result<T>) -> Result<T> {
    if content.len() != size {
        return Err(iot_common::Error::IncorrectArgument);
    }
    read(&mut Reader::new(content))
}

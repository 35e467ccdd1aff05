// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PRVS provisioning service
//!
//! A provisioning station finds fresh devices (`DNID`), lets them generate
//! their key pair (`ASAV`), stores the high-level public keys in their
//! slots (`PBxx`, `SGNP`) and uploads the first trust list (`_TLH`,
//! `_TLC`, `_TLF`).
//!
//! Set requests carry `[request_id:2][data]`. Servers remember the last id
//! per element so a retransmitted request is acknowledged without being
//! applied twice.

pub mod client;
pub mod server;

use iot_common::codec::{Reader, Writer};
use iot_common::{fourcc, DeviceRoles, DeviceSerial, DeviceType, Error, MacAddr, ManufactureId, Result};
use iot_hal::StorageInterface;
use iot_provision::TrustList;
use iot_secmodule::SecModule;

pub use client::{PrvsClient, PrvsSession};
pub use server::PrvsServer;

/// Service id
pub const PRVS_SERVICE_ID: u32 = fourcc(b"PRVS");

/// Element ids
pub mod element {
    use iot_common::fourcc;

    /// Discover uninitialized devices
    pub const DNID: u32 = fourcc(b"DNID");
    /// Device identity and provisioned key
    pub const DEVI: u32 = fourcc(b"DEVI");
    /// Generate the device key pair and return its public key
    pub const ASAV: u32 = fourcc(b"ASAV");
    /// Sign data with the device key
    pub const ASGN: u32 = fourcc(b"ASGN");
    /// Trust list header
    pub const TLH: u32 = fourcc(b"_TLH");
    /// Trust list key
    pub const TLC: u32 = fourcc(b"_TLC");
    /// Trust list footer
    pub const TLF: u32 = fourcc(b"_TLF");
}

/// Provisioning progress of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    /// No device key pair yet
    Uninitialized,
    /// Key pair generated, trust list missing
    KeyGenerated,
    /// Trust list committed
    Provisioned,
}

/// Engine state a provisioning server works on
pub trait PrvsBackend {
    /// Security module type
    type Sec: SecModule;
    /// Trust list storage type
    type Storage: StorageInterface;

    /// Borrow the security module and the trust list together
    fn provision_parts(&mut self) -> (&mut Self::Sec, &mut TrustList<Self::Storage>);
}

// =============================================================================
// Wire structures
// =============================================================================

/// `DNID` response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAnnounce {
    /// Device address
    pub mac: MacAddr,
    /// Announced roles
    pub roles: DeviceRoles,
}

impl DeviceAnnounce {
    /// Serialized size
    pub const SIZE: usize = MacAddr::SIZE + 4;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            mac: MacAddr(r.array()?),
            roles: DeviceRoles::from_bits_retain(r.u32()?),
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.put(self.mac.as_bytes())?.u32(self.roles.bits())?;
        Ok(())
    }
}

/// `DEVI` response
///
/// Layout: `[manufacturer:16][device_type:4][serial:32][mac:6][data_sz:2][data]`
/// where data is the device public key record followed by its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo<'a> {
    /// Manufacturer
    pub manufacture_id: ManufactureId,
    /// Product
    pub device_type: DeviceType,
    /// Serial number
    pub serial: DeviceSerial,
    /// Device address
    pub mac: MacAddr,
    /// Public key record and signature
    pub data: &'a [u8],
}

impl<'a> DeviceInfo<'a> {
    /// Size of the fixed part
    pub const HEADER_SIZE: usize = ManufactureId::SIZE + DeviceType::SIZE + DeviceSerial::SIZE + MacAddr::SIZE + 2;

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'a>) -> Result<Self> {
        let manufacture_id = ManufactureId(r.array()?);
        let device_type = DeviceType(r.array()?);
        let serial = DeviceSerial(r.array()?);
        let mac = MacAddr(r.array()?);
        let len = usize::from(r.u16()?);
        Ok(Self {
            manufacture_id,
            device_type,
            serial,
            mac,
            data: r.take(len)?,
        })
    }

    /// Encode the fixed part; `data_len` bytes of data must follow
    pub fn write_header(&self, w: &mut Writer<'_>, data_len: usize) -> Result<()> {
        w.put(self.manufacture_id.as_bytes())?
            .put(self.device_type.as_bytes())?
            .put(self.serial.as_bytes())?
            .put(self.mac.as_bytes())?
            .u16(u16::try_from(data_len).map_err(|_| Error::BufferTooSmall)?)?;
        Ok(())
    }
}

/// Split a set request into its id and payload
pub fn parse_set(content: &[u8]) -> Result<(u16, &[u8])> {
    let mut r = Reader::new(content);
    let request_id = r.u16()?;
    Ok((request_id, r.rest()))
}

/// Build a set request
pub fn write_set(request_id: u16, data: &[u8], out: &mut [u8]) -> Result<usize> {
    let mut w = Writer::new(out);
    w.u16(request_id)?.put(data)?;
    Ok(w.finish())
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types for the IoT SDK
//!
//! Device identity values, MAC addresses, role bits, key types and the
//! file-info record that identifies a firmware or trust-list file.

use core::fmt;

use crate::codec::{Reader, Writer};
use crate::errors::{Error, Result};
use crate::version::FileVersion;

/// Pack a four-character ASCII code into a `u32` (first character most significant)
#[must_use]
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Unpack a `u32` four-character code back to its ASCII bytes
#[must_use]
pub const fn fourcc_bytes(code: u32) -> [u8; 4] {
    code.to_be_bytes()
}

/// Ethernet MAC address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Size in bytes
    pub const SIZE: usize = 6;

    /// Broadcast address `ff:ff:ff:ff:ff:ff`
    pub const BROADCAST: Self = Self([0xFF; 6]);

    /// All-zero address
    pub const ZERO: Self = Self([0; 6]);

    /// Create from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Check for the broadcast address
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

bitflags::bitflags! {
    /// Roles a device announces on the network
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct DeviceRoles: u32 {
        /// Routes frames between interfaces and serves files
        const GATEWAY = 0x01;
        /// Ordinary end device
        const THING = 0x02;
        /// Control station
        const CONTROL = 0x04;
        /// Log collector
        const LOGGER = 0x08;
        /// Passive traffic observer
        const SNIFFER = 0x10;
        /// Debug station
        const DEBUGGER = 0x20;
        /// Factory provisioning station
        const INITIALIZER = 0x40;
    }
}

macro_rules! fixed_id {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; $size]);

        impl $name {
            /// Size in bytes
            pub const SIZE: usize = $size;

            /// Create from raw bytes
            #[must_use]
            pub const fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            /// Create from a shorter ASCII label, zero padded
            ///
            /// Labels longer than the field are rejected.
            pub fn from_label(label: &[u8]) -> Result<Self> {
                if label.len() > $size {
                    return Err(Error::IncorrectArgument);
                }
                let mut bytes = [0u8; $size];
                bytes[..label.len()].copy_from_slice(label);
                Ok(Self(bytes))
            }

            /// Raw bytes
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0; $size])
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let end = self.0.iter().position(|&b| b == 0).unwrap_or($size);
                match core::str::from_utf8(&self.0[..end]) {
                    Ok(text) => write!(f, "{}({:?})", stringify!($name), text),
                    Err(_) => write!(f, "{}({:02x?})", stringify!($name), &self.0),
                }
            }
        }
    };
}

fixed_id!(
    /// Manufacturer identifier (16 bytes)
    ManufactureId,
    16
);
fixed_id!(
    /// Device type (4 bytes)
    DeviceType,
    4
);
fixed_id!(
    /// Device serial number (32 bytes)
    DeviceSerial,
    32
);

/// Type of a public key held by provisioning or listed in a trust list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    /// Root of trust, signs every other high-level key
    Recovery = 0,
    /// Authentication service key
    Auth = 1,
    /// Trust list service key
    TrustList = 2,
    /// Firmware signing key
    Firmware = 3,
    /// Factory key
    Factory = 4,
    /// IoT device key
    IotDevice = 5,
    /// User device key
    UserDevice = 6,
    /// Internal firmware key
    FirmwareInternal = 7,
    /// Internal authentication key
    AuthInternal = 8,
    /// Cloud endpoint key, carries the cloud URL as meta data
    Cloud = 9,
}

impl KeyType {
    /// First value that is not a valid key type
    pub const UNSUPPORTED: u8 = 10;

    /// Parse from the wire value
    pub const fn from_u8(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Recovery,
            1 => Self::Auth,
            2 => Self::TrustList,
            3 => Self::Firmware,
            4 => Self::Factory,
            5 => Self::IotDevice,
            6 => Self::UserDevice,
            7 => Self::FirmwareInternal,
            8 => Self::AuthInternal,
            9 => Self::Cloud,
            _ => return Err(Error::UnsupportedKeyType),
        })
    }

    /// Check whether provisioning stores keys of this type in slots
    #[must_use]
    pub const fn is_high_level(&self) -> bool {
        matches!(self, Self::Recovery | Self::Auth | Self::TrustList | Self::Firmware)
    }
}

/// Identity of a distributable file: who made it, for what, which version
///
/// Wire layout (36 bytes): `[manufacture_id:16][device_type:4][version:16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    /// Manufacturer
    pub manufacture_id: ManufactureId,
    /// Device type
    pub device_type: DeviceType,
    /// File version
    pub version: FileVersion,
}

impl FileInfo {
    /// Serialized size in bytes
    pub const SIZE: usize = ManufactureId::SIZE + DeviceType::SIZE + FileVersion::SIZE;

    /// Check that two infos describe the same product line
    #[must_use]
    pub fn same_product(&self, other: &Self) -> bool {
        self.manufacture_id == other.manufacture_id && self.device_type == other.device_type
    }

    /// Decode from the wire form
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            manufacture_id: ManufactureId(r.array()?),
            device_type: DeviceType(r.array()?),
            version: FileVersion::read(r)?,
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.put(&self.manufacture_id.0)?.put(&self.device_type.0)?;
        self.version.write(w)
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! _CFG device configuration service
//!
//! A station pushes Wi-Fi credentials with [`CfgClient::configure_wifi`];
//! the device's [`CfgServer`] hands them to its [`CfgContext`] and acks.

use core::any::Any;

use iot_common::codec::{Reader, Writer};
use iot_common::log::LogBuffer;
use iot_common::{fourcc, log_info, log_warn, Error, MacAddr, Result};

use crate::service::{Incoming, NetifRef, Service, SnapSender};

/// Service id
pub const CFG_SERVICE_ID: u32 = fourcc(b"_CFG");

/// Element ids
pub mod element {
    use iot_common::fourcc;

    /// Wi-Fi credentials
    pub const WIFI: u32 = fourcc(b"WIFI");
}

/// Size of each credential field
pub const CFG_STR_MAX: usize = 64;

/// Log source tag
const SOURCE: &str = "cfg";

/// `WIFI` content
///
/// Layout: `[ssid:64][pass:64][account:64]`, each zero padded.
#[derive(Clone, PartialEq, Eq)]
pub struct WifiConfig {
    ssid: [u8; CFG_STR_MAX],
    pass: [u8; CFG_STR_MAX],
    account: [u8; CFG_STR_MAX],
}

fn padded(value: &[u8]) -> Result<[u8; CFG_STR_MAX]> {
    let mut out = [0u8; CFG_STR_MAX];
    out.get_mut(..value.len())
        .ok_or(Error::IncorrectArgument)?
        .copy_from_slice(value);
    Ok(out)
}

fn trimmed(field: &[u8; CFG_STR_MAX]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(CFG_STR_MAX);
    &field[..end]
}

impl WifiConfig {
    /// Serialized size
    pub const SIZE: usize = 3 * CFG_STR_MAX;

    /// Build from credentials of at most [`CFG_STR_MAX`] bytes each
    pub fn new(ssid: &[u8], pass: &[u8], account: &[u8]) -> Result<Self> {
        Ok(Self {
            ssid: padded(ssid)?,
            pass: padded(pass)?,
            account: padded(account)?,
        })
    }

    /// Network name
    #[must_use]
    pub fn ssid(&self) -> &[u8] {
        trimmed(&self.ssid)
    }

    /// Passphrase
    #[must_use]
    pub fn pass(&self) -> &[u8] {
        trimmed(&self.pass)
    }

    /// Cloud account the device binds to
    #[must_use]
    pub fn account(&self) -> &[u8] {
        trimmed(&self.account)
    }

    /// Decode, requiring `content` to hold exactly one configuration
    pub fn parse(content: &[u8]) -> Result<Self> {
        if content.len() != Self::SIZE {
            return Err(Error::IncorrectArgument);
        }
        let mut r = Reader::new(content);
        Ok(Self {
            ssid: r.array()?,
            pass: r.array()?,
            account: r.array()?,
        })
    }

    /// Encode into the wire form
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.put(&self.ssid)?.put(&self.pass)?.put(&self.account)?;
        Ok(())
    }
}

// The passphrase stays out of logs
impl core::fmt::Debug for WifiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WifiConfig")
            .field("ssid", &core::str::from_utf8(self.ssid()).unwrap_or("?"))
            .field("account", &core::str::from_utf8(self.account()).unwrap_or("?"))
            .finish_non_exhaustive()
    }
}

/// Context of a device running a _CFG server
pub trait CfgContext {
    /// Apply received Wi-Fi credentials
    fn wifi_config(&mut self, config: &WifiConfig) -> Result<()>;
}

/// Configuration server
pub struct CfgServer {
    logs: LogBuffer,
}

impl CfgServer {
    /// Create a server
    #[must_use]
    pub const fn new() -> Self {
        Self { logs: LogBuffer::new() }
    }

    /// Server log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }
}

impl Default for CfgServer {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CfgContext> Service<C> for CfgServer {
    fn id(&self) -> u32 {
        CFG_SERVICE_ID
    }

    fn on_request(
        &mut self,
        ctx: &mut C,
        snap: &mut dyn SnapSender,
        request: &Incoming<'_>,
        _response: &mut [u8],
    ) -> Result<usize> {
        if request.element() != element::WIFI {
            return Err(Error::CommandNoResponse);
        }
        let tick = snap.tick();
        let config = match WifiConfig::parse(request.content) {
            Ok(config) => config,
            Err(e) => {
                log_warn!(self.logs, tick, SOURCE, "bad WIFI from {}: {}", request.src(), e);
                return Err(e);
            }
        };
        ctx.wifi_config(&config)?;
        log_info!(self.logs, tick, SOURCE, "wifi configured by {}", request.src());
        Ok(0)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Configuration client
///
/// Remembers the outcome of the last `WIFI` request.
pub struct CfgClient {
    last: Option<(MacAddr, bool)>,
    logs: LogBuffer,
}

impl CfgClient {
    /// Create a client
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: None,
            logs: LogBuffer::new(),
        }
    }

    /// Send Wi-Fi credentials to `dest`
    pub fn configure_wifi(&mut self, snap: &mut dyn SnapSender, dest: MacAddr, config: &WifiConfig) -> Result<()> {
        let mut buf = [0u8; WifiConfig::SIZE];
        config.write(&mut Writer::new(&mut buf))?;
        self.last = None;
        snap.send_request(NetifRef::Default, dest, CFG_SERVICE_ID, element::WIFI, &buf)
    }

    /// Sender and ACK flag of the last `WIFI` response
    #[must_use]
    pub const fn last_result(&self) -> Option<(MacAddr, bool)> {
        self.last
    }

    /// Client log
    #[must_use]
    pub const fn logs(&self) -> &LogBuffer {
        &self.logs
    }
}

impl Default for CfgClient {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Service<C> for CfgClient {
    fn id(&self) -> u32 {
        CFG_SERVICE_ID
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
        if response.element() != element::WIFI {
            return;
        }
        if !response.is_ack() {
            log_warn!(self.logs, snap.tick(), SOURCE, "WIFI refused by {}", response.src());
        }
        self.last = Some((response.src(), response.is_ack()));
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

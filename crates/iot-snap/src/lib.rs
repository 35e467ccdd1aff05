// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SNAP protocol engine for the IoT SDK
//!
//! Device-to-device messaging over raw MAC frames:
//!
//! - **Frame codec**: fixed 29-byte big-endian header plus content
//! - **Reassembly**: per-interface buffers turning a byte stream into frames
//! - **Dispatch**: services addressed by a four-character id, requests
//!   answered with ACK or NACK responses
//! - **Routing**: gateways repeat foreign unicast frames on their other
//!   interfaces
//! - **PRVS**: provisioning server and requester
//! - **FLDT**: file delivery server and client
//! - **INFO**: start notification, enumeration and polled device reports
//! - **_CFG**: Wi-Fi credentials pushed to a device
//!
//! # Frame layout
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬─────────┬─────────┬───────┬──────────┬────────┬─────────┐
//! │ eth_type │ src_mac │ dest_mac │ service │ element │ flags │ content  │ txn id │ content │
//! │ 2        │ 6       │ 6        │ 4       │ 4       │ 1     │ size 2   │ 4      │ ≤ 1024  │
//! └──────────┴─────────┴──────────┴─────────┴─────────┴───────┴──────────┴────────┴─────────┘
//! ```
//!
//! The engine is single-threaded and owns no global state. Services get
//! the caller's context on every call, so one [`Snap`] can serve a
//! provisioning backend and a file registry at the same time.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod cfg;
pub mod fldt;
pub mod frame;
pub mod info;
pub mod prvs;
pub mod reassembly;
pub mod service;
pub mod snap;

pub use frame::{FrameFlags, FrameHeader};
pub use reassembly::{Feed, Reassembler};
pub use service::{DeviceIdentity, Incoming, NetifRef, Service, SnapSender};
pub use snap::{Snap, SnapStats};

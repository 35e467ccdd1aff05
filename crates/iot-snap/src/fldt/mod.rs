// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! FLDT file delivery service
//!
//! A gateway runs [`FldtServer`] and serves files it holds; devices run
//! [`FldtClient`] and pull newer versions of the files they track:
//!
//! ```text
//! client                         gateway
//!   GFTI (broadcast)  ──────────▶
//!                     ◀────────── file info + gateway MAC   (or INFV broadcast)
//!   GNFH              ──────────▶
//!                     ◀────────── header, size, has_footer
//!   GNFD offset       ──────────▶
//!                     ◀────────── chunk, next_offset         (repeat)
//!   GNFF              ──────────▶
//!                     ◀────────── footer → verify → got file
//! ```
//!
//! Files are reached through the caller's [`UpdateRegistry`]; the services
//! keep only transfer bookkeeping.

pub mod client;
pub mod server;
pub mod wire;

use iot_common::{FileVersion, MacAddr};
use iot_update::{UpdateFileType, UpdateRegistry};

pub use client::{FldtClient, TransferStage};
pub use server::FldtServer;
pub use wire::{element, FLDT_SERVICE_ID};

/// Result of a completed or abandoned download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GotFile {
    /// File kind, carrying the downloaded version
    pub file_type: UpdateFileType,
    /// Version held before the download
    pub previous: FileVersion,
    /// Gateway the file came from
    pub gateway: MacAddr,
    /// The file was stored and verified
    pub success: bool,
}

/// Context of a device running an FLDT client
pub trait FldtContext: UpdateRegistry {
    /// Called once per finished download, successful or not
    fn got_file(&mut self, _event: &GotFile) {}
}

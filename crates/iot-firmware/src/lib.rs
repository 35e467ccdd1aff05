// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware pipeline for the IoT SDK
//!
//! Stores incoming firmware images, verifies them against the provisioned
//! signer keys and writes them into the install area:
//!
//! - **Descriptor store**: one record per (manufacturer, device type) in a
//!   flat descriptor file, image body and footer in a per-product data file
//! - **Verification**: chunked SHA-256 over body, `0xFF` fill and the fixed
//!   footer part, then a multi-signer threshold check
//! - **Install**: version gate against the running image, then body, fill
//!   and footer appended to the install area
//! - **Update interface**: the firmware side of file delivery
//!
//! # Image layout
//!
//! ```text
//! ┌──────────────────┬───────────────┬────────────────────────────────┐
//! │ body             │ fill (0xFF)   │ footer                         │
//! │ firmware_length  │               │ [count][descriptor][signatures]│
//! └──────────────────┴───────────────┴────────────────────────────────┘
//! |<──────────────────────── app_size ─────────────────────────────>|
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod format;
pub mod install;
#[cfg(feature = "sim")]
pub mod sim;
pub mod store;
pub mod update;
pub mod verify;

pub use format::{FirmwareDescriptor, FirmwareFooter, FirmwareHeader};
pub use store::FirmwareStore;
pub use update::FirmwareUpdater;

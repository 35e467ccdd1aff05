// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Platform capability layer for the IoT SDK
//!
//! The SDK never touches hardware directly. Everything platform specific
//! is reached through the traits in [`traits`]:
//!
//! - **Storage**: named storage elements (files, flash records)
//! - **Secure storage**: numbered key slots
//! - **RNG / Timer**: entropy and time base
//! - **Network interface**: raw frame transmit, MAC address
//! - **Firmware install**: own image footer, install area writes
//!
//! With the `sim` feature, [`sim`] provides in-memory implementations
//! for host tests and desktop tooling.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod storage;
pub mod traits;

#[cfg(feature = "sim")]
pub mod sim;

// Re-export main traits
pub use error::{HalError, HalResult};
pub use storage::StorageElementId;
pub use traits::*;

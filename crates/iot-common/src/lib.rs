// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! IoT SDK Common Library
//!
//! Shared vocabulary for every SDK component: the unified error type,
//! the ring-buffer logger, configuration structures, file versions and
//! the identity types carried on the wire.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting of errors for embedded debugging
//!
//! All buffers are fixed-size arrays or heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
pub mod config;
pub mod constants;
pub mod errors;
pub mod log;
pub mod types;
pub mod version;

// Re-export commonly used items
pub use config::SdkConfig;
pub use errors::{Error, Result};
pub use types::*;
pub use version::FileVersion;

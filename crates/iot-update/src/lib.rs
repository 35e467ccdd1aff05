// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Update file model for the IoT SDK
//!
//! A distributable file (firmware image, trust list, user blob) is named by
//! an [`UpdateFileType`] and accessed through an [`UpdateInterface`]. The
//! file delivery service moves bytes between peers without knowing what
//! they mean; the interface behind each file type stores, verifies and
//! serves them.
//!
//! ```text
//! header  ──► set_header ──► file size
//! data    ──► set_data(offset) ... until next_offset >= file size
//! footer  ──► set_footer ──► verification
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod file_type;
pub mod interface;
pub mod version;

pub use file_type::{UpdateFileType, FILE_TYPE_FIRMWARE, FILE_TYPE_TRUST_LIST, FILE_TYPE_USER};
pub use interface::{UpdateInterface, UpdateRegistry};
pub use version::compare_version;

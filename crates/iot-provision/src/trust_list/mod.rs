// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Trust list
//!
//! A trust list is a header, an ordered list of dated public keys and a
//! footer carrying signatures over both. It is received part by part into
//! the TMP store, verified once the footer arrives and only then copied
//! into the STATIC and DYNAMIC stores. Readers only ever see DYNAMIC.

mod engine;
mod format;
mod update;

pub use engine::{KeySearch, TrustList, TL_MAX_PART_SIZE};
pub use format::{TlElement, TlFooter, TlHeader, TlStore};
pub use update::TrustListUpdater;

// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Device provisioning for the IoT SDK
//!
//! This crate owns the device's chain of trust:
//!
//! - **Key records**: public key, dated key and signature records as they
//!   appear in slots, trust lists and firmware footers
//! - **Slot store**: mapping of provisioning elements onto security module slots
//! - **High-level key verification**: every Auth / TrustList / Firmware key
//!   must be countersigned by a provisioned Recovery key
//! - **Trust list**: staged TMP → STATIC → DYNAMIC storage engine with
//!   multi-signer threshold verification
//!
//! # Provisioning flow
//!
//! ```text
//! ASAV ──► device key pair generated
//!   │
//! PBR1/PBR2 ──► recovery keys
//! PBA*/PBT*/PBF* ──► high-level keys signed by recovery
//! SGNP ──► device signature
//!   │
//! TLH, TLC*, TLF ──► trust list verified and committed
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod keys;
#[cfg(feature = "sim")]
pub mod sim;
pub mod slots;
pub mod trust_list;
pub mod verification;

pub use keys::{PubkeyDated, PubkeyRecord, SignRecord};
pub use slots::ProvisionElement;
pub use trust_list::{TlElement, TlFooter, TlHeader, TlStore, TrustList, TrustListUpdater};
pub use verification::{search_hl_pubkey, verify_hl_key, verify_signatures};

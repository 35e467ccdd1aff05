// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Security module for the IoT SDK
//!
//! Every cryptographic operation the SDK performs goes through the
//! [`SecModule`] capability: hashing, ECDSA signing with slot-resident
//! private keys, signature verification and raw slot access.
//!
//! [`SoftSecModule`] implements it in software on top of any
//! [`SecureStorageInterface`](iot_hal::SecureStorageInterface) and
//! [`RngInterface`](iot_hal::RngInterface):
//!
//! - SHA-256 / SHA-384 / SHA-512 via `sha2`
//! - ECDSA over secp256r1 via `p256`
//!
//! # Security Requirements
//!
//! - Private scalars are zeroized after every use
//! - Public key comparisons are constant time
//! - Key material is never logged

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod hash;
pub mod soft;
pub mod traits;
pub mod types;

pub use error::{CryptoError, CryptoResult};
pub use hash::{Sha256, Sha384, Sha512};
pub use soft::SoftSecModule;
pub use traits::{constant_time_eq, Hash, SecModule};
pub use types::{EcType, HashType};

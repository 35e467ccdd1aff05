// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SDK-wide constants
//!
//! Sizes and limits shared by more than one crate.

// =============================================================================
// SNAP Framing
// =============================================================================

/// Ethertype carried in every SNAP frame
pub const SNAP_ETH_TYPE: u16 = 0xABCD;

/// Size of the fixed SNAP frame header in bytes
pub const SNAP_HEADER_SIZE: usize = 29;

/// Maximum content bytes carried by one frame
pub const SNAP_MAX_CONTENT_SIZE: usize = 1024;

/// Maximum size of a complete frame
pub const SNAP_MAX_FRAME_SIZE: usize = SNAP_HEADER_SIZE + SNAP_MAX_CONTENT_SIZE;

/// Default capacity of the service table
pub const SNAP_MAX_SERVICES: usize = 10;

/// Default capacity of the network interface table
pub const SNAP_MAX_NETIFS: usize = 5;

// =============================================================================
// Security Module
// =============================================================================

/// SHA-256 digest size in bytes
pub const SHA256_SIZE: usize = 32;

/// Raw secp256r1 signature size (r || s)
pub const SECP256R1_SIGNATURE_SIZE: usize = 64;

/// Uncompressed SEC1 secp256r1 public key size
pub const SECP256R1_PUBKEY_SIZE: usize = 65;

/// Largest public key any supported curve produces
pub const PUBKEY_MAX_SIZE: usize = 100;

// =============================================================================
// Storage
// =============================================================================

/// Size of a storage element identifier
pub const STORAGE_ELEMENT_ID_SIZE: usize = 32;

// =============================================================================
// File Delivery
// =============================================================================

/// Largest data chunk a file server hands out per request
pub const FLDT_MAX_CHUNK_SIZE: usize = 512;

/// Default number of tracked file types
pub const FLDT_MAX_FILE_TYPES: usize = 10;

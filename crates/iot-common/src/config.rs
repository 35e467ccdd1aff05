// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SDK configuration
//!
//! Limits and policy knobs for every component. Each structure has a
//! `DEFAULT` constant so configurations can be built in `const` context
//! and overridden field by field.

use crate::constants::{FLDT_MAX_CHUNK_SIZE, FLDT_MAX_FILE_TYPES, SNAP_MAX_NETIFS, SNAP_MAX_SERVICES};
use crate::types::KeyType;

/// Maximum number of signer types a verification policy may require
pub const MAX_REQUIRED_SIGNERS: usize = 4;

/// Aggregate SDK configuration
#[derive(Debug, Clone, Copy)]
pub struct SdkConfig {
    /// Protocol engine configuration
    pub snap: SnapConfig,
    /// Provisioning service configuration
    pub prvs: PrvsConfig,
    /// File delivery configuration
    pub fldt: FldtConfig,
    /// Trust list engine configuration
    pub trust_list: TrustListConfig,
    /// Firmware pipeline configuration
    pub firmware: FirmwareConfig,
}

impl SdkConfig {
    /// Default configuration
    pub const DEFAULT: Self = Self {
        snap: SnapConfig::DEFAULT,
        prvs: PrvsConfig::DEFAULT,
        fldt: FldtConfig::DEFAULT,
        trust_list: TrustListConfig::DEFAULT,
        firmware: FirmwareConfig::DEFAULT,
    };
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// SNAP protocol engine configuration
#[derive(Debug, Clone, Copy)]
pub struct SnapConfig {
    /// Service table capacity
    pub max_services: usize,
    /// Network interface table capacity (default interface included)
    pub max_netifs: usize,
    /// Forward foreign unicast frames between interfaces (gateway role only)
    pub routing: bool,
    /// Number of recently forwarded frames remembered to break routing loops
    pub seen_cache: usize,
}

impl SnapConfig {
    /// Default SNAP configuration
    pub const DEFAULT: Self = Self {
        max_services: SNAP_MAX_SERVICES,
        max_netifs: SNAP_MAX_NETIFS,
        routing: false,
        seen_cache: 16,
    };
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Provisioning service configuration
#[derive(Debug, Clone, Copy)]
pub struct PrvsConfig {
    /// Attempts per blocking set request
    pub retry_limit: u8,
    /// Pump iterations to wait for one response
    pub wait_polls: u32,
    /// Maximum devices collected by one enumeration
    pub dnid_list_max: usize,
}

impl PrvsConfig {
    /// Default provisioning configuration
    pub const DEFAULT: Self = Self {
        retry_limit: 5,
        wait_polls: 64,
        dnid_list_max: 50,
    };
}

impl Default for PrvsConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// File delivery configuration
#[derive(Debug, Clone, Copy)]
pub struct FldtConfig {
    /// Tracked file types per client or server
    pub max_file_types: usize,
    /// Periodic ticks without progress before a command is resent
    pub wait_ticks: u32,
    /// Resends before a transfer is abandoned
    pub retry_limit: u32,
    /// Largest data chunk served per request
    pub max_chunk: usize,
}

impl FldtConfig {
    /// Default file delivery configuration
    pub const DEFAULT: Self = Self {
        max_file_types: FLDT_MAX_FILE_TYPES,
        wait_ticks: 10,
        retry_limit: 5,
        max_chunk: FLDT_MAX_CHUNK_SIZE,
    };
}

impl Default for FldtConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Signer types that must all produce a valid signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerPolicy {
    required: [Option<KeyType>; MAX_REQUIRED_SIGNERS],
}

impl SignerPolicy {
    /// Require exactly the two given signer types
    #[must_use]
    pub const fn pair(first: KeyType, second: KeyType) -> Self {
        Self {
            required: [Some(first), Some(second), None, None],
        }
    }

    /// Check whether a signer type is required
    #[must_use]
    pub fn requires(&self, key_type: KeyType) -> bool {
        self.required.iter().flatten().any(|&k| k == key_type)
    }

    /// Iterate over the required signer types
    pub fn iter(&self) -> impl Iterator<Item = KeyType> + '_ {
        self.required.iter().flatten().copied()
    }

    /// Number of required signer types
    #[must_use]
    pub fn len(&self) -> usize {
        self.required.iter().flatten().count()
    }

    /// Check for an empty policy
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trust list engine configuration
#[derive(Debug, Clone, Copy)]
pub struct TrustListConfig {
    /// Largest accepted serialized trust list
    pub max_size: u32,
    /// Signers that must countersign a trust list
    pub signers: SignerPolicy,
}

impl TrustListConfig {
    /// Default trust list configuration
    pub const DEFAULT: Self = Self {
        max_size: 4096,
        signers: SignerPolicy::pair(KeyType::Auth, KeyType::TrustList),
    };
}

impl Default for TrustListConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Firmware pipeline configuration
#[derive(Debug, Clone, Copy)]
pub struct FirmwareConfig {
    /// Signers that must countersign a firmware image
    pub signers: SignerPolicy,
}

impl FirmwareConfig {
    /// Default firmware configuration
    pub const DEFAULT: Self = Self {
        signers: SignerPolicy::pair(KeyType::Auth, KeyType::Firmware),
    };
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies() {
        let cfg = SdkConfig::default();
        assert_eq!(cfg.snap.max_services, 10);
        assert_eq!(cfg.snap.max_netifs, 5);
        assert_eq!(cfg.fldt.max_chunk, 512);
        assert!(cfg.trust_list.signers.requires(KeyType::TrustList));
        assert!(!cfg.trust_list.signers.requires(KeyType::Firmware));
        assert_eq!(cfg.firmware.signers.len(), 2);
    }
}

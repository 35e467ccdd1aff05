// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Version gating

use iot_common::{Error, FileVersion, Result};

/// Accept `update` only if it is strictly newer than `current`
///
/// Major, minor, patch, milestone and build take part; the application tag
/// and timestamp do not.
pub fn compare_version(update: &FileVersion, current: &FileVersion) -> Result<()> {
    if update.is_newer_than(current) {
        Ok(())
    } else {
        Err(Error::OldVersion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_is_old() {
        let v = FileVersion::new(1, 0, 0, 0, 7);
        assert_eq!(compare_version(&v, &v), Err(Error::OldVersion));
    }

    #[test]
    fn test_build_bump_accepted() {
        let current = FileVersion::new(1, 0, 0, 0, 7).with_timestamp(500);
        let update = FileVersion::new(1, 0, 0, 0, 8).with_timestamp(1);
        assert_eq!(compare_version(&update, &current), Ok(()));
        assert_eq!(compare_version(&current, &update), Err(Error::OldVersion));
    }
}

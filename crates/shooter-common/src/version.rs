//! Version types for data file compatibility.

use serde::{Deserialize, Serialize};

use crate::error::VersionMismatch;

/// Schema version using semantic versioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Major version (breaking changes)
    pub major: u16,
    /// Minor version (backwards-compatible additions)
    pub minor: u16,
    /// Patch version (bug fixes)
    pub patch: u16,
}

impl SchemaVersion {
    /// Creates a new schema version.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Current weapon definition file version.
    pub const WEAPON_FILE: Self = Self::new(1, 0, 0);

    /// Current scenario file version.
    pub const SCENARIO_FILE: Self = Self::new(1, 0, 0);

    /// Checks if this version is compatible with another version.
    /// Compatible means same major version and this minor >= other minor.
    #[must_use]
    pub const fn is_compatible_with(&self, other: &Self) -> bool {
        self.major == other.major && self.minor >= other.minor
    }

    /// Checks that data written as `data_version` can be read by this version.
    pub fn check_readable(&self, data_version: &Self) -> Result<(), VersionMismatch> {
        if self.is_compatible_with(data_version) {
            Ok(())
        } else {
            Err(VersionMismatch {
                expected: *self,
                actual: *data_version,
            })
        }
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

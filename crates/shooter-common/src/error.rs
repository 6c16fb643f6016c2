//! Error types shared by the shooter crates.

use thiserror::Error;

use crate::version::SchemaVersion;

/// A data file was written with a schema this build cannot read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Schema version mismatch: expected {expected}, got {actual}")]
pub struct VersionMismatch {
    /// Version this build understands
    pub expected: SchemaVersion,
    /// Version found in the data
    pub actual: SchemaVersion,
}

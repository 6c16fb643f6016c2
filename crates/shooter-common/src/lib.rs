//! # Shooter Common
//!
//! Common types, utilities, and shared abstractions for the shooter library.
//!
//! This crate provides foundational types used across all shooter crates:
//! - ID types (EntityId)
//! - Engine-style integer angle math
//! - Version information for data files
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod angles;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::angles::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

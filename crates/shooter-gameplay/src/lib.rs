//! # Shooter Gameplay
//!
//! Firearm behaviour for 2D shooters.
//!
//! This crate provides:
//! - Fire modes (single, burst, automatic) as shareable, copy-on-write data
//! - The fire cycle: charge, recovery, cooldown, reload and weapon lock
//! - The control surface hosts forward player input to
//! - Projectile launch data and instant-hit bullet resolution
//! - Ammunition bookkeeping
//! - A stance manager with an aim-animation behaviour
//! - Event bus for fire-cycle notifications

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod aim_animation;
pub mod ammo;
mod control;
pub mod effects;
pub mod events;
pub mod firearm;
pub mod firemode;
pub mod host;
pub mod projectile;
pub mod stance;

#[cfg(test)]
mod test_support;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aim_animation::*;
    pub use crate::ammo::*;
    pub use crate::effects::*;
    pub use crate::events::*;
    pub use crate::firearm::*;
    pub use crate::firemode::*;
    pub use crate::host::*;
    pub use crate::projectile::*;
    pub use crate::stance::*;
}

pub use prelude::*;

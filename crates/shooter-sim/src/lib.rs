//! # Shooter Sim
//!
//! Headless scenario runner for shooter firearms.
//!
//! This crate ties the gameplay library to data files:
//! - Weapon definitions loaded from TOML
//! - Scenario scripts and simulation configuration
//! - A shooting range with walls and targets
//! - A soldier host with stances, aim animation and ammunition

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod config;
pub mod runner;
pub mod scenario;
pub mod soldier;
pub mod weapon_loader;

pub use config::SimConfig;
pub use runner::{SimError, SimReport, SimResult, Simulation};
pub use scenario::{Scenario, Step};
pub use weapon_loader::{WeaponLoader, WeaponRegistry};

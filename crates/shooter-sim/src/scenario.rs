//! Scenario files.
//!
//! A scenario names a weapon, sets up the range and lists the inputs to
//! replay, one step at a time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shooter_common::{SchemaVersion, VersionMismatch};

use crate::arena::{TargetSpec, Wall};

/// Errors that can occur while loading a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Failed to read file.
    #[error("Failed to read scenario: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse scenario TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// File written by an incompatible schema.
    #[error("Unsupported scenario file: {0}")]
    Version(#[from] VersionMismatch),

    /// Nothing to do.
    #[error("Scenario has no steps")]
    Empty,
}

/// Result type for scenario loading.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// One scripted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Press the trigger, hold it for `hold` frames, then let go.
    Press {
        /// Frames the trigger is held.
        hold: u32,
        /// Cancel the use instead of releasing.
        #[serde(default)]
        cancel: bool,
    },
    /// Let frames pass without input.
    Wait {
        /// Frames to wait.
        ticks: u32,
    },
    /// Click the alternate trigger, toggling the bound fire modes.
    AltPress,
    /// Select a fire mode by name.
    SelectFiremode {
        /// Fire mode name.
        name: String,
        /// Switch once the weapon allows it instead of right away.
        #[serde(default)]
        scheduled: bool,
    },
    /// Point the aim at a position relative to the shooter.
    Aim {
        /// Horizontal offset.
        x: i32,
        /// Vertical offset, negative is up.
        y: i32,
    },
    /// Start reloading without using the weapon.
    Reload,
    /// Lock the weapon for `ticks` frames, zero meaning until unlocked.
    Lock {
        /// Lock duration.
        ticks: u32,
    },
    /// Lift the weapon lock.
    Unlock,
    /// Change the shooter's stance on a channel.
    Stance {
        /// Stance name.
        name: String,
        /// Stance channel.
        #[serde(default)]
        channel: u32,
        /// Skip the transition check.
        #[serde(default)]
        forced: bool,
    },
}

/// A scripted run against one weapon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Schema the file was written against.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Weapon name, looked up in the weapon registry.
    pub weapon: String,
    /// Shooter position.
    #[serde(default = "default_shooter")]
    pub shooter: (i32, i32),
    /// Initial aim, relative to the shooter.
    #[serde(default = "default_aim")]
    pub aim: (i32, i32),
    /// Solid walls.
    #[serde(default)]
    pub walls: Vec<Wall>,
    /// Targets.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    /// Inputs in order.
    pub steps: Vec<Step>,
}

fn default_shooter() -> (i32, i32) {
    (100, 480)
}

fn default_aim() -> (i32, i32) {
    (1000, 0)
}

impl Scenario {
    /// Parse and check a scenario.
    pub fn from_toml(content: &str) -> ScenarioResult<Self> {
        let scenario: Self = toml::from_str(content)?;
        SchemaVersion::SCENARIO_FILE.check_readable(&scenario.schema_version)?;
        if scenario.steps.is_empty() {
            return Err(ScenarioError::Empty);
        }
        Ok(scenario)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> ScenarioResult<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Frames the steps take when nothing is cut short.
    #[must_use]
    pub fn scripted_ticks(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Press { hold, .. } => u64::from(*hold),
                Step::Wait { ticks } => u64::from(*ticks),
                _ => 0,
            })
            .sum()
    }
}

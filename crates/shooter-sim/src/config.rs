//! Simulation configuration.
//!
//! Provides the run limits and world parameters of a simulation. The
//! configuration is loaded from a TOML file, falling back to defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "shooter-sim.toml";

/// Simulation configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Run Settings ===
    /// Frames a scenario may run before it is cut short
    pub max_ticks: u32,
    /// Random seed for weapons and bullets (None = random)
    pub seed: Option<u64>,

    // === World Settings ===
    /// World width in pixels
    pub world_width: i32,
    /// World height in pixels
    pub world_height: i32,
    /// Everything at or below this height is solid
    pub ground_level: Option<i32>,

    // === Event Settings ===
    /// Events held before the oldest undrained ones are dropped
    pub event_capacity: usize,
    /// Write every event as a JSON line to this file
    pub event_log: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks: 10_000,
            seed: None,

            world_width: 2000,
            world_height: 600,
            ground_level: Some(500),

            event_capacity: 4096,
            event_log: None,
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                info!("Loaded config from {}", path.display());
                config.validate();
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.max_ticks = self.max_ticks.clamp(1, 1_000_000);
        self.world_width = self.world_width.clamp(64, 100_000);
        self.world_height = self.world_height.clamp(64, 100_000);
        if let Some(ground) = self.ground_level {
            self.ground_level = Some(ground.clamp(0, self.world_height));
        }
        self.event_capacity = self.event_capacity.clamp(16, 1 << 20);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.max_ticks, 10_000);
        assert_eq!(config.ground_level, Some(500));
        assert!(config.seed.is_none());
        assert!(config.event_log.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig {
            max_ticks: 0,
            world_width: 10,
            ground_level: Some(9000),
            event_capacity: 1,
            ..SimConfig::default()
        };

        config.validate();

        assert_eq!(config.max_ticks, 1);
        assert_eq!(config.world_width, 64);
        assert_eq!(config.ground_level, Some(600));
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("sim").join(CONFIG_FILE);

        let config = SimConfig {
            seed: Some(12345),
            ground_level: Some(450),
            ..SimConfig::default()
        };
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.seed, Some(12345));
        assert_eq!(loaded.ground_level, Some(450));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "max_ticks = 300\n").expect("write");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.max_ticks, 300);
        assert_eq!(loaded.world_width, 2000);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SimConfig::load_from("/nonexistent/path/config.toml");
        assert_eq!(config, SimConfig::default());
    }
}

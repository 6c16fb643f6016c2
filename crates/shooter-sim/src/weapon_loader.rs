//! Weapon definition loading.
//!
//! This module provides:
//! - Loading weapons from `assets/weapons/*.toml`
//! - Validation of weapons and their fire modes on load
//! - A registry with case-insensitive lookup by name
//!
//! Fire modes are registered once per weapon and shared by every firearm
//! built from it. Tuning one firearm copies its fire mode first, so the
//! registry's data stays untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use shooter_common::{SchemaVersion, VersionMismatch};
use shooter_gameplay::{AmmoStore, FireMode, FireModeError, Firearm, FirearmError, FirearmSettings};

/// Default asset path for weapons.
pub const DEFAULT_WEAPON_PATH: &str = "assets/weapons";

/// Errors that can occur during weapon loading.
#[derive(Debug, Error)]
pub enum WeaponLoadError {
    /// File or directory not found.
    #[error("Weapon path not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read file.
    #[error("Failed to read weapon file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse weapon TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// File written by an incompatible schema.
    #[error("Unsupported weapon file: {0}")]
    Version(#[from] VersionMismatch),

    /// Validation error.
    #[error("Weapon validation error: {0}")]
    ValidationError(String),

    /// A fire mode failed its own checks.
    #[error("Weapon '{weapon}' has an invalid fire mode: {source}")]
    InvalidFireMode {
        /// Weapon name.
        weapon: String,
        /// Fire mode problem.
        #[source]
        source: FireModeError,
    },

    /// Duplicate weapon name.
    #[error("Duplicate weapon name: {0}")]
    DuplicateName(String),

    /// No weapon with that name.
    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    /// Building the firearm failed.
    #[error(transparent)]
    Firearm(#[from] FirearmError),
}

/// Result type for weapon loading operations.
pub type WeaponLoadResult<T> = Result<T, WeaponLoadError>;

/// Ammunition a weapon starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoSupply {
    /// Ammo type, matched against fire modes' `ammo_id`.
    pub id: String,
    /// Magazine size. The magazine starts full.
    pub magazine: u32,
    /// Spare rounds carried outside the magazine.
    #[serde(default)]
    pub reserve: u32,
}

/// A weapon as authored in a weapon file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponDefinition {
    /// Display name, unique across all loaded files.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Weapon settings independent of the fire mode.
    #[serde(default)]
    pub settings: FirearmSettings,
    /// Fire mode selected by the primary "fire mode by use" binding.
    #[serde(default)]
    pub primary_firemode: Option<String>,
    /// Fire mode selected by the secondary binding.
    #[serde(default)]
    pub secondary_firemode: Option<String>,
    /// Starting ammunition.
    #[serde(default)]
    pub ammo: Vec<AmmoSupply>,
    /// Fire modes, the first one selected initially.
    pub firemodes: Vec<FireMode>,
}

impl WeaponDefinition {
    /// Validates the weapon definition.
    pub fn validate(&self) -> WeaponLoadResult<()> {
        if self.name.is_empty() {
            return Err(WeaponLoadError::ValidationError(
                "Weapon name cannot be empty".to_string(),
            ));
        }
        if self.firemodes.is_empty() {
            return Err(WeaponLoadError::ValidationError(format!(
                "Weapon '{}' has no fire modes",
                self.name
            )));
        }

        let mut names = AHashSet::new();
        for firemode in &self.firemodes {
            firemode
                .validate()
                .map_err(|source| WeaponLoadError::InvalidFireMode {
                    weapon: self.name.clone(),
                    source,
                })?;
            if !names.insert(firemode.name.as_str()) {
                return Err(WeaponLoadError::ValidationError(format!(
                    "Weapon '{}' defines fire mode '{}' twice",
                    self.name, firemode.name
                )));
            }
            if let Some(ammo_id) = &firemode.ammo_id {
                if !self.ammo.iter().any(|supply| &supply.id == ammo_id) {
                    return Err(WeaponLoadError::ValidationError(format!(
                        "Fire mode '{}' of '{}' uses undeclared ammo '{}'",
                        firemode.name, self.name, ammo_id
                    )));
                }
            }
        }

        for binding in [&self.primary_firemode, &self.secondary_firemode]
            .into_iter()
            .flatten()
        {
            if !names.contains(binding.as_str()) {
                return Err(WeaponLoadError::ValidationError(format!(
                    "Weapon '{}' binds unknown fire mode '{}'",
                    self.name, binding
                )));
            }
        }
        Ok(())
    }

    /// A full magazine of every declared ammo type.
    #[must_use]
    pub fn magazine(&self) -> AmmoStore {
        let mut store = AmmoStore::new();
        for supply in &self.ammo {
            store = store.with_capacity(&supply.id, supply.magazine);
            store.do_ammo(&supply.id, supply.magazine as i32);
        }
        store
    }

    /// The spare rounds of every declared ammo type.
    #[must_use]
    pub fn reserve(&self) -> AmmoStore {
        let mut store = AmmoStore::new();
        for supply in &self.ammo {
            store.do_ammo(&supply.id, supply.reserve as i32);
        }
        store
    }
}

/// A collection of weapons from a single file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponFile {
    /// Schema the file was written against.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// Weapons in this file.
    pub weapons: Vec<WeaponDefinition>,
}

#[derive(Debug)]
struct RegisteredWeapon {
    definition: WeaponDefinition,
    firemodes: Vec<Arc<FireMode>>,
}

/// Weapon registry with lookup by name.
#[derive(Debug, Default)]
pub struct WeaponRegistry {
    /// Weapons by lowercase name.
    by_name: AHashMap<String, RegisteredWeapon>,
}

impl WeaponRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of registered weapons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registers a weapon.
    pub fn register(&mut self, weapon: WeaponDefinition) -> WeaponLoadResult<()> {
        let key = weapon.name.to_lowercase();
        if self.by_name.contains_key(&key) {
            return Err(WeaponLoadError::DuplicateName(weapon.name));
        }
        let firemodes = weapon.firemodes.iter().cloned().map(Arc::new).collect();
        self.by_name.insert(
            key,
            RegisteredWeapon {
                definition: weapon,
                firemodes,
            },
        );
        Ok(())
    }

    /// Gets a weapon by name (case-insensitive).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&WeaponDefinition> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|weapon| &weapon.definition)
    }

    /// Builds a firearm of the named weapon. Firearms of the same weapon
    /// share their fire modes.
    pub fn firearm(&self, name: &str) -> WeaponLoadResult<Firearm> {
        let weapon = self
            .by_name
            .get(&name.to_lowercase())
            .ok_or_else(|| WeaponLoadError::UnknownWeapon(name.to_string()))?;
        let firearm = Firearm::with_firemodes(
            weapon.definition.settings,
            weapon.firemodes.iter().cloned(),
        )?;
        Ok(firearm)
    }

    /// Returns an iterator over all weapons.
    pub fn iter(&self) -> impl Iterator<Item = &WeaponDefinition> {
        self.by_name.values().map(|weapon| &weapon.definition)
    }

    /// Clears the registry.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

/// Loads weapon files into a registry.
#[derive(Debug)]
pub struct WeaponLoader {
    /// Base path for weapon files.
    base_path: PathBuf,
    /// Weapon registry.
    registry: WeaponRegistry,
}

impl WeaponLoader {
    /// Creates a new weapon loader.
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            registry: WeaponRegistry::new(),
        }
    }

    /// Creates a weapon loader with default path.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(DEFAULT_WEAPON_PATH)
    }

    /// Returns a reference to the weapon registry.
    #[must_use]
    pub fn registry(&self) -> &WeaponRegistry {
        &self.registry
    }

    /// Consumes the loader, keeping the registry.
    #[must_use]
    pub fn into_registry(self) -> WeaponRegistry {
        self.registry
    }

    /// Loads every `.toml` file in the base path. Files that fail to load
    /// are skipped with a warning.
    pub fn load_all(&mut self) -> WeaponLoadResult<usize> {
        let path = self.base_path.clone();
        if !path.is_dir() {
            return Err(WeaponLoadError::NotFound(path));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|file| file.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} weapons from {:?}", n, file_path);
                },
                Err(e) => {
                    warn!("Failed to load weapon file {:?}: {}", file_path, e);
                },
            }
        }

        info!("Loaded {} weapons total", count);
        Ok(count)
    }

    /// Loads weapons from a single file.
    pub fn load_file(&mut self, path: &Path) -> WeaponLoadResult<usize> {
        if !path.exists() {
            return Err(WeaponLoadError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Loads weapons from TOML text. Nothing is registered unless the
    /// whole file is valid.
    pub fn load_str(&mut self, content: &str) -> WeaponLoadResult<usize> {
        let weapon_file: WeaponFile = toml::from_str(content)?;
        SchemaVersion::WEAPON_FILE.check_readable(&weapon_file.schema_version)?;

        let mut seen = AHashSet::new();
        for weapon in &weapon_file.weapons {
            weapon.validate()?;
            let key = weapon.name.to_lowercase();
            if self.registry.get_by_name(&key).is_some() || !seen.insert(key) {
                return Err(WeaponLoadError::DuplicateName(weapon.name.clone()));
            }
        }

        let count = weapon_file.weapons.len();
        for weapon in weapon_file.weapons {
            self.registry.register(weapon)?;
        }
        Ok(count)
    }
}

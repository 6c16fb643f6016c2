//! Ammunition bookkeeping.
//!
//! An [`AmmoStore`] tracks how many units of each ammunition type a weapon
//! or user carries. Consumption follows the fire mode: `ammo_usage` units
//! are taken for every `ammo_rate` shots.

use ahash::AHashMap;
use tracing::trace;

use crate::firemode::FireMode;

/// Per-type ammunition counts with optional capacity limits.
#[derive(Debug, Clone, Default)]
pub struct AmmoStore {
    counts: AHashMap<String, u32>,
    capacity: AHashMap<String, u32>,
    /// Shots fired per type since the last usage was charged.
    pending_shots: AHashMap<String, u32>,
    /// Fire without consuming anything.
    pub infinite: bool,
}

impl AmmoStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum count for a type.
    pub fn with_capacity(mut self, ammo_id: impl Into<String>, capacity: u32) -> Self {
        self.capacity.insert(ammo_id.into(), capacity);
        self
    }

    /// Current count for a type.
    #[must_use]
    pub fn count(&self, ammo_id: &str) -> u32 {
        self.counts.get(ammo_id).copied().unwrap_or(0)
    }

    /// Maximum count for a type, if limited.
    #[must_use]
    pub fn capacity(&self, ammo_id: &str) -> Option<u32> {
        self.capacity.get(ammo_id).copied()
    }

    /// Change the count by `change`, clamped to `0..=capacity`.
    /// Returns the change actually applied.
    pub fn do_ammo(&mut self, ammo_id: &str, change: i32) -> i32 {
        let current = self.count(ammo_id);
        let limit = self.capacity(ammo_id).unwrap_or(u32::MAX);
        let target = (i64::from(current) + i64::from(change)).clamp(0, i64::from(limit)) as u32;
        self.counts.insert(ammo_id.to_string(), target);
        target as i32 - current as i32
    }

    /// Missing units until the type is at capacity.
    #[must_use]
    pub fn missing(&self, ammo_id: &str) -> u32 {
        self.capacity(ammo_id)
            .map_or(0, |cap| cap.saturating_sub(self.count(ammo_id)))
    }

    /// Whether a shot in `firemode` can be paid for.
    #[must_use]
    pub fn has_ammo(&self, firemode: &FireMode) -> bool {
        if self.infinite {
            return true;
        }
        match &firemode.ammo_id {
            Some(id) => self.count(id) >= firemode.ammo_usage,
            None => true,
        }
    }

    /// Account for one shot in `firemode`.
    pub fn handle_usage(&mut self, firemode: &FireMode) {
        if self.infinite {
            return;
        }
        let Some(id) = &firemode.ammo_id else {
            return;
        };
        let shots = self.pending_shots.entry(id.clone()).or_insert(0);
        *shots += 1;
        if *shots >= firemode.ammo_rate.max(1) {
            *shots = 0;
            let taken = self.do_ammo(id, -(firemode.ammo_usage as i32));
            trace!(ammo = %id, taken, left = self.count(id), "Ammo used");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firemode::FireModeKind;

    #[test]
    fn test_do_ammo_clamps() {
        let mut store = AmmoStore::new().with_capacity("bullet", 10);
        assert_eq!(store.do_ammo("bullet", 15), 10);
        assert_eq!(store.count("bullet"), 10);
        assert_eq!(store.do_ammo("bullet", -4), -4);
        assert_eq!(store.missing("bullet"), 4);
        assert_eq!(store.do_ammo("bullet", -20), -6);
        assert_eq!(store.count("bullet"), 0);
    }

    #[test]
    fn test_usage_per_rate() {
        let mut store = AmmoStore::new();
        store.do_ammo("shell", 4);
        let mut fm = FireMode::new("Spray", FireModeKind::Auto).with_ammo("shell");
        fm.ammo_rate = 3;

        for _ in 0..3 {
            assert!(store.has_ammo(&fm));
            store.handle_usage(&fm);
        }
        assert_eq!(store.count("shell"), 3);
    }

    #[test]
    fn test_has_ammo_needs_full_usage() {
        let mut store = AmmoStore::new();
        store.do_ammo("cell", 1);
        let mut fm = FireMode::default().with_ammo("cell");
        fm.ammo_usage = 2;
        assert!(!store.has_ammo(&fm));

        store.infinite = true;
        assert!(store.has_ammo(&fm));
        store.handle_usage(&fm);
        assert_eq!(store.count("cell"), 1);
    }

    #[test]
    fn test_no_ammo_type_is_free() {
        let store = AmmoStore::new();
        assert!(store.has_ammo(&FireMode::default()));
    }
}

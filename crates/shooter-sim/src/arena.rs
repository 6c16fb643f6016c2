//! Shooting range the simulation runs in.
//!
//! A rectangular world with an optional floor, solid walls and targets
//! that take damage. Implements [`CollisionWorld`] so bullets can be
//! resolved against it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use shooter_common::EntityId;
use shooter_gameplay::{segment_touches, CollisionWorld, LineObject};

use crate::config::SimConfig;

/// Hit radius of targets in pixels.
pub const TARGET_RADIUS: i32 = 6;

/// Solid axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Wall {
    /// Whether the wall covers the point.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Target as authored in a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Name used in reports.
    pub name: String,
    /// Center position.
    pub position: (i32, i32),
    /// Hit points.
    #[serde(default = "default_health")]
    pub health: i32,
    /// Takes critical damage.
    #[serde(default)]
    pub weak_spot: bool,
    /// Does not stop bullets but notices them passing.
    #[serde(default)]
    pub sensor: bool,
}

fn default_health() -> i32 {
    100
}

/// A target placed in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Identity.
    pub id: EntityId,
    /// Authored data.
    pub spec: TargetSpec,
    /// Hit points left.
    pub health: i32,
    /// Bullets that passed a sensor.
    pub noticed: u32,
}

impl Target {
    /// Whether the target can still be hit.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.spec.sensor && self.health > 0
    }

    fn line_object(&self) -> LineObject {
        LineObject {
            alive: self.is_alive(),
            interaction_target: self.spec.sensor,
            receives_crits: self.spec.weak_spot,
            ..LineObject::living(self.id, self.spec.position)
        }
    }
}

/// World bounds, floor, walls and targets.
#[derive(Debug, Clone)]
pub struct Arena {
    width: i32,
    height: i32,
    ground_level: Option<i32>,
    walls: Vec<Wall>,
    targets: Vec<Target>,
}

impl Arena {
    /// Empty arena sized by the configuration.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            width: config.world_width,
            height: config.world_height,
            ground_level: config.ground_level,
            walls: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Add a wall.
    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    /// Place a target and return its identity.
    pub fn add_target(&mut self, spec: TargetSpec) -> EntityId {
        let id = EntityId::new();
        self.targets.push(Target {
            id,
            health: spec.health,
            spec,
            noticed: 0,
        });
        id
    }

    /// Targets in placement order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// World width in pixels.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// World height in pixels.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Deal damage to a target. Returns the health left, or `None` if no
    /// such target exists.
    pub fn apply_damage(&mut self, id: EntityId, damage: i32) -> Option<i32> {
        let target = self.targets.iter_mut().find(|t| t.id == id)?;
        target.health = (target.health - damage).max(0);
        debug!(target = %target.spec.name, damage, health = target.health, "Target hit");
        Some(target.health)
    }

    /// Count a bullet passing a sensor.
    pub fn notice(&mut self, id: EntityId) {
        if let Some(target) = self.targets.iter_mut().find(|t| t.id == id) {
            target.noticed += 1;
        }
    }
}

impl CollisionWorld for Arena {
    fn is_solid(&self, x: i32, y: i32) -> bool {
        if self.ground_level.is_some_and(|ground| y >= ground) || y >= self.height {
            return true;
        }
        self.walls.iter().any(|wall| wall.contains(x, y))
    }

    fn objects_on_line(&self, from: (i32, i32), to: (i32, i32)) -> Vec<LineObject> {
        self.targets
            .iter()
            .filter(|t| segment_touches(from, to, t.spec.position, TARGET_RADIUS))
            .map(Target::line_object)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, position: (i32, i32)) -> TargetSpec {
        TargetSpec {
            name: name.to_string(),
            position,
            health: 30,
            weak_spot: false,
            sensor: false,
        }
    }

    #[test]
    fn test_solidity() {
        let mut arena = Arena::new(&SimConfig::default());
        arena.add_wall(Wall {
            x: 300,
            y: 100,
            width: 20,
            height: 400,
        });

        assert!(arena.is_solid(0, 500));
        assert!(!arena.is_solid(0, 499));
        assert!(arena.is_solid(305, 200));
        assert!(!arena.is_solid(320, 200));
        assert_eq!(arena.first_obstruction((100, 200), (400, 200)), Some((299, 200)));
    }

    #[test]
    fn test_damage_and_death() {
        let mut arena = Arena::new(&SimConfig::default());
        let id = arena.add_target(spec("Dummy", (400, 300)));

        assert_eq!(arena.apply_damage(id, 20), Some(10));
        assert!(arena.targets()[0].is_alive());
        assert_eq!(arena.apply_damage(id, 20), Some(0));
        assert!(!arena.targets()[0].is_alive());
        assert_eq!(arena.apply_damage(EntityId::new(), 5), None);
    }

    #[test]
    fn test_objects_on_line() {
        let mut arena = Arena::new(&SimConfig::default());
        arena.add_target(spec("Near", (200, 300)));
        arena.add_target(TargetSpec {
            sensor: true,
            ..spec("Gate", (300, 303))
        });
        arena.add_target(spec("Off", (200, 400)));

        let objects = arena.objects_on_line((100, 300), (500, 300));
        assert_eq!(objects.len(), 2);
        assert!(objects[0].alive);
        assert!(!objects[1].alive);
        assert!(objects[1].interaction_target);
    }
}

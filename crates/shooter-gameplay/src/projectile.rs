//! Projectile launch data and instant-hit bullet flight.
//!
//! The firearm only describes shots ([`ProjectileShot`]); spawning them is
//! up to the host. Hosts that treat bullets as hitscan can resolve a shot
//! against a [`CollisionWorld`] with a [`BulletResolver`].

use serde::{Deserialize, Serialize};
use shooter_common::{angles, EntityId};
use tracing::trace;

use crate::firemode::Deviation;

/// Everything a host needs to spawn one projectile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileShot {
    /// Shooting user.
    pub shooter: EntityId,
    /// Weapon that fired.
    pub weapon: EntityId,
    /// Projectile kind.
    pub projectile_id: String,
    /// Spawn offset relative to the shooter.
    pub offset: (i32, i32),
    /// Launch angle in degrees.
    pub angle: i32,
    /// Launch speed.
    pub speed: i32,
    /// Maximum flight range in pixels.
    pub range: i32,
    /// Damage dealt on hit.
    pub damage: i32,
    /// Damage type tag.
    pub damage_type: Option<String>,
    /// Random spread applied at launch.
    pub deviation: Deviation,
}

// ============================================================================
// Collision world
// ============================================================================

/// An object crossed by a flight path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineObject {
    /// Object identity.
    pub id: EntityId,
    /// Position of the object's center.
    pub position: (i32, i32),
    /// Inside another object (never hit directly).
    pub contained: bool,
    /// Alive objects stop bullets.
    pub alive: bool,
    /// Non-living objects that still stop bullets.
    pub projectile_target: bool,
    /// Receives an interaction notice when a bullet passes.
    pub interaction_target: bool,
    /// Takes critical damage.
    pub receives_crits: bool,
}

impl LineObject {
    /// A living target at `position`.
    #[must_use]
    pub fn living(id: EntityId, position: (i32, i32)) -> Self {
        Self {
            id,
            position,
            contained: false,
            alive: true,
            projectile_target: false,
            interaction_target: false,
            receives_crits: false,
        }
    }

    fn stops_bullets(&self) -> bool {
        self.alive || self.projectile_target
    }
}

/// Landscape and object queries used during bullet flight.
pub trait CollisionWorld {
    /// Whether the landscape is solid at a point.
    fn is_solid(&self, x: i32, y: i32) -> bool;

    /// Objects whose shape touches the segment.
    fn objects_on_line(&self, from: (i32, i32), to: (i32, i32)) -> Vec<LineObject>;

    /// Last free point before the landscape blocks the segment, or `None`
    /// if the whole segment is free.
    fn first_obstruction(&self, from: (i32, i32), to: (i32, i32)) -> Option<(i32, i32)> {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs());
        let mut last_free = from;
        for i in 0..=steps {
            let (x, y) = if steps == 0 {
                from
            } else {
                (from.0 + dx * i / steps, from.1 + dy * i / steps)
            };
            if self.is_solid(x, y) {
                return Some(last_free);
            }
            last_free = (x, y);
        }
        None
    }
}

/// Whether `point` lies within `tolerance` pixels of the segment.
#[must_use]
pub fn segment_touches(from: (i32, i32), to: (i32, i32), point: (i32, i32), tolerance: i32) -> bool {
    let (ax, ay) = (f64::from(from.0), f64::from(from.1));
    let (bx, by) = (f64::from(to.0), f64::from(to.1));
    let (px, py) = (f64::from(point.0), f64::from(point.1));
    let (abx, aby) = (bx - ax, by - ay);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * abx + (py - ay) * aby) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * abx, ay + t * aby);
    (px - cx).hypot(py - cy) <= f64::from(tolerance)
}

/// Simple world for testing: a flat floor plus point targets.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockWorld {
    /// Everything at or below this y is solid.
    pub ground_level: Option<i32>,
    /// Objects in the world.
    pub objects: Vec<LineObject>,
    /// Hit radius of objects.
    pub object_radius: i32,
}

#[cfg(test)]
impl MockWorld {
    /// Empty world with the given floor.
    #[must_use]
    pub fn new(ground_level: Option<i32>) -> Self {
        Self {
            ground_level,
            objects: Vec::new(),
            object_radius: 4,
        }
    }

    /// Add an object.
    pub fn with_object(mut self, object: LineObject) -> Self {
        self.objects.push(object);
        self
    }
}

#[cfg(test)]
impl CollisionWorld for MockWorld {
    fn is_solid(&self, _x: i32, y: i32) -> bool {
        self.ground_level.is_some_and(|ground| y >= ground)
    }

    fn objects_on_line(&self, from: (i32, i32), to: (i32, i32)) -> Vec<LineObject> {
        self.objects
            .iter()
            .filter(|o| segment_touches(from, to, o.position, self.object_radius))
            .cloned()
            .collect()
    }
}

// ============================================================================
// Bullet flight
// ============================================================================

/// How a bullet flight ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Impact {
    /// Hit an object.
    Target {
        /// Object hit.
        target: EntityId,
        /// Damage dealt.
        damage: i32,
        /// Whether the hit was critical.
        critical: bool,
    },
    /// Hit the landscape.
    Ground,
    /// Flew its full range without hitting anything.
    Expired,
}

/// Result of resolving one bullet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletFlight {
    /// Launch point.
    pub origin: (i32, i32),
    /// Point where the flight ended.
    pub end: (i32, i32),
    /// Flight angle in centi-degrees, deviation included.
    pub angle: i32,
    /// What was hit.
    pub impact: Impact,
    /// Objects the bullet passed that asked to be notified.
    pub interactions: Vec<EntityId>,
}

/// Resolves instant-hit bullets.
#[derive(Debug)]
pub struct BulletResolver {
    rng: fastrand::Rng,
}

impl BulletResolver {
    /// Resolver with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
        }
    }

    /// Resolver with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Fly `shot` from the absolute `origin` through `world`.
    pub fn resolve<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        shot: &ProjectileShot,
        origin: (i32, i32),
    ) -> BulletFlight {
        let spread = shot.deviation.to_precision(100).abs();
        let angle = shot.angle * 100 + self.rng.i32(-spread..=spread);
        let reach = |distance: i32| {
            (
                origin.0 + angles::sin_prec(angle, distance, 100),
                origin.1 - angles::cos_prec(angle, distance, 100),
            )
        };

        let mut end = reach(shot.range.max(0));
        if let Some(blocked) = world.first_obstruction(origin, end) {
            end = blocked;
        }

        let mut candidates: Vec<LineObject> = world
            .objects_on_line(origin, end)
            .into_iter()
            .filter(|o| !o.contained && o.id != shot.shooter)
            .collect();
        candidates.sort_by_key(|o| angles::distance(origin.0, origin.1, o.position.0, o.position.1));

        let mut impact = None;
        if let Some(hit) = candidates.iter().find(|o| o.stops_bullets()) {
            end = reach(angles::distance(
                origin.0,
                origin.1,
                hit.position.0,
                hit.position.1,
            ));
            let damage = if hit.receives_crits {
                shot.damage * 3 / 2
            } else {
                shot.damage
            };
            impact = Some(Impact::Target {
                target: hit.id,
                damage,
                critical: hit.receives_crits,
            });
        }

        let interactions = world
            .objects_on_line(origin, end)
            .into_iter()
            .filter(|o| o.interaction_target && o.id != shot.shooter)
            .map(|o| o.id)
            .collect();

        let impact = impact.unwrap_or_else(|| {
            let beyond = (
                end.0 + angles::sin_prec(angle, 2, 100),
                end.1 - angles::cos_prec(angle, 2, 100),
            );
            if world.is_solid(beyond.0, beyond.1) {
                Impact::Ground
            } else {
                Impact::Expired
            }
        });

        trace!(?origin, ?end, angle, ?impact, "Bullet resolved");

        BulletFlight {
            origin,
            end,
            angle,
            impact,
            interactions,
        }
    }
}

impl Default for BulletResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(shooter: EntityId, angle: i32, range: i32) -> ProjectileShot {
        ProjectileShot {
            shooter,
            weapon: EntityId::new(),
            projectile_id: "NormalBullet".to_string(),
            offset: (0, 0),
            angle,
            speed: 100,
            range,
            damage: 20,
            damage_type: None,
            deviation: Deviation {
                angle: 0,
                precision: 100,
            },
        }
    }

    #[test]
    fn test_bullet_hits_nearest_living_target() {
        let shooter = EntityId::new();
        let near = EntityId::new();
        let far = EntityId::new();
        let world = MockWorld::new(None)
            .with_object(LineObject::living(far, (200, 0)))
            .with_object(LineObject::living(near, (100, 0)));

        let flight = BulletResolver::with_seed(1).resolve(&world, &shot(shooter, 90, 600), (0, 0));

        assert_eq!(
            flight.impact,
            Impact::Target {
                target: near,
                damage: 20,
                critical: false
            }
        );
        assert_eq!(flight.end, (100, 0));
    }

    #[test]
    fn test_bullet_ignores_shooter_and_contained() {
        let shooter = EntityId::new();
        let mut stored = LineObject::living(EntityId::new(), (50, 0));
        stored.contained = true;
        let world = MockWorld::new(None)
            .with_object(LineObject::living(shooter, (0, 0)))
            .with_object(stored);

        let flight = BulletResolver::with_seed(1).resolve(&world, &shot(shooter, 90, 300), (0, 0));

        assert_eq!(flight.impact, Impact::Expired);
        assert_eq!(flight.end, (300, 0));
    }

    #[test]
    fn test_bullet_critical_damage() {
        let shooter = EntityId::new();
        let target = EntityId::new();
        let mut object = LineObject::living(target, (0, -80));
        object.receives_crits = true;
        let world = MockWorld::new(None).with_object(object);

        let flight = BulletResolver::with_seed(1).resolve(&world, &shot(shooter, 0, 300), (0, 0));

        assert_eq!(
            flight.impact,
            Impact::Target {
                target,
                damage: 30,
                critical: true
            }
        );
    }

    #[test]
    fn test_bullet_hits_ground() {
        let shooter = EntityId::new();
        let world = MockWorld::new(Some(50));

        let flight = BulletResolver::with_seed(1).resolve(&world, &shot(shooter, 180, 300), (0, 0));

        assert_eq!(flight.impact, Impact::Ground);
        assert_eq!(flight.end, (0, 49));
    }

    #[test]
    fn test_bullet_passes_interaction_targets() {
        let shooter = EntityId::new();
        let glass = EntityId::new();
        let mut pane = LineObject::living(glass, (60, 0));
        pane.alive = false;
        pane.interaction_target = true;
        let world = MockWorld::new(None).with_object(pane);

        let flight = BulletResolver::with_seed(1).resolve(&world, &shot(shooter, 90, 200), (0, 0));

        assert_eq!(flight.impact, Impact::Expired);
        assert_eq!(flight.interactions, vec![glass]);
    }

    #[test]
    fn test_spread_stays_within_deviation() {
        let shooter = EntityId::new();
        let world = MockWorld::new(None);
        let mut resolver = BulletResolver::with_seed(99);
        let mut fired = shot(shooter, 90, 100);
        fired.deviation = Deviation {
            angle: 5,
            precision: 1,
        };

        for _ in 0..50 {
            let flight = resolver.resolve(&world, &fired, (0, 0));
            assert!((8500..=9500).contains(&flight.angle));
        }
    }
}

//! Scenario runner.
//!
//! Replays a scenario's steps against one firearm, frame by frame, and
//! summarizes what happened.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use shooter_gameplay::{EventBus, Firearm, FirearmError, FirearmEvent};

use crate::arena::Arena;
use crate::config::SimConfig;
use crate::scenario::{Scenario, Step};
use crate::soldier::{Soldier, SoldierError, SoldierStats};
use crate::weapon_loader::{WeaponLoadError, WeaponRegistry};

/// Errors while running a scenario.
#[derive(Debug, Error)]
pub enum SimError {
    /// The weapon rejected an operation.
    #[error(transparent)]
    Firearm(#[from] FirearmError),

    /// The weapon could not be built.
    #[error(transparent)]
    Weapon(#[from] WeaponLoadError),

    /// The shooter could not be set up or changed.
    #[error(transparent)]
    Soldier(#[from] SoldierError),

    /// A step named a fire mode the weapon does not have.
    #[error("Weapon has no fire mode named '{0}'")]
    UnknownFiremode(String),
}

/// Result type for simulation runs.
pub type SimResult<T> = Result<T, SimError>;

/// Final state of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    /// Target name.
    pub name: String,
    /// Health left.
    pub health: i32,
    /// Bullets noticed by a sensor.
    pub noticed: u32,
}

/// Summary of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    /// Weapon name.
    pub weapon: String,
    /// Fire mode selected at the end.
    pub firemode: String,
    /// Frames simulated.
    pub ticks: u64,
    /// Whether the tick budget cut the run short.
    pub truncated: bool,
    /// Shot statistics.
    pub stats: SoldierStats,
    /// Targets in placement order.
    pub targets: Vec<TargetReport>,
    /// Events recorded.
    pub events: usize,
}

/// A weapon, its shooter and the range they stand on.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    weapon: String,
    firearm: Firearm,
    soldier: Soldier,
    bus: EventBus,
    events: Vec<FirearmEvent>,
    aim: (i32, i32),
    ticks: u64,
    truncated: bool,
}

impl Simulation {
    /// Set up the scenario's range with its weapon from `registry`.
    pub fn new(config: SimConfig, registry: &WeaponRegistry, scenario: &Scenario) -> SimResult<Self> {
        let definition = registry
            .get_by_name(&scenario.weapon)
            .ok_or_else(|| WeaponLoadError::UnknownWeapon(scenario.weapon.clone()))?;
        let mut firearm = registry.firearm(&scenario.weapon)?;

        let mut arena = Arena::new(&config);
        for wall in &scenario.walls {
            arena.add_wall(*wall);
        }
        for target in &scenario.targets {
            arena.add_target(target.clone());
        }

        let bus = EventBus::new(config.event_capacity);
        let aim_animation = firearm.animation_set()?.aim;
        let mut soldier = Soldier::new(arena, bus.sender(), aim_animation.as_deref())?
            .with_position(scenario.shooter)
            .with_ammo(definition.magazine(), definition.reserve())
            .with_bindings(
                definition.primary_firemode.clone(),
                definition.secondary_firemode.clone(),
            );
        if let Some(seed) = config.seed {
            firearm = firearm.with_seed(seed);
            soldier = soldier.with_seed(seed.wrapping_add(1));
        }

        info!(
            weapon = %definition.name,
            firemodes = firearm.firemodes().len(),
            targets = scenario.targets.len(),
            "Simulation ready"
        );

        Ok(Self {
            config,
            weapon: definition.name.clone(),
            firearm,
            soldier,
            bus,
            events: Vec::new(),
            aim: scenario.aim,
            ticks: 0,
            truncated: false,
        })
    }

    /// The weapon.
    #[must_use]
    pub fn firearm(&self) -> &Firearm {
        &self.firearm
    }

    /// The shooter.
    #[must_use]
    pub fn soldier(&self) -> &Soldier {
        &self.soldier
    }

    /// Frames simulated so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[FirearmEvent] {
        &self.events
    }

    /// Run every step, stopping early when the tick budget runs out.
    pub fn run(&mut self, steps: &[Step]) -> SimResult<SimReport> {
        for step in steps {
            if self.exhausted() {
                warn!(max_ticks = self.config.max_ticks, "Tick budget exhausted, stopping");
                self.truncated = true;
                break;
            }
            self.apply(step)?;
        }
        self.collect_events();
        self.report()
    }

    /// Replay a single step.
    pub fn apply(&mut self, step: &Step) -> SimResult<()> {
        let user = self.soldier.id();
        let (x, y) = self.aim;
        debug!(?step, tick = self.ticks, "Step");

        match step {
            Step::Press { hold, cancel } => {
                self.firearm.control_use_start(&mut self.soldier, user, x, y)?;
                for _ in 0..*hold {
                    if self.exhausted() {
                        self.truncated = true;
                        break;
                    }
                    self.firearm.control_use_holding(&mut self.soldier, user, x, y)?;
                    self.frame()?;
                }
                if *cancel {
                    self.firearm.control_use_cancel(&mut self.soldier, user, x, y)?;
                } else {
                    self.firearm.control_use_stop(&mut self.soldier, user, x, y)?;
                }
            },
            Step::Wait { ticks } => {
                for _ in 0..*ticks {
                    if self.exhausted() {
                        self.truncated = true;
                        break;
                    }
                    self.frame()?;
                }
            },
            Step::AltPress => {
                self.firearm.control_use_alt_start(&mut self.soldier, user, x, y)?;
                self.firearm.control_use_alt_stop(&mut self.soldier, user, x, y)?;
                if let Some(name) = self.soldier.take_firemode_request() {
                    self.select_firemode(&name, true)?;
                }
            },
            Step::SelectFiremode { name, scheduled } => self.select_firemode(name, *scheduled)?,
            Step::Aim { x, y } => self.aim = (*x, *y),
            Step::Reload => {
                self.soldier.request_reload();
                self.firearm.start_reload(&mut self.soldier, user, x, y, true)?;
                if !self.firearm.is_reloading() {
                    debug!("Nothing to reload");
                    self.soldier.clear_reload_request();
                }
            },
            Step::Lock { ticks } => self.firearm.lock_weapon(*ticks),
            Step::Unlock => self.firearm.unlock_weapon(),
            Step::Stance {
                name,
                channel,
                forced,
            } => {
                if !self.soldier.set_stance(name, *channel, *forced)? {
                    debug!(stance = %name, channel, "Stance change refused");
                }
            },
        }
        self.collect_events();
        Ok(())
    }

    /// Summarize the run so far.
    pub fn report(&self) -> SimResult<SimReport> {
        Ok(SimReport {
            weapon: self.weapon.clone(),
            firemode: self.firearm.firemode()?.name.clone(),
            ticks: self.ticks,
            truncated: self.truncated,
            stats: self.soldier.stats(),
            targets: self
                .soldier
                .arena()
                .targets()
                .iter()
                .map(|t| TargetReport {
                    name: t.spec.name.clone(),
                    health: t.health,
                    noticed: t.noticed,
                })
                .collect(),
            events: self.events.len(),
        })
    }

    fn exhausted(&self) -> bool {
        self.ticks >= u64::from(self.config.max_ticks)
    }

    fn frame(&mut self) -> SimResult<()> {
        let before = self.firearm.selected_firemode();
        self.firearm.tick(&mut self.soldier)?;
        self.soldier.tick();
        self.ticks += 1;
        self.announce_firemode(before)?;
        self.collect_events();
        Ok(())
    }

    fn select_firemode(&mut self, name: &str, scheduled: bool) -> SimResult<()> {
        let index = self
            .firearm
            .firemode_index_by_name(name)
            .ok_or_else(|| SimError::UnknownFiremode(name.to_string()))?;
        let before = self.firearm.selected_firemode();
        let switched = if scheduled {
            self.firearm.schedule_set_firemode(&self.soldier, index)?
        } else {
            self.firearm.set_firemode(&self.soldier, index, false)?
        };
        if !switched && self.firearm.scheduled_firemode().is_none() {
            debug!(firemode = name, "Fire mode change refused");
        }
        self.announce_firemode(before)
    }

    fn announce_firemode(&self, before: usize) -> SimResult<()> {
        if self.firearm.selected_firemode() != before {
            self.bus.publish(FirearmEvent::FiremodeChanged {
                weapon: self.firearm.id(),
                firemode: self.firearm.firemode()?.name.clone(),
            });
        }
        Ok(())
    }

    fn collect_events(&mut self) {
        for event in self.bus.drain() {
            debug!(?event, "Event");
            self.events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::weapon_loader::WeaponLoader;
    use shooter_gameplay::ProcessKind;

    const WEAPONS: &str = r#"
        [[weapons]]
        name = "Carbine"
        primary_firemode = "Single"
        secondary_firemode = "Burst"

        [[weapons.ammo]]
        id = "StandardAmmo"
        magazine = 30
        reserve = 60

        [[weapons.firemodes]]
        name = "Single"
        mode = "single"
        ammo_id = "StandardAmmo"
        delay_recover = 8

        [[weapons.firemodes]]
        name = "Burst"
        mode = "burst"
        burst = 3
        ammo_id = "StandardAmmo"
        delay_recover = 2
        delay_cooldown = 20

        [[weapons]]
        name = "Scout"

        [[weapons.ammo]]
        id = "Rounds"
        magazine = 1
        reserve = 1

        [[weapons.firemodes]]
        name = "Bolt"
        ammo_id = "Rounds"
        delay_recover = 3
        delay_reload = 5
    "#;

    fn run(scenario: &str, config: SimConfig) -> (Simulation, SimReport) {
        let mut loader = WeaponLoader::new("unused");
        loader.load_str(WEAPONS).expect("valid weapons");
        let scenario = Scenario::from_toml(scenario).expect("valid scenario");
        let mut sim = Simulation::new(config, loader.registry(), &scenario).expect("known weapon");
        let report = sim.run(&scenario.steps).expect("scenario runs");
        (sim, report)
    }

    fn seeded() -> SimConfig {
        SimConfig {
            seed: Some(3),
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_alt_press_switches_to_burst() {
        let (sim, report) = run(
            r#"
            weapon = "Carbine"

            [[targets]]
            name = "Dummy"
            position = [600, 474]
            health = 25

            [[steps]]
            action = "alt_press"

            [[steps]]
            action = "press"
            hold = 2

            [[steps]]
            action = "wait"
            ticks = 30
            "#,
            seeded(),
        );

        assert_eq!(report.firemode, "Burst");
        assert_eq!(report.stats.shots, 3);
        assert_eq!(report.stats.hits, 3);
        assert_eq!(report.stats.kills, 1);
        assert_eq!(report.targets[0].health, 0);
        assert_eq!(sim.soldier().magazine().count("StandardAmmo"), 27);
        assert!(sim
            .events()
            .iter()
            .any(|e| matches!(e, FirearmEvent::FiremodeChanged { firemode, .. } if firemode == "Burst")));
        assert!(sim.events().iter().any(|e| matches!(
            e,
            FirearmEvent::ProcessStarted {
                kind: ProcessKind::Cooldown,
                ..
            }
        )));
    }

    #[test]
    fn test_scheduled_switch_waits_for_recovery() {
        let (sim, report) = run(
            r#"
            weapon = "Carbine"

            [[steps]]
            action = "press"
            hold = 2

            [[steps]]
            action = "select_firemode"
            name = "Burst"
            scheduled = true

            [[steps]]
            action = "wait"
            ticks = 10
            "#,
            seeded(),
        );

        assert_eq!(report.stats.shots, 1);
        assert_eq!(report.stats.misses, 1);
        assert_eq!(report.firemode, "Burst");
        assert_eq!(sim.firearm().scheduled_firemode(), None);
    }

    #[test]
    fn test_reload_from_reserve() {
        let (sim, report) = run(
            r#"
            weapon = "Scout"

            [[steps]]
            action = "press"
            hold = 2

            [[steps]]
            action = "wait"
            ticks = 5

            [[steps]]
            action = "press"
            hold = 10

            [[steps]]
            action = "press"
            hold = 2
            "#,
            seeded(),
        );

        assert_eq!(report.stats.shots, 2);
        assert_eq!(report.stats.reloads, 1);
        assert_eq!(sim.soldier().magazine().count("Rounds"), 0);
        assert_eq!(sim.soldier().reserve().count("Rounds"), 0);
        assert_eq!(report.ticks, 19);
    }

    #[test]
    fn test_locked_weapon_holds_fire() {
        let (_, report) = run(
            r#"
            weapon = "Carbine"

            [[steps]]
            action = "lock"
            ticks = 0

            [[steps]]
            action = "press"
            hold = 3

            [[steps]]
            action = "unlock"

            [[steps]]
            action = "press"
            hold = 3
            "#,
            seeded(),
        );

        assert_eq!(report.stats.shots, 1);
    }

    #[test]
    fn test_wall_stops_bullets() {
        let (_, report) = run(
            r#"
            weapon = "Carbine"

            [[walls]]
            x = 300
            y = 0
            width = 20
            height = 500

            [[targets]]
            name = "Hidden"
            position = [500, 474]

            [[steps]]
            action = "press"
            hold = 2
            "#,
            seeded(),
        );

        assert_eq!(report.stats.ground_hits, 1);
        assert_eq!(report.targets[0].health, 100);
    }

    #[test]
    fn test_tick_budget_truncates() {
        let config = SimConfig {
            max_ticks: 5,
            ..seeded()
        };
        let (_, report) = run(
            r#"
            weapon = "Carbine"

            [[steps]]
            action = "wait"
            ticks = 100

            [[steps]]
            action = "press"
            hold = 2
            "#,
            config,
        );

        assert_eq!(report.ticks, 5);
        assert!(report.truncated);
        assert_eq!(report.stats.shots, 0);
    }

    #[test]
    fn test_shipped_range_drill() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
        let mut loader = WeaponLoader::new(assets.join("weapons"));
        assert_eq!(loader.load_all().expect("weapon directory"), 3);
        let scenario = Scenario::load(&assets.join("scenarios").join("range.toml")).expect("valid scenario");

        let mut sim = Simulation::new(seeded(), loader.registry(), &scenario).expect("known weapon");
        let report = sim.run(&scenario.steps).expect("scenario runs");

        assert_eq!(report.firemode, "Braced");
        assert!(report.stats.shots > 5);
        assert_eq!(report.stats.reloads, 1);
        assert_eq!(sim.soldier().reserve().count("StandardAmmo"), 85);
        assert_eq!(
            sim.soldier().magazine().count("StandardAmmo") + report.stats.shots - 5,
            30
        );
        assert!(!report.truncated);
    }

    #[test]
    fn test_unknown_firemode_is_an_error() {
        let mut loader = WeaponLoader::new("unused");
        loader.load_str(WEAPONS).expect("valid weapons");
        let scenario = Scenario::from_toml(
            "weapon = \"Carbine\"\n[[steps]]\naction = \"select_firemode\"\nname = \"Auto\"",
        )
        .expect("valid scenario");
        let mut sim = Simulation::new(seeded(), loader.registry(), &scenario).expect("known weapon");

        assert!(matches!(
            sim.run(&scenario.steps),
            Err(SimError::UnknownFiremode(_))
        ));
    }

    #[test]
    fn test_unknown_weapon() {
        let loader = WeaponLoader::new("unused");
        let scenario =
            Scenario::from_toml("weapon = \"Lance\"\n[[steps]]\naction = \"reload\"").expect("valid scenario");
        assert!(matches!(
            Simulation::new(seeded(), loader.registry(), &scenario),
            Err(SimError::Weapon(WeaponLoadError::UnknownWeapon(_)))
        ));
    }
}

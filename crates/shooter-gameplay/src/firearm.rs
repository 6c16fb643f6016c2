//! The firearm fire cycle.
//!
//! A [`Firearm`] owns its fire modes and the timed processes gating each
//! shot: charge, recovery, cooldown, reload and the weapon lock. Inputs
//! arrive through the control surface (see `control.rs`); time advances
//! through [`Firearm::tick`]. Everything the weapon cannot decide on its
//! own is asked of a [`FirearmHost`].
//!
//! # Tick model
//!
//! Inputs for a frame are processed before that frame's tick. A process
//! started by an input counts the tick that follows, so a process with
//! delay `D` blocks exactly `D` ticks and completes on tick `D + 1`.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use shooter_common::{angles, EntityId};
use thiserror::Error;
use tracing::{debug, trace};

use crate::effects::{ProcessEffect, ProcessKind, WeaponLock};
use crate::firemode::{AnimationSet, FireMode, FireModeError, FireModeKind};
use crate::host::FirearmHost;
use crate::projectile::ProjectileShot;

/// Errors raised by contract violations on a firearm.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirearmError {
    /// An operation needing a user was called without one.
    #[error("no user given")]
    MissingUser,
    /// Fire-mode index outside the registry.
    #[error("fire mode index {index} out of range (have {len})")]
    FiremodeOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of registered fire modes.
        len: usize,
    },
    /// Inconsistent fire-mode data.
    #[error("invalid fire mode: {0}")]
    InvalidFireMode(#[from] FireModeError),
}

/// Result type for firearm operations.
pub type FirearmResult<T> = Result<T, FirearmError>;

/// Per-weapon settings that do not depend on the fire mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirearmSettings {
    /// Pressing the trigger starts aiming; single and burst shots fire on
    /// release instead of on hold.
    pub aim_on_use_start: bool,
    /// Vertical pivot offset used for the displayed aim angle.
    pub gfx_offset_y: i32,
}

impl Default for FirearmSettings {
    fn default() -> Self {
        Self {
            aim_on_use_start: true,
            gfx_offset_y: -6,
        }
    }
}

/// A weapon with fire modes and timed fire-cycle processes.
#[derive(Debug)]
pub struct Firearm {
    id: EntityId,
    settings: FirearmSettings,

    firemodes: Vec<Arc<FireMode>>,
    default_firemode: Arc<FireMode>,
    selected_firemode: usize,
    scheduled_firemode: Option<usize>,

    is_using: bool,
    shot_counter: AHashMap<String, u32>,

    charge: Option<ProcessEffect>,
    recovery: Option<ProcessEffect>,
    cooldown: Option<ProcessEffect>,
    reload: Option<ProcessEffect>,
    lock: Option<WeaponLock>,

    rng: fastrand::Rng,
}

impl Firearm {
    /// A weapon with the default fire mode as its only mode.
    #[must_use]
    pub fn new(settings: FirearmSettings) -> Self {
        let default_firemode = Arc::new(FireMode::default());
        Self {
            id: EntityId::new(),
            settings,
            firemodes: vec![Arc::clone(&default_firemode)],
            default_firemode,
            selected_firemode: 0,
            scheduled_firemode: None,
            is_using: false,
            shot_counter: AHashMap::new(),
            charge: None,
            recovery: None,
            cooldown: None,
            reload: None,
            lock: None,
            rng: fastrand::Rng::new(),
        }
    }

    /// A weapon with the given fire modes.
    pub fn with_firemodes<I>(settings: FirearmSettings, firemodes: I) -> FirearmResult<Self>
    where
        I: IntoIterator<Item = Arc<FireMode>>,
    {
        let mut firearm = Self::new(settings);
        firearm.clear_firemodes();
        for firemode in firemodes {
            firearm.add_firemode(firemode)?;
        }
        Ok(firearm)
    }

    /// Use a fixed random seed for projectile sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    /// Weapon identity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Weapon settings.
    #[must_use]
    pub fn settings(&self) -> &FirearmSettings {
        &self.settings
    }

    /// Whether the trigger is currently held.
    #[must_use]
    pub fn is_using(&self) -> bool {
        self.is_using
    }

    /// Mark the weapon as no longer in use.
    pub fn cancel_using(&mut self) {
        self.is_using = false;
    }

    /// Shots fired in a fire mode since its burst counter was last reset.
    #[must_use]
    pub fn shot_count(&self, firemode_name: &str) -> u32 {
        self.shot_counter.get(firemode_name).copied().unwrap_or(0)
    }

    // ========================================================================
    // Fire-mode registry
    // ========================================================================

    /// All registered fire modes.
    #[must_use]
    pub fn firemodes(&self) -> &[Arc<FireMode>] {
        &self.firemodes
    }

    /// Fire mode at `index`.
    pub fn firemode_at(&self, index: usize) -> FirearmResult<&Arc<FireMode>> {
        self.firemodes
            .get(index)
            .ok_or(FirearmError::FiremodeOutOfRange {
                index,
                len: self.firemodes.len(),
            })
    }

    /// The selected fire mode.
    pub fn firemode(&self) -> FirearmResult<Arc<FireMode>> {
        self.firemode_at(self.selected_firemode).map(Arc::clone)
    }

    /// Index of the selected fire mode.
    #[must_use]
    pub fn selected_firemode(&self) -> usize {
        self.selected_firemode
    }

    /// Register a fire mode. Returns its index.
    pub fn add_firemode(&mut self, firemode: impl Into<Arc<FireMode>>) -> FirearmResult<usize> {
        let firemode = firemode.into();
        firemode.validate()?;
        self.firemodes.push(firemode);
        Ok(self.firemodes.len() - 1)
    }

    /// Remove all fire modes.
    pub fn clear_firemodes(&mut self) {
        self.firemodes.clear();
        self.selected_firemode = 0;
        self.scheduled_firemode = None;
    }

    /// A fresh copy of the default fire mode, optionally registered.
    pub fn create_firemode(&mut self, add: bool) -> Arc<FireMode> {
        let firemode = Arc::new(FireMode::clone(&self.default_firemode));
        if add {
            self.firemodes.push(Arc::clone(&firemode));
        }
        firemode
    }

    /// The template new fire modes are copied from.
    #[must_use]
    pub fn default_firemode(&self) -> &Arc<FireMode> {
        &self.default_firemode
    }

    /// Writable access to the fire mode at `index`.
    ///
    /// A fire mode still shared with another weapon or a running process is
    /// copied first, so writes never leak into other holders.
    pub fn make_firemode_writable(&mut self, index: usize) -> FirearmResult<&mut FireMode> {
        let len = self.firemodes.len();
        self.firemodes
            .get_mut(index)
            .map(Arc::make_mut)
            .ok_or(FirearmError::FiremodeOutOfRange { index, len })
    }

    /// Whether `firemode`'s availability condition holds.
    pub fn is_firemode_available<H: FirearmHost + ?Sized>(&self, host: &H, firemode: &FireMode) -> bool {
        firemode
            .condition
            .as_deref()
            .map_or(true, |condition| host.firemode_condition(condition))
    }

    /// Indexes and fire modes whose conditions currently hold.
    pub fn available_firemodes<H: FirearmHost + ?Sized>(&self, host: &H) -> Vec<(usize, Arc<FireMode>)> {
        self.firemodes
            .iter()
            .enumerate()
            .filter(|(_, firemode)| self.is_firemode_available(host, firemode))
            .map(|(index, firemode)| (index, Arc::clone(firemode)))
            .collect()
    }

    /// Index of the exact fire mode instance, optionally among available ones only.
    pub fn firemode_index<H: FirearmHost + ?Sized>(
        &self,
        host: &H,
        firemode: &Arc<FireMode>,
        available_only: bool,
    ) -> Option<usize> {
        self.firemodes.iter().position(|candidate| {
            Arc::ptr_eq(candidate, firemode)
                && (!available_only || self.is_firemode_available(host, candidate))
        })
    }

    /// Index of the first fire mode with the given name.
    #[must_use]
    pub fn firemode_index_by_name(&self, name: &str) -> Option<usize> {
        self.firemodes.iter().position(|firemode| firemode.name == name)
    }

    /// Whether switching fire modes is allowed right now.
    #[must_use]
    pub fn can_change_firemode(&self) -> bool {
        !self.is_recovering() && !self.is_charging() && !self.is_reloading() && !self.is_weapon_locked()
    }

    /// Select a fire mode. Without `force` the switch needs the weapon idle
    /// and the fire mode available.
    pub fn set_firemode<H: FirearmHost + ?Sized>(
        &mut self,
        host: &H,
        index: usize,
        force: bool,
    ) -> FirearmResult<bool> {
        let firemode = Arc::clone(self.firemode_at(index)?);
        if force || (self.can_change_firemode() && self.is_firemode_available(host, &firemode)) {
            if self.selected_firemode != index {
                debug!(weapon = %self.id, from = self.selected_firemode, to = index, name = %firemode.name, "Fire mode changed");
            }
            self.selected_firemode = index;
            return Ok(true);
        }
        Ok(false)
    }

    /// Select a fire mode now if possible, otherwise as soon as the weapon
    /// allows it. Returns `true` if the switch happened immediately.
    pub fn schedule_set_firemode<H: FirearmHost + ?Sized>(
        &mut self,
        host: &H,
        index: usize,
    ) -> FirearmResult<bool> {
        self.firemode_at(index)?;
        if self.can_change_firemode() {
            self.scheduled_firemode = None;
            return self.set_firemode(host, index, false);
        }
        debug!(weapon = %self.id, index, "Fire mode change scheduled");
        self.scheduled_firemode = Some(index);
        Ok(false)
    }

    /// Pending scheduled fire-mode switch.
    #[must_use]
    pub fn scheduled_firemode(&self) -> Option<usize> {
        self.scheduled_firemode
    }

    /// Drop a pending scheduled switch.
    pub fn reset_scheduled_firemode(&mut self) {
        self.scheduled_firemode = None;
    }

    /// Animations for the selected fire mode.
    pub fn animation_set(&self) -> FirearmResult<AnimationSet> {
        Ok(self.firemode()?.animation_set())
    }

    // ========================================================================
    // State queries
    // ========================================================================

    /// Whether a charge is running.
    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.charge.is_some()
    }

    /// Whether the weapon is recovering from a shot.
    #[must_use]
    pub fn is_recovering(&self) -> bool {
        self.recovery.is_some()
    }

    /// Whether a cooldown is running.
    #[must_use]
    pub fn is_cooling_down(&self) -> bool {
        self.cooldown.is_some()
    }

    /// Whether a reload is running.
    #[must_use]
    pub fn is_reloading(&self) -> bool {
        self.reload.is_some()
    }

    /// Whether the weapon is locked.
    #[must_use]
    pub fn is_weapon_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Whether nothing stands between the trigger and a shot.
    #[must_use]
    pub fn is_ready_to_fire(&self) -> bool {
        !self.is_recovering() && !self.is_cooling_down() && !self.is_weapon_locked()
    }

    /// Charge progress in percent.
    #[must_use]
    pub fn charge_progress(&self) -> Option<u32> {
        self.charge.as_ref().map(|e| e.timer().percentage())
    }

    /// Recovery progress in percent.
    #[must_use]
    pub fn recovery_progress(&self) -> Option<u32> {
        self.recovery.as_ref().map(|e| e.timer().percentage())
    }

    /// Cooldown progress in percent.
    #[must_use]
    pub fn cooldown_progress(&self) -> Option<u32> {
        self.cooldown.as_ref().map(|e| e.timer().percentage())
    }

    /// Reload progress in percent.
    #[must_use]
    pub fn reload_progress(&self) -> Option<u32> {
        self.reload.as_ref().map(|e| e.timer().percentage())
    }

    /// Whether a running charge has completed.
    #[must_use]
    pub fn is_charged(&self) -> bool {
        self.charge.as_ref().is_some_and(ProcessEffect::is_completed)
    }

    /// Whether the trigger fires while held in the selected mode.
    pub fn fire_on_holding(&self) -> FirearmResult<bool> {
        let firemode = self.firemode()?;
        Ok(!self.settings.aim_on_use_start || firemode.mode == FireModeKind::Auto)
    }

    /// Whether the trigger fires on release in the selected mode.
    pub fn fire_on_stopping(&self) -> FirearmResult<bool> {
        let firemode = self.firemode()?;
        Ok(self.settings.aim_on_use_start && firemode.mode != FireModeKind::Auto)
    }

    /// Whether the host refuses use right now.
    pub fn reject_use<H: FirearmHost + ?Sized>(&self, host: &H, user: EntityId) -> bool {
        !host.is_weapon_ready_to_use(user) || !host.is_user_ready_to_use(user)
    }

    /// Displayed aim angle for relative target `(x, y)`.
    #[must_use]
    pub fn aim_angle(&self, x: i32, y: i32) -> i32 {
        angles::aim_angle(self.settings.gfx_offset_y, x, y)
    }

    /// Launch angle for relative target `(x, y)` in `firemode`.
    #[must_use]
    pub fn fire_angle(&self, x: i32, y: i32, firemode: &FireMode) -> i32 {
        angles::aim_angle(firemode.projectile_offset_y, x, y)
    }

    // ========================================================================
    // Weapon lock
    // ========================================================================

    /// Block firing for `frames`, or until [`unlock_weapon`](Self::unlock_weapon)
    /// if `frames` is zero. Locking again replaces the current lock.
    pub fn lock_weapon(&mut self, frames: u32) {
        debug!(weapon = %self.id, frames, "Weapon locked");
        self.lock = Some(WeaponLock::new(frames));
    }

    /// Lift the weapon lock.
    pub fn unlock_weapon(&mut self) {
        if self.lock.take().is_some() {
            debug!(weapon = %self.id, "Weapon unlocked");
        }
    }

    // ========================================================================
    // Fire cycle
    // ========================================================================

    /// One attempt to fire at relative target `(x, y)`.
    ///
    /// Points the user's aim, marks the weapon in use if `pressing`, and
    /// fires once if the weapon is ready and no reload or charge intervenes.
    pub fn do_fire_cycle<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
        pressing: bool,
    ) -> FirearmResult<()> {
        ensure_user(user)?;

        host.set_aim_position(user, self.aim_angle(x, y));
        if pressing {
            self.is_using = true;
        }

        if self.is_ready_to_fire()
            && !self.start_reload(host, user, x, y, false)?
            && !self.start_charge(host, user, x, y)?
            && (self.fire_on_holding()? || !pressing)
        {
            self.fire(host, user, x, y)?;
        }
        Ok(())
    }

    /// Fire the selected fire mode once, or report missing ammunition.
    pub fn fire<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<()> {
        ensure_user(user)?;
        let firemode = self.firemode()?;

        if !host.has_ammo(&firemode) {
            debug!(weapon = %self.id, firemode = %firemode.name, "Out of ammo");
            host.on_no_ammo(user, &firemode);
            return Ok(());
        }

        let angle = self.fire_angle(x, y, &firemode);
        host.fire_sound(user, &firemode);
        host.fire_effect(user, angle, &firemode);
        self.fire_projectiles(host, user, angle, &firemode);
        self.fire_recovery(host, user, x, y, firemode)
    }

    /// Launch the projectiles of one shot at `angle`.
    pub fn fire_projectiles<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        angle: i32,
        firemode: &FireMode,
    ) {
        let (base_x, base_y) = host.weapon_offset(user).unwrap_or((0, 0));
        let offset = (
            angles::sin(angle, firemode.projectile_distance) + base_x,
            -angles::cos(angle, firemode.projectile_distance) + base_y + firemode.projectile_offset_y,
        );
        let deviation = firemode.total_deviation();
        let amount = host.projectile_amount(firemode).max(1);

        for _ in 0..amount {
            let mut shot = ProjectileShot {
                shooter: user,
                weapon: self.id,
                projectile_id: firemode.projectile_id.clone(),
                offset,
                angle,
                speed: firemode.projectile_speed.sample(&mut self.rng),
                range: firemode.projectile_range.sample(&mut self.rng),
                damage: firemode.damage,
                damage_type: firemode.damage_type.clone(),
                deviation,
            };
            host.on_fire_projectile(user, &mut shot, firemode);
            host.launch_projectile(user, shot);
        }

        let count = self.shot_counter.entry(firemode.name.clone()).or_insert(0);
        *count += 1;
        debug!(weapon = %self.id, firemode = %firemode.name, angle, amount, shots = *count, "Fired");

        host.handle_ammo_usage(firemode);
    }

    // ========================================================================
    // Charge
    // ========================================================================

    /// Start or continue charging. Returns `true` while the charge holds
    /// fire back.
    ///
    /// A completed charge releases exactly one shot; after that it keeps
    /// blocking until the weapon is released.
    pub fn start_charge<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        let firemode = self.firemode()?;
        if !self.is_using || firemode.delay_charge < 1 || !host.needs_charge(user, &firemode) {
            return Ok(false);
        }

        if let Some(effect) = &mut self.charge {
            if effect.matches(user, &firemode) {
                effect.set_aim(x, y);
                if effect.is_consumed() {
                    return Ok(false);
                }
                if effect.is_completed() {
                    effect.consume();
                    return Ok(!host.do_charge(user, x, y, &firemode));
                }
                return Ok(true);
            }
            self.cancel_charge(host, x, y, false);
        }

        debug!(weapon = %self.id, firemode = %firemode.name, delay = firemode.delay_charge, "Charge started");
        self.charge = Some(ProcessEffect::new(
            ProcessKind::Charge,
            user,
            Arc::clone(&firemode),
            firemode.delay_charge,
            (x, y),
        ));
        host.on_start_charge(user, x, y, &firemode);
        Ok(true)
    }

    /// Stop a running charge.
    pub fn cancel_charge<H: FirearmHost + ?Sized>(&mut self, host: &mut H, x: i32, y: i32, callback: bool) {
        if let Some(effect) = self.charge.take() {
            debug!(weapon = %self.id, "Charge cancelled");
            if callback {
                host.on_cancel_charge(effect.user(), x, y, effect.firemode());
            }
        }
    }

    // ========================================================================
    // Recovery
    // ========================================================================

    /// Start the pause after a shot.
    pub fn fire_recovery<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
        firemode: Arc<FireMode>,
    ) -> FirearmResult<()> {
        let delay = if host.needs_recovery(user, &firemode) {
            firemode.delay_recover
        } else {
            1
        };

        if delay == 0 {
            return self.do_recovery(host, user, x, y, &firemode);
        }

        trace!(weapon = %self.id, delay, "Recovery started");
        self.recovery = Some(ProcessEffect::new(
            ProcessKind::Recovery,
            user,
            firemode,
            delay,
            (x, y),
        ));
        Ok(())
    }

    /// Drop a running recovery.
    pub fn cancel_recovery(&mut self) {
        self.recovery = None;
    }

    /// Recovery finished: continue a burst or move on to the cooldown.
    pub fn do_recovery<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
        firemode: &FireMode,
    ) -> FirearmResult<()> {
        host.on_recovery(user, firemode);

        if firemode.burst > 0 {
            if firemode.mode != FireModeKind::Burst {
                return Err(FireModeError::BurstWithoutBurstMode(firemode.name.clone()).into());
            }
            if self.shot_count(&firemode.name) >= firemode.burst {
                self.shot_counter.insert(firemode.name.clone(), 0);
            } else {
                if !self.is_using {
                    self.cancel_recovery();
                    self.do_fire_cycle(host, user, x, y, false)?;
                }
                return Ok(());
            }
        }

        self.check_cooldown(host, user, firemode);
        Ok(())
    }

    // ========================================================================
    // Cooldown
    // ========================================================================

    /// End of a use: drop the use flag if the weapon cannot keep going and
    /// start the cooldown unless an automatic weapon is still held.
    pub fn check_cooldown<H: FirearmHost + ?Sized>(&mut self, host: &mut H, user: EntityId, firemode: &FireMode) {
        if !host.has_ammo(firemode) || self.reject_use(host, user) {
            self.cancel_using();
        }
        if firemode.mode != FireModeKind::Auto || !self.is_using {
            self.start_cooldown(host, user, firemode);
        }
    }

    /// Start the cooldown, or skip it if none is needed.
    pub fn start_cooldown<H: FirearmHost + ?Sized>(&mut self, host: &mut H, user: EntityId, firemode: &FireMode) {
        if firemode.delay_cooldown < 1 || !host.needs_cooldown(user, firemode) {
            host.on_skip_cooldown(user, firemode);
            return;
        }
        if self.cooldown.is_none() {
            debug!(weapon = %self.id, delay = firemode.delay_cooldown, "Cooldown started");
            self.cooldown = Some(ProcessEffect::new(
                ProcessKind::Cooldown,
                user,
                Arc::new(firemode.clone()),
                firemode.delay_cooldown,
                (0, 0),
            ));
            host.on_start_cooldown(user, firemode);
        }
    }

    // ========================================================================
    // Reload
    // ========================================================================

    /// Start or continue a reload. Returns `true` while reloading holds
    /// fire back.
    pub fn start_reload<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
        forced: bool,
    ) -> FirearmResult<bool> {
        let firemode = self.firemode()?;
        if (!self.is_using && !forced) || !host.needs_reload(user, &firemode) {
            return Ok(false);
        }

        if let Some(effect) = &mut self.reload {
            if effect.matches(user, &firemode) {
                effect.set_aim(x, y);
                return Ok(true);
            }
            self.cancel_reload(host, x, y, &firemode, false);
        }

        if host.can_reload(user, &firemode) {
            debug!(weapon = %self.id, firemode = %firemode.name, delay = firemode.delay_reload, "Reload started");
            self.reload = Some(ProcessEffect::new(
                ProcessKind::Reload,
                user,
                Arc::clone(&firemode),
                firemode.delay_reload,
                (x, y),
            ));
            host.on_start_reload(user, x, y, &firemode);
        }
        Ok(true)
    }

    /// Cancel a running reload. Automatic reloads survive the user letting go.
    pub fn cancel_reload<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        x: i32,
        y: i32,
        firemode: &FireMode,
        requested_by_user: bool,
    ) {
        let Some(effect) = &self.reload else {
            return;
        };
        host.on_cancel_reload(effect.user(), x, y, effect.firemode(), requested_by_user);
        if !(firemode.auto_reload && requested_by_user) {
            debug!(weapon = %self.id, requested_by_user, "Reload cancelled");
            self.reload = None;
        }
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Advance every running process by one frame.
    pub fn tick<H: FirearmHost + ?Sized>(&mut self, host: &mut H) -> FirearmResult<()> {
        self.tick_charge(host);
        self.tick_reload(host);
        self.tick_recovery(host)?;
        self.tick_cooldown(host);
        self.tick_lock();
        self.tick_scheduled_firemode(host)
    }

    fn tick_charge<H: FirearmHost + ?Sized>(&mut self, host: &mut H) {
        let Some(effect) = &mut self.charge else {
            return;
        };
        if effect.is_completed() {
            return;
        }
        effect.timer_mut().advance();
        let timer = *effect.timer();
        if timer.progress() > 0 {
            let (x, y) = effect.aim();
            host.on_progress_charge(effect.user(), x, y, effect.firemode(), timer.percentage(), timer.progress());
            effect.timer_mut().acknowledge();
        }
        if timer.is_elapsed() {
            trace!(weapon = %self.id, "Charge complete");
            effect.complete();
        }
    }

    fn tick_reload<H: FirearmHost + ?Sized>(&mut self, host: &mut H) {
        let Some(effect) = &mut self.reload else {
            return;
        };
        effect.timer_mut().advance();
        let timer = *effect.timer();
        let (x, y) = effect.aim();
        if timer.is_elapsed() && host.do_reload(effect.user(), x, y, effect.firemode()) {
            debug!(weapon = %self.id, "Reload finished");
            self.reload = None;
            return;
        }
        if timer.progress() > 0 {
            host.on_progress_reload(effect.user(), x, y, effect.firemode(), timer.percentage(), timer.progress());
            effect.timer_mut().acknowledge();
        }
    }

    fn tick_recovery<H: FirearmHost + ?Sized>(&mut self, host: &mut H) -> FirearmResult<()> {
        let Some(effect) = &mut self.recovery else {
            return Ok(());
        };
        effect.timer_mut().advance();
        if !effect.timer().is_elapsed() {
            return Ok(());
        }
        let Some(effect) = self.recovery.take() else {
            return Ok(());
        };
        let (x, y) = effect.aim();
        trace!(weapon = %self.id, "Recovery finished");
        self.do_recovery(host, effect.user(), x, y, effect.firemode())
    }

    fn tick_cooldown<H: FirearmHost + ?Sized>(&mut self, host: &mut H) {
        let Some(effect) = &mut self.cooldown else {
            return;
        };
        effect.timer_mut().advance();
        if !effect.timer().is_elapsed() {
            return;
        }
        if let Some(effect) = self.cooldown.take() {
            debug!(weapon = %self.id, "Cooldown finished");
            host.on_finish_cooldown(effect.user(), effect.firemode());
        }
    }

    fn tick_lock(&mut self) {
        if let Some(lock) = &mut self.lock {
            if lock.advance() {
                self.unlock_weapon();
            }
        }
    }

    fn tick_scheduled_firemode<H: FirearmHost + ?Sized>(&mut self, host: &H) -> FirearmResult<()> {
        if let Some(index) = self.scheduled_firemode {
            if self.can_change_firemode() {
                self.scheduled_firemode = None;
                self.set_firemode(host, index, false)?;
            }
        }
        Ok(())
    }
}

/// Reject operations without a user.
pub(crate) fn ensure_user(user: EntityId) -> FirearmResult<()> {
    if user.is_valid() {
        Ok(())
    } else {
        Err(FirearmError::MissingUser)
    }
}

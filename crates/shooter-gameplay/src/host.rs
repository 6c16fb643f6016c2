//! Host integration for firearms.
//!
//! A [`Firearm`](crate::firearm::Firearm) owns the fire cycle but nothing
//! else: aiming, ammunition, spawning projectiles, sounds and animations
//! all belong to whoever embeds it. [`FirearmHost`] is that boundary.
//!
//! Every method has a default, so a host overrides only what it cares
//! about. Conditions default to permissive values and callbacks do nothing.
//! The `on_*_use` hooks on the control surface return `true` to replace
//! the default handling of that input.

use shooter_common::EntityId;

use crate::firemode::FireMode;
use crate::projectile::ProjectileShot;

/// Callbacks and conditions a firearm consults while running.
#[allow(unused_variables)]
pub trait FirearmHost {
    // ------------------------------------------------------------------
    // Aiming
    // ------------------------------------------------------------------

    /// Whether `user` is currently aiming.
    fn is_aiming(&self, user: EntityId) -> bool {
        false
    }

    /// Put `user` into aiming mode.
    fn start_aim(&mut self, user: EntityId) {}

    /// Leave aiming mode. Returns the final aim angle in degrees if the
    /// user was aiming.
    fn stop_aim(&mut self, user: EntityId) -> Option<i32> {
        None
    }

    /// The weapon pointed `user`'s aim at `angle` degrees.
    fn set_aim_position(&mut self, user: EntityId, angle: i32) {}

    /// Muzzle pivot offset of the weapon relative to `user`, if any.
    fn weapon_offset(&self, user: EntityId) -> Option<(i32, i32)> {
        None
    }

    // ------------------------------------------------------------------
    // Control overrides
    // ------------------------------------------------------------------

    /// Trigger pressed. Return `true` to skip the default handling.
    fn on_press_use(&mut self, user: EntityId, x: i32, y: i32) -> bool {
        false
    }

    /// Trigger held. Return `true` to skip the default handling.
    fn on_holding_use(&mut self, user: EntityId, x: i32, y: i32) -> bool {
        false
    }

    /// Trigger released. Return `true` to skip the default handling.
    fn on_use_stop(&mut self, user: EntityId, x: i32, y: i32) -> bool {
        false
    }

    /// Use cancelled. Return `true` to skip the default handling.
    fn on_use_cancel(&mut self, user: EntityId, x: i32, y: i32) -> bool {
        false
    }

    /// Alternate trigger pressed.
    fn on_press_use_alt(&mut self, user: EntityId, x: i32, y: i32) {}

    /// Alternate trigger held.
    fn on_holding_use_alt(&mut self, user: EntityId, x: i32, y: i32) {}

    /// Alternate trigger released.
    fn on_use_alt_stop(&mut self, user: EntityId, x: i32, y: i32) {}

    /// Alternate use cancelled.
    fn on_use_alt_cancel(&mut self, user: EntityId, x: i32, y: i32) {}

    // ------------------------------------------------------------------
    // Readiness
    // ------------------------------------------------------------------

    /// Whether the weapon itself can be used right now.
    fn is_weapon_ready_to_use(&self, user: EntityId) -> bool {
        true
    }

    /// Whether `user` is in a state to use the weapon.
    fn is_user_ready_to_use(&self, user: EntityId) -> bool {
        true
    }

    /// Evaluate a fire-mode availability condition by name.
    fn firemode_condition(&self, condition: &str) -> bool {
        false
    }

    // ------------------------------------------------------------------
    // Charge
    // ------------------------------------------------------------------

    /// Whether firing in `firemode` needs a charge first.
    fn needs_charge(&self, user: EntityId, firemode: &FireMode) -> bool {
        true
    }

    /// Spend a finished charge. Return `false` to hold fire.
    fn do_charge(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) -> bool {
        self.on_finish_charge(user, x, y, firemode);
        true
    }

    /// A charge started.
    fn on_start_charge(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) {}

    /// A charge finished and is being spent.
    fn on_finish_charge(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) {}

    /// Charge advanced to `percent`, `change` percent since the last report.
    fn on_progress_charge(
        &mut self,
        user: EntityId,
        x: i32,
        y: i32,
        firemode: &FireMode,
        percent: u32,
        change: u32,
    ) {
    }

    /// A charge was cancelled.
    fn on_cancel_charge(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) {}

    // ------------------------------------------------------------------
    // Firing
    // ------------------------------------------------------------------

    /// Whether a shot in `firemode` can be paid for.
    fn has_ammo(&self, firemode: &FireMode) -> bool {
        true
    }

    /// Pay for a shot in `firemode`.
    fn handle_ammo_usage(&mut self, firemode: &FireMode) {}

    /// The trigger was pulled without ammunition.
    fn on_no_ammo(&mut self, user: EntityId, firemode: &FireMode) {}

    /// Play the firing sound.
    fn fire_sound(&mut self, user: EntityId, firemode: &FireMode) {}

    /// Play muzzle effects for a shot at `angle`.
    fn fire_effect(&mut self, user: EntityId, angle: i32, firemode: &FireMode) {}

    /// Projectiles per shot.
    fn projectile_amount(&self, firemode: &FireMode) -> u32 {
        firemode.projectile_number
    }

    /// Adjust a projectile before launch.
    fn on_fire_projectile(&mut self, user: EntityId, shot: &mut ProjectileShot, firemode: &FireMode) {}

    /// Spawn a projectile.
    fn launch_projectile(&mut self, user: EntityId, shot: ProjectileShot) {}

    // ------------------------------------------------------------------
    // Recovery and cooldown
    // ------------------------------------------------------------------

    /// Whether shots in `firemode` need a recovery delay.
    fn needs_recovery(&self, user: EntityId, firemode: &FireMode) -> bool {
        true
    }

    /// Recovery after a shot ended.
    fn on_recovery(&mut self, user: EntityId, firemode: &FireMode) {}

    /// Whether a finished use in `firemode` needs a cooldown.
    fn needs_cooldown(&self, user: EntityId, firemode: &FireMode) -> bool {
        true
    }

    /// A cooldown started.
    fn on_start_cooldown(&mut self, user: EntityId, firemode: &FireMode) {}

    /// A cooldown finished.
    fn on_finish_cooldown(&mut self, user: EntityId, firemode: &FireMode) {}

    /// A cooldown was skipped because none was needed.
    fn on_skip_cooldown(&mut self, user: EntityId, firemode: &FireMode) {}

    // ------------------------------------------------------------------
    // Reload
    // ------------------------------------------------------------------

    /// Whether the weapon has to reload before firing in `firemode`.
    fn needs_reload(&self, user: EntityId, firemode: &FireMode) -> bool {
        false
    }

    /// Whether a reload can start now.
    fn can_reload(&self, user: EntityId, firemode: &FireMode) -> bool {
        true
    }

    /// Finish a reload. Return `false` to keep reloading.
    fn do_reload(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) -> bool {
        self.on_finish_reload(user, x, y, firemode);
        true
    }

    /// A reload started.
    fn on_start_reload(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) {}

    /// A reload finished.
    fn on_finish_reload(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) {}

    /// Reload advanced to `percent`, `change` percent since the last report.
    fn on_progress_reload(
        &mut self,
        user: EntityId,
        x: i32,
        y: i32,
        firemode: &FireMode,
        percent: u32,
        change: u32,
    ) {
    }

    /// A reload was cancelled, by the user letting go or by something else.
    fn on_cancel_reload(
        &mut self,
        user: EntityId,
        x: i32,
        y: i32,
        firemode: &FireMode,
        requested_by_user: bool,
    ) {
    }
}

/// Host that takes every default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHost;

impl FirearmHost for DefaultHost {}

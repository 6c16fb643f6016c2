//! Control surface of a firearm.
//!
//! Input handlers for the primary and alternate trigger. Each returns
//! whether the input was handled. Host overrides on [`FirearmHost`] get
//! the first chance at every primary input.

use shooter_common::{angles, EntityId};
use tracing::trace;

use crate::firearm::{ensure_user, Firearm, FirearmResult};
use crate::host::FirearmHost;

impl Firearm {
    /// Trigger pressed: start aiming if the weapon aims on use.
    pub fn control_use_start<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        if host.on_press_use(user, x, y) {
            return Ok(true);
        }
        if self.settings().aim_on_use_start && !host.is_aiming(user) {
            trace!(weapon = %self.id(), %user, "Aim started");
            host.start_aim(user);
        }
        Ok(true)
    }

    /// Trigger held: run one fire cycle.
    pub fn control_use_holding<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        if host.on_holding_use(user, x, y) {
            return Ok(true);
        }
        self.control_fire_holding(host, user, x, y)
    }

    /// Default hold handling. Releases the trigger if the host refuses use.
    pub fn control_fire_holding<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        if self.reject_use(host, user) {
            self.control_use_stop(host, user, x, y)?;
            return Ok(false);
        }
        if self.settings().aim_on_use_start && !host.is_aiming(user) {
            host.start_aim(user);
        }
        self.do_fire_cycle(host, user, x, y, true)?;
        Ok(true)
    }

    /// Trigger released: finish aiming, then wind the weapon down.
    pub fn control_use_stop<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        if host.on_use_stop(user, x, y) {
            return Ok(true);
        }

        if self.settings().aim_on_use_start {
            if let Some(angle) = host.stop_aim(user) {
                self.finished_aiming(host, user, angle)?;
            }
        }

        self.cancel_using();
        let firemode = self.firemode()?;
        self.cancel_charge(host, x, y, true);
        self.cancel_reload(host, x, y, &firemode, true);
        if !self.is_recovering() {
            self.check_cooldown(host, user, &firemode);
        }
        Ok(true)
    }

    /// Use cancelled: treated like a release unless the host takes over.
    pub fn control_use_cancel<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        if host.on_use_cancel(user, x, y) {
            return Ok(true);
        }
        self.control_use_stop(host, user, x, y)
    }

    /// Aiming ended at `angle`: fire-on-release weapons take their shot.
    pub fn finished_aiming<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        angle: i32,
    ) -> FirearmResult<()> {
        ensure_user(user)?;
        if !self.fire_on_stopping()?
            || !self.is_using()
            || !self.is_ready_to_fire()
            || self.reject_use(host, user)
        {
            return Ok(());
        }
        let (x, y) = angles::aim_vector(angle, 1000);
        self.do_fire_cycle(host, user, x, y, false)
    }

    /// Alternate trigger pressed.
    pub fn control_use_alt_start<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        host.on_press_use_alt(user, x, y);
        Ok(true)
    }

    /// Alternate trigger held.
    pub fn control_use_alt_holding<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        host.on_holding_use_alt(user, x, y);
        Ok(true)
    }

    /// Alternate trigger released.
    pub fn control_use_alt_stop<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        host.on_use_alt_stop(user, x, y);
        Ok(true)
    }

    /// Alternate use cancelled.
    pub fn control_use_alt_cancel<H: FirearmHost + ?Sized>(
        &mut self,
        host: &mut H,
        user: EntityId,
        x: i32,
        y: i32,
    ) -> FirearmResult<bool> {
        ensure_user(user)?;
        host.on_use_alt_cancel(user, x, y);
        Ok(true)
    }
}

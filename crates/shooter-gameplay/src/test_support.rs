//! Recording host and input helpers shared by the firearm tests.

use ahash::{AHashMap, AHashSet};
use shooter_common::EntityId;

use crate::ammo::AmmoStore;
use crate::firearm::Firearm;
use crate::firemode::FireMode;
use crate::host::FirearmHost;
use crate::projectile::ProjectileShot;

/// Aim target used by the helpers: slightly above the horizon to the right.
pub const AIM_X: i32 = 1000;
pub const AIM_Y: i32 = -50;

/// Host that records every callback.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub user: EntityId,
    pub calls: AHashMap<&'static str, usize>,
    pub shots: Vec<ProjectileShot>,
    pub charge_progress: Vec<(u32, u32)>,
    pub reload_progress: Vec<(u32, u32)>,
    pub cancelled_reloads: Vec<bool>,
    pub conditions: AHashSet<String>,
    pub ammo: Option<AmmoStore>,
    pub reload_when_empty: bool,
    pub failed_reloads: u32,
    pub aiming: bool,
    pub aim_angle: Option<i32>,
    pub user_ready: bool,
    pub override_press: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            user: EntityId::new(),
            user_ready: true,
            ..Self::default()
        }
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.get(call).copied().unwrap_or(0)
    }

    fn record(&mut self, call: &'static str) {
        *self.calls.entry(call).or_insert(0) += 1;
    }
}

impl FirearmHost for RecordingHost {
    fn is_aiming(&self, _user: EntityId) -> bool {
        self.aiming
    }

    fn start_aim(&mut self, _user: EntityId) {
        self.record("start_aim");
        self.aiming = true;
    }

    fn stop_aim(&mut self, _user: EntityId) -> Option<i32> {
        if !std::mem::take(&mut self.aiming) {
            return None;
        }
        self.aim_angle
    }

    fn set_aim_position(&mut self, _user: EntityId, angle: i32) {
        self.aim_angle = Some(angle);
    }

    fn on_press_use(&mut self, _user: EntityId, _x: i32, _y: i32) -> bool {
        self.override_press
    }

    fn on_press_use_alt(&mut self, _user: EntityId, _x: i32, _y: i32) {
        self.record("alt");
    }

    fn on_holding_use_alt(&mut self, _user: EntityId, _x: i32, _y: i32) {
        self.record("alt");
    }

    fn on_use_alt_stop(&mut self, _user: EntityId, _x: i32, _y: i32) {
        self.record("alt");
    }

    fn on_use_alt_cancel(&mut self, _user: EntityId, _x: i32, _y: i32) {
        self.record("alt");
    }

    fn is_user_ready_to_use(&self, _user: EntityId) -> bool {
        self.user_ready
    }

    fn firemode_condition(&self, condition: &str) -> bool {
        self.conditions.contains(condition)
    }

    fn on_finish_charge(&mut self, _user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.record("finish_charge");
    }

    fn on_progress_charge(
        &mut self,
        _user: EntityId,
        _x: i32,
        _y: i32,
        _firemode: &FireMode,
        percent: u32,
        change: u32,
    ) {
        self.charge_progress.push((percent, change));
    }

    fn on_cancel_charge(&mut self, _user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.record("cancel_charge");
    }

    fn has_ammo(&self, firemode: &FireMode) -> bool {
        self.ammo.as_ref().map_or(true, |ammo| ammo.has_ammo(firemode))
    }

    fn handle_ammo_usage(&mut self, firemode: &FireMode) {
        if let Some(ammo) = &mut self.ammo {
            ammo.handle_usage(firemode);
        }
    }

    fn on_no_ammo(&mut self, _user: EntityId, _firemode: &FireMode) {
        self.record("no_ammo");
    }

    fn launch_projectile(&mut self, _user: EntityId, shot: ProjectileShot) {
        self.shots.push(shot);
    }

    fn on_start_cooldown(&mut self, _user: EntityId, _firemode: &FireMode) {
        self.record("start_cooldown");
    }

    fn on_finish_cooldown(&mut self, _user: EntityId, _firemode: &FireMode) {
        self.record("finish_cooldown");
    }

    fn on_skip_cooldown(&mut self, _user: EntityId, _firemode: &FireMode) {
        self.record("skip_cooldown");
    }

    fn needs_reload(&self, _user: EntityId, firemode: &FireMode) -> bool {
        match (&self.ammo, &firemode.ammo_id) {
            (Some(ammo), Some(id)) => self.reload_when_empty && ammo.count(id) == 0,
            _ => false,
        }
    }

    fn do_reload(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) -> bool {
        if self.failed_reloads > 0 {
            self.failed_reloads -= 1;
            return false;
        }
        if let (Some(ammo), Some(id)) = (&mut self.ammo, &firemode.ammo_id) {
            let missing = ammo.missing(id) as i32;
            ammo.do_ammo(id, missing);
        }
        self.on_finish_reload(user, x, y, firemode);
        true
    }

    fn on_start_reload(&mut self, _user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.record("start_reload");
    }

    fn on_finish_reload(&mut self, _user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.record("finish_reload");
    }

    fn on_progress_reload(
        &mut self,
        _user: EntityId,
        _x: i32,
        _y: i32,
        _firemode: &FireMode,
        percent: u32,
        change: u32,
    ) {
        self.reload_progress.push((percent, change));
    }

    fn on_cancel_reload(
        &mut self,
        _user: EntityId,
        _x: i32,
        _y: i32,
        _firemode: &FireMode,
        requested_by_user: bool,
    ) {
        self.cancelled_reloads.push(requested_by_user);
    }
}

/// Press, hold for `hold_ticks` frames, release.
pub fn press(firearm: &mut Firearm, host: &mut RecordingHost, user: EntityId, hold_ticks: u32) {
    firearm
        .control_use_start(host, user, AIM_X, AIM_Y)
        .expect("use start");
    for _ in 0..hold_ticks {
        firearm
            .control_use_holding(host, user, AIM_X, AIM_Y)
            .expect("use holding");
        firearm.tick(host).expect("tick");
    }
    firearm
        .control_use_stop(host, user, AIM_X, AIM_Y)
        .expect("use stop");
}

/// Let `ticks` frames pass without input.
pub fn wait(firearm: &mut Firearm, host: &mut RecordingHost, ticks: u32) {
    for _ in 0..ticks {
        firearm.tick(host).expect("tick");
    }
}

//! The simulated shooter.
//!
//! [`Soldier`] is the [`FirearmHost`] the simulation drives a weapon with.
//! It owns the magazine and reserve ammunition, resolves bullets against
//! the arena and keeps two stance channels: posture and weapon handling.
//! The aiming stance carries an [`AimAnimation`] that plays on the
//! soldier's [`SoldierRig`].

use ahash::AHashMap;
use crossbeam_channel::Sender;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};

use shooter_common::EntityId;
use shooter_gameplay::{
    AimAnimation, AimAnimationError, AmmoStore, AnimationHandle, AnimationRig, BulletResolver,
    Facing, FireMode, FirearmEvent, FirearmHost, Impact, Playback, ProcessKind, ProjectileShot,
    StanceChannel, StanceDefinition, StanceError, StanceGraphBuilder, StanceManager,
    DEFAULT_CHANNEL,
};

use crate::arena::Arena;

/// Posture channel: standing, crouching, prone.
pub const POSTURE_CHANNEL: StanceChannel = DEFAULT_CHANNEL;
/// Weapon channel: holstered, ready, aiming.
pub const WEAPON_CHANNEL: StanceChannel = 1;

/// Upright posture.
pub const STANDING: &str = "Standing";
/// Crouched posture.
pub const CROUCHING: &str = "Crouching";
/// Lying down.
pub const PRONE: &str = "Prone";
/// Weapon put away. Use is refused.
pub const HOLSTERED: &str = "Holstered";
/// Weapon drawn.
pub const READY: &str = "Ready";
/// Weapon raised. Plays the aim animation.
pub const AIMING: &str = "Aiming";

/// Aim animation used when the fire mode names none.
pub const DEFAULT_AIM_ANIMATION: &str = "AimArms";

const AIM_SLOT: i32 = 5;
const ACTION_SLOT: i32 = 6;
const ANIMATION_LENGTH: i32 = 2000;

/// Errors building a soldier.
#[derive(Debug, Error)]
pub enum SoldierError {
    /// Stance graph problem.
    #[error(transparent)]
    Stance(#[from] StanceError),
    /// Aim animation problem.
    #[error(transparent)]
    Animation(#[from] AimAnimationError),
}

/// Result type for soldier operations.
pub type SoldierResult<T> = Result<T, SoldierError>;

// ============================================================================
// Animation rig
// ============================================================================

/// An animation running in a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayingAnimation {
    /// Animation name.
    pub name: String,
    /// Second animation of a blend.
    pub blend: Option<String>,
    /// How it plays.
    pub playback: Playback,
    /// Handle given out for it.
    pub handle: AnimationHandle,
}

/// Bookkeeping stand-in for a skeletal animation player.
#[derive(Debug, Default)]
pub struct SoldierRig {
    frame: u64,
    next_handle: u32,
    slots: AHashMap<i32, PlayingAnimation>,
    positions: AHashMap<AnimationHandle, i32>,
    weights: AHashMap<AnimationHandle, i32>,
    aim: Option<i32>,
    turn_forced: Option<Facing>,
    played: u32,
}

impl SoldierRig {
    /// Whether an aim angle is known.
    #[must_use]
    pub fn has_aim(&self) -> bool {
        self.aim.is_some()
    }

    /// What plays in `slot`.
    #[must_use]
    pub fn playing(&self, slot: i32) -> Option<&PlayingAnimation> {
        self.slots.get(&slot)
    }

    /// What plays in the aim slot.
    #[must_use]
    pub fn aim_animation(&self) -> Option<&PlayingAnimation> {
        self.playing(AIM_SLOT)
    }

    /// Facing the aim animation forces, if any.
    #[must_use]
    pub fn turn_forced(&self) -> Option<Facing> {
        self.turn_forced
    }

    /// Animations started so far.
    #[must_use]
    pub fn played(&self) -> u32 {
        self.played
    }

    fn start(&mut self, slot: i32, name: &str, blend: Option<&str>, playback: Playback) -> AnimationHandle {
        self.next_handle += 1;
        let handle = AnimationHandle(self.next_handle);
        self.played += 1;
        self.slots.insert(
            slot,
            PlayingAnimation {
                name: name.to_string(),
                blend: blend.map(str::to_string),
                playback,
                handle,
            },
        );
        handle
    }
}

impl AnimationRig for SoldierRig {
    fn frame_counter(&self) -> u64 {
        self.frame
    }

    fn animation_length(&self, _name: &str) -> i32 {
        ANIMATION_LENGTH
    }

    fn play_animation(&mut self, slot: i32, name: &str, playback: Playback) -> Option<AnimationHandle> {
        let handle = self.start(slot, name, None, playback);
        let position = match playback {
            Playback::Hold { position } => position,
            Playback::Linear { .. } => 0,
        };
        self.positions.insert(handle, position);
        Some(handle)
    }

    fn play_blend(
        &mut self,
        slot: i32,
        first: &str,
        second: &str,
        playback: Playback,
        weight: i32,
    ) -> Option<AnimationHandle> {
        let handle = self.start(slot, first, Some(second), playback);
        self.weights.insert(handle, weight);
        Some(handle)
    }

    fn stop_slot(&mut self, slot: i32) {
        if let Some(stopped) = self.slots.remove(&slot) {
            self.positions.remove(&stopped.handle);
            self.weights.remove(&stopped.handle);
        }
    }

    fn animation_position(&self, handle: AnimationHandle) -> i32 {
        self.positions.get(&handle).copied().unwrap_or(0)
    }

    fn set_animation_position(&mut self, handle: AnimationHandle, position: i32) {
        self.positions.insert(handle, position);
    }

    fn animation_weight(&self, handle: AnimationHandle) -> i32 {
        self.weights.get(&handle).copied().unwrap_or(0)
    }

    fn set_animation_weight(&mut self, handle: AnimationHandle, weight: i32) {
        self.weights.insert(handle, weight);
    }

    fn aim_animation_angle(&self) -> Option<i32> {
        self.aim
    }

    fn facing_sign(&self) -> i32 {
        match self.turn_forced {
            Some(Facing::Left) => -1,
            _ => 1,
        }
    }

    fn set_turn_forced(&mut self, facing: Option<Facing>) {
        self.turn_forced = facing;
    }
}

// ============================================================================
// Soldier
// ============================================================================

/// What happened to the soldier's bullets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SoldierStats {
    /// Projectiles launched.
    pub shots: u32,
    /// Projectiles that hit a target.
    pub hits: u32,
    /// Hits on a weak spot.
    pub criticals: u32,
    /// Targets brought to zero health.
    pub kills: u32,
    /// Projectiles stopped by the landscape.
    pub ground_hits: u32,
    /// Projectiles that flew their full range.
    pub misses: u32,
    /// Trigger pulls on an empty magazine.
    pub dry_fires: u32,
    /// Completed reloads.
    pub reloads: u32,
    /// Sensors passed.
    pub interactions: u32,
}

/// A shooter on the range.
pub struct Soldier {
    id: EntityId,
    position: (i32, i32),
    arena: Arena,
    magazine: AmmoStore,
    reserve: AmmoStore,
    resolver: BulletResolver,
    events: Sender<FirearmEvent>,
    stances: StanceManager<SoldierRig>,
    rig: SoldierRig,
    aiming: bool,
    aim_angle: Option<i32>,
    bindings: [Option<String>; 2],
    use_secondary: bool,
    firemode_request: Option<String>,
    reload_requested: bool,
    last_firemode: String,
    stats: SoldierStats,
}

impl Soldier {
    /// A standing soldier with a ready weapon. `aim_animation` plays while
    /// aiming.
    pub fn new(arena: Arena, events: Sender<FirearmEvent>, aim_animation: Option<&str>) -> SoldierResult<Self> {
        let mut rig = SoldierRig::default();
        let mut stances = stance_graph(aim_animation.unwrap_or(DEFAULT_AIM_ANIMATION))?;
        stances.set_stance_by_name(&mut rig, STANDING, POSTURE_CHANNEL, true)?;
        stances.set_stance_by_name(&mut rig, READY, WEAPON_CHANNEL, true)?;

        Ok(Self {
            id: EntityId::new(),
            position: (0, 0),
            arena,
            magazine: AmmoStore::new(),
            reserve: AmmoStore::new(),
            resolver: BulletResolver::new(),
            events,
            stances,
            rig,
            aiming: false,
            aim_angle: None,
            bindings: [None, None],
            use_secondary: false,
            firemode_request: None,
            reload_requested: false,
            last_firemode: String::new(),
            stats: SoldierStats::default(),
        })
    }

    /// Place the soldier.
    pub fn with_position(mut self, position: (i32, i32)) -> Self {
        self.position = position;
        self
    }

    /// Hand out ammunition.
    pub fn with_ammo(mut self, magazine: AmmoStore, reserve: AmmoStore) -> Self {
        self.magazine = magazine;
        self.reserve = reserve;
        self
    }

    /// Fire modes the alternate trigger toggles between.
    pub fn with_bindings(mut self, primary: Option<String>, secondary: Option<String>) -> Self {
        self.bindings = [primary, secondary];
        self
    }

    /// Use a fixed seed for bullet spread.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.resolver = BulletResolver::with_seed(seed);
        self
    }

    /// Identity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Position.
    #[must_use]
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// The range.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Loaded rounds.
    #[must_use]
    pub fn magazine(&self) -> &AmmoStore {
        &self.magazine
    }

    /// Spare rounds.
    #[must_use]
    pub fn reserve(&self) -> &AmmoStore {
        &self.reserve
    }

    /// Animation state.
    #[must_use]
    pub fn rig(&self) -> &SoldierRig {
        &self.rig
    }

    /// Shot statistics.
    #[must_use]
    pub fn stats(&self) -> SoldierStats {
        self.stats
    }

    /// Last aim angle in degrees.
    #[must_use]
    pub fn aim_angle(&self) -> Option<i32> {
        self.aim_angle
    }

    /// Name of the stance on `channel`.
    #[must_use]
    pub fn stance(&self, channel: StanceChannel) -> Option<&str> {
        self.stances.get_stance(channel).ok().map(StanceDefinition::name)
    }

    /// Change stance, announcing it on success.
    pub fn set_stance(&mut self, name: &str, channel: StanceChannel, forced: bool) -> SoldierResult<bool> {
        let changed = self
            .stances
            .set_stance_by_name(&mut self.rig, name, channel, forced)?;
        if changed {
            self.publish(FirearmEvent::StanceChanged {
                actor: self.id,
                channel,
                stance: name.to_string(),
            });
        }
        Ok(changed)
    }

    /// Fire mode the alternate trigger asked for since the last call.
    pub fn take_firemode_request(&mut self) -> Option<String> {
        self.firemode_request.take()
    }

    /// Ask for a reload of a magazine that is not empty yet.
    pub fn request_reload(&mut self) {
        self.reload_requested = true;
    }

    /// Forget a reload request that did not start a reload.
    pub fn clear_reload_request(&mut self) {
        self.reload_requested = false;
    }

    /// Advance animations by one frame.
    pub fn tick(&mut self) {
        self.rig.frame += 1;
        self.stances.tick(&mut self.rig);
    }

    fn publish(&self, event: FirearmEvent) {
        let _ = self.events.try_send(event);
    }

    fn change_weapon_stance(&mut self, name: &str) {
        if let Err(e) = self.set_stance(name, WEAPON_CHANNEL, false) {
            warn!(soldier = %self.id, stance = name, "Weapon stance change failed: {e}");
        }
    }

    fn process(&self, user: EntityId, kind: ProcessKind, state: ProcessState) {
        let event = match state {
            ProcessState::Started => FirearmEvent::ProcessStarted { user, kind },
            ProcessState::Finished => FirearmEvent::ProcessFinished { user, kind },
            ProcessState::Cancelled => FirearmEvent::ProcessCancelled { user, kind },
        };
        self.publish(event);
    }
}

#[derive(Debug, Clone, Copy)]
enum ProcessState {
    Started,
    Finished,
    Cancelled,
}

impl std::fmt::Debug for Soldier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soldier")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("posture", &self.stance(POSTURE_CHANNEL))
            .field("weapon", &self.stance(WEAPON_CHANNEL))
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn stance_graph(aim_animation: &str) -> SoldierResult<StanceManager<SoldierRig>> {
    let mut graph = StanceGraphBuilder::new();

    let standing = graph.add_stance(STANDING)?;
    let crouching = graph.add_stance(CROUCHING)?;
    let prone = graph.add_stance(PRONE)?;
    graph.add_path(&[standing, crouching, prone, crouching, standing])?;

    let holstered = graph.add_stance(HOLSTERED)?;
    let ready = graph.add_stance(READY)?;
    let aiming = graph.add_stance(AIMING)?;
    graph.add_path(&[holstered, ready, aiming, ready, holstered])?;

    let aim: AimAnimation<SoldierRig> =
        AimAnimation::new([aim_animation], AIM_SLOT)?.with_condition(SoldierRig::has_aim);
    graph.add_behaviour(aiming, aim)?;

    Ok(graph.build())
}

impl FirearmHost for Soldier {
    fn is_aiming(&self, _user: EntityId) -> bool {
        self.aiming
    }

    fn start_aim(&mut self, _user: EntityId) {
        self.aiming = true;
        self.change_weapon_stance(AIMING);
    }

    fn stop_aim(&mut self, _user: EntityId) -> Option<i32> {
        if !std::mem::take(&mut self.aiming) {
            return None;
        }
        self.change_weapon_stance(READY);
        self.aim_angle
    }

    fn set_aim_position(&mut self, _user: EntityId, angle: i32) {
        self.aim_angle = Some(angle);
        self.rig.aim = Some(angle * 10);
    }

    fn on_press_use_alt(&mut self, _user: EntityId, _x: i32, _y: i32) {
        self.use_secondary = !self.use_secondary;
        let binding = &self.bindings[usize::from(self.use_secondary)];
        if let Some(name) = binding {
            debug!(soldier = %self.id, firemode = %name, "Fire mode requested");
            self.firemode_request = Some(name.clone());
        }
    }

    fn is_user_ready_to_use(&self, _user: EntityId) -> bool {
        self.stance(WEAPON_CHANNEL) != Some(HOLSTERED)
    }

    fn firemode_condition(&self, condition: &str) -> bool {
        self.stance(POSTURE_CHANNEL)
            .is_some_and(|posture| posture.eq_ignore_ascii_case(condition))
    }

    fn on_start_charge(&mut self, user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.process(user, ProcessKind::Charge, ProcessState::Started);
    }

    fn on_finish_charge(&mut self, user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.process(user, ProcessKind::Charge, ProcessState::Finished);
    }

    fn on_progress_charge(
        &mut self,
        _user: EntityId,
        _x: i32,
        _y: i32,
        _firemode: &FireMode,
        percent: u32,
        _change: u32,
    ) {
        trace!(soldier = %self.id, percent, "Charging");
    }

    fn on_cancel_charge(&mut self, user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.process(user, ProcessKind::Charge, ProcessState::Cancelled);
    }

    fn has_ammo(&self, firemode: &FireMode) -> bool {
        self.magazine.has_ammo(firemode)
    }

    fn handle_ammo_usage(&mut self, firemode: &FireMode) {
        self.magazine.handle_usage(firemode);
    }

    fn on_no_ammo(&mut self, user: EntityId, firemode: &FireMode) {
        self.stats.dry_fires += 1;
        self.publish(FirearmEvent::OutOfAmmo {
            user,
            firemode: firemode.name.clone(),
        });
    }

    fn fire_effect(&mut self, _user: EntityId, _angle: i32, firemode: &FireMode) {
        if let Some(shoot) = &firemode.anim_shoot_name {
            let playback = Playback::Linear {
                duration: firemode.delay_recover.max(1),
                looping: false,
            };
            self.rig.play_animation(ACTION_SLOT, shoot, playback);
        }
    }

    fn on_fire_projectile(&mut self, _user: EntityId, _shot: &mut ProjectileShot, firemode: &FireMode) {
        if self.last_firemode != firemode.name {
            self.last_firemode.clone_from(&firemode.name);
        }
    }

    fn launch_projectile(&mut self, user: EntityId, shot: ProjectileShot) {
        self.stats.shots += 1;
        self.publish(FirearmEvent::ProjectileLaunched {
            shooter: user,
            firemode: self.last_firemode.clone(),
            angle: shot.angle,
        });

        let origin = (self.position.0 + shot.offset.0, self.position.1 + shot.offset.1);
        let flight = self.resolver.resolve(&self.arena, &shot, origin);

        for id in &flight.interactions {
            self.arena.notice(*id);
            self.stats.interactions += 1;
        }
        match flight.impact {
            Impact::Target {
                target,
                damage,
                critical,
            } => {
                self.stats.hits += 1;
                if critical {
                    self.stats.criticals += 1;
                }
                if self.arena.apply_damage(target, damage) == Some(0) {
                    self.stats.kills += 1;
                }
            },
            Impact::Ground => self.stats.ground_hits += 1,
            Impact::Expired => self.stats.misses += 1,
        }

        self.publish(FirearmEvent::ProjectileImpact {
            shooter: user,
            position: flight.end,
            impact: flight.impact,
        });
    }

    fn on_recovery(&mut self, _user: EntityId, firemode: &FireMode) {
        trace!(soldier = %self.id, firemode = %firemode.name, "Recovered");
    }

    fn on_start_cooldown(&mut self, user: EntityId, _firemode: &FireMode) {
        self.process(user, ProcessKind::Cooldown, ProcessState::Started);
    }

    fn on_finish_cooldown(&mut self, user: EntityId, _firemode: &FireMode) {
        self.process(user, ProcessKind::Cooldown, ProcessState::Finished);
    }

    fn needs_reload(&self, _user: EntityId, firemode: &FireMode) -> bool {
        let Some(id) = &firemode.ammo_id else {
            return false;
        };
        !self.magazine.has_ammo(firemode) || (self.reload_requested && self.magazine.missing(id) > 0)
    }

    fn can_reload(&self, _user: EntityId, firemode: &FireMode) -> bool {
        firemode
            .ammo_id
            .as_ref()
            .is_some_and(|id| self.reserve.count(id) > 0)
    }

    fn do_reload(&mut self, user: EntityId, x: i32, y: i32, firemode: &FireMode) -> bool {
        let Some(id) = &firemode.ammo_id else {
            return false;
        };
        let available = self.reserve.count(id);
        if available == 0 {
            return false;
        }
        let loaded = self
            .magazine
            .do_ammo(id, self.magazine.missing(id).min(available) as i32);
        self.reserve.do_ammo(id, -loaded);
        debug!(soldier = %self.id, ammo = %id, loaded, left = self.reserve.count(id), "Reloaded");
        self.on_finish_reload(user, x, y, firemode);
        true
    }

    fn on_start_reload(&mut self, user: EntityId, _x: i32, _y: i32, firemode: &FireMode) {
        self.reload_requested = false;
        if let Some(load) = &firemode.anim_load_name {
            let playback = Playback::Linear {
                duration: firemode.delay_reload.max(1),
                looping: false,
            };
            self.rig.play_animation(ACTION_SLOT, load, playback);
        }
        self.process(user, ProcessKind::Reload, ProcessState::Started);
    }

    fn on_finish_reload(&mut self, user: EntityId, _x: i32, _y: i32, _firemode: &FireMode) {
        self.stats.reloads += 1;
        self.process(user, ProcessKind::Reload, ProcessState::Finished);
    }

    fn on_cancel_reload(
        &mut self,
        user: EntityId,
        _x: i32,
        _y: i32,
        firemode: &FireMode,
        requested_by_user: bool,
    ) {
        trace!(soldier = %self.id, requested_by_user, "Reload interrupted");
        if !(firemode.auto_reload && requested_by_user) {
            self.process(user, ProcessKind::Reload, ProcessState::Cancelled);
        }
    }
}

//! Aim animation as a stance behaviour.
//!
//! While its stance is current, [`AimAnimation`] keeps a looping aim
//! animation running and turns it toward the actor's aim angle, limited to a
//! maximum angular speed per tick. One-shot animations (firing, for example)
//! pause the loop until they are done.
//!
//! Aim animations come in three shapes:
//! - one animation covering the whole range from 0° (up) to 180° (down),
//!   driven by animation position;
//! - two animations for 0° and 180°, blended by weight;
//! - three animations for 90°, 0° and 180°.

use ahash::AHashMap;
use shooter_common::angles;
use thiserror::Error;
use tracing::trace;

use crate::stance::{StanceBehaviour, StanceChannel};

/// Key of the looping aim animation.
pub const AIM_KEY: &str = "AnimAim";

/// Speed limit meaning "no limit": 180 degrees in tenths per tick.
pub const INSTANT_AIM_SPEED: i32 = 1800;

/// Frames one loop of a blended aim animation takes.
const LOOP_TIME: u32 = 10;

/// Aim animation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AimAnimationError {
    /// Aim speed below zero.
    #[error("aim speed must be positive or zero for default, got {0}")]
    NegativeSpeed(i32),
    /// Animation definitions hold one to three animations.
    #[error("an aim animation needs 1 to 3 animations, got {0}")]
    AnimationCount(usize),
}

/// Direction the actor is forced to face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Facing left.
    Left,
    /// Facing right.
    Right,
}

/// How an animation's position moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    /// Hold a fixed position.
    Hold {
        /// Position to hold.
        position: i32,
    },
    /// Run from start to end over `duration` frames.
    Linear {
        /// Frames per run.
        duration: u32,
        /// Start over at the end instead of stopping.
        looping: bool,
    },
}

/// Handle of a playing animation or blend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationHandle(pub u32);

/// Skeleton animation access the aim behaviour needs from its actor.
pub trait AnimationRig {
    /// Current frame number.
    fn frame_counter(&self) -> u64;

    /// Length of a named animation.
    fn animation_length(&self, name: &str) -> i32;

    /// Play a single animation in `slot`.
    fn play_animation(&mut self, slot: i32, name: &str, playback: Playback) -> Option<AnimationHandle>;

    /// Play two animations blended in `slot`. Returns the blend node, whose
    /// weight (`0..=1000`) moves from `first` toward `second`.
    fn play_blend(
        &mut self,
        slot: i32,
        first: &str,
        second: &str,
        playback: Playback,
        weight: i32,
    ) -> Option<AnimationHandle>;

    /// Stop everything in `slot`.
    fn stop_slot(&mut self, slot: i32);

    /// Position of a playing animation.
    fn animation_position(&self, handle: AnimationHandle) -> i32;

    /// Set the position of a playing animation.
    fn set_animation_position(&mut self, handle: AnimationHandle, position: i32);

    /// Weight of a blend node.
    fn animation_weight(&self, handle: AnimationHandle) -> i32;

    /// Set the weight of a blend node.
    fn set_animation_weight(&mut self, handle: AnimationHandle, weight: i32);

    /// Aim angle in tenths of degrees, if the actor is aiming.
    fn aim_animation_angle(&self) -> Option<i32>;

    /// `-1` when facing left, `1` when facing right.
    fn facing_sign(&self) -> i32;

    /// Force a facing, or release it with `None`.
    fn set_turn_forced(&mut self, facing: Option<Facing>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopStatus {
    Stopped,
    Playing,
    PausedUntil(u64),
}

/// Which animations a one-shot plays and how they blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleShotBlend {
    /// Index of the first animation.
    pub first: usize,
    /// Index of the animation blended in, if any.
    pub second: Option<usize>,
    /// Blend weight toward `second`, `0..=1000`.
    pub weight: i32,
}

/// Blend for a one-shot over `count` animations at `aim_angle` degrees.
#[must_use]
pub fn single_shot_blend(count: usize, aim_angle: i32) -> SingleShotBlend {
    let angle = aim_angle.abs();
    match count {
        0 | 1 => SingleShotBlend {
            first: 0,
            second: None,
            weight: 0,
        },
        2 => SingleShotBlend {
            first: 0,
            second: Some(1),
            weight: 1000 * angle / 180,
        },
        _ if angle < 90 => SingleShotBlend {
            first: 1,
            second: Some(0),
            weight: 1000 * angle / 90,
        },
        _ => SingleShotBlend {
            first: 0,
            second: Some(2),
            weight: 1000 * (angle - 90) / 90,
        },
    }
}

/// Next displayed angle when turning from `current` toward `target`, both in
/// tenths of degrees, by at most `speed`.
#[must_use]
pub fn step_toward(current: i32, target: i32, speed: i32) -> i32 {
    current + (target - current).clamp(-speed, speed)
}

/// Stance behaviour keeping an aim animation pointed at the aim angle.
pub struct AimAnimation<A: ?Sized> {
    slot: i32,
    animations: AHashMap<String, Vec<String>>,
    status: LoopStatus,
    handle: Option<AnimationHandle>,
    speed: i32,
    condition: Option<fn(&A) -> bool>,
}

impl<A: AnimationRig + ?Sized> AimAnimation<A> {
    /// Aim behaviour playing `aim` in `slot`.
    pub fn new<I, S>(aim: I, slot: i32) -> Result<Self, AimAnimationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut behaviour = Self {
            slot,
            animations: AHashMap::new(),
            status: LoopStatus::Stopped,
            handle: None,
            speed: INSTANT_AIM_SPEED,
            condition: None,
        };
        behaviour.define_animation(AIM_KEY, aim)?;
        Ok(behaviour)
    }

    /// Limit how fast the aim turns, in tenths of degrees per tick.
    /// Zero restores the default (instant).
    pub fn with_speed(mut self, speed: i32) -> Result<Self, AimAnimationError> {
        if speed < 0 {
            return Err(AimAnimationError::NegativeSpeed(speed));
        }
        self.speed = if speed == 0 { INSTANT_AIM_SPEED } else { speed };
        Ok(self)
    }

    /// Only play while `condition` holds for the actor.
    pub fn with_condition(mut self, condition: fn(&A) -> bool) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Define the animations stored under `key`.
    pub fn define_animation<I, S>(&mut self, key: &str, animations: I) -> Result<&mut Self, AimAnimationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let animations: Vec<String> = animations.into_iter().map(Into::into).collect();
        if animations.is_empty() || animations.len() > 3 {
            return Err(AimAnimationError::AnimationCount(animations.len()));
        }
        self.animations.insert(key.to_string(), animations);
        Ok(self)
    }

    /// Current turn speed limit.
    #[must_use]
    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Whether the aim loop is running.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.status == LoopStatus::Playing
    }

    /// Stop the aim animation and let the actor turn freely.
    pub fn stop(&mut self, actor: &mut A) {
        actor.stop_slot(self.slot);
        self.status = LoopStatus::Stopped;
        actor.set_turn_forced(None);
    }

    /// Start the looping animation stored under `key`.
    pub fn play_loop(&mut self, actor: &mut A, key: &str) -> Option<AnimationHandle> {
        self.stop(actor);
        let animations = self.animations.get(key)?.clone();
        self.handle = match animations.as_slice() {
            [single] => {
                let position = actor.animation_length(single) / 2;
                actor.play_animation(self.slot, single, Playback::Hold { position })
            }
            [first, second, ..] => actor.play_blend(
                self.slot,
                first,
                second,
                Playback::Linear {
                    duration: LOOP_TIME,
                    looping: true,
                },
                500,
            ),
            [] => None,
        };
        self.handle
    }

    /// Play the animation stored under `key` once over `duration` frames,
    /// blended for `aim_angle` degrees. The aim loop resumes afterwards.
    pub fn play_single(
        &mut self,
        actor: &mut A,
        key: &str,
        aim_angle: i32,
        duration: u32,
    ) -> Option<AnimationHandle> {
        self.stop(actor);
        let animations = self.animations.get(key)?.clone();
        self.status = LoopStatus::PausedUntil(actor.frame_counter() + u64::from(duration));

        let playback = Playback::Linear {
            duration,
            looping: false,
        };
        let blend = single_shot_blend(animations.len(), aim_angle);
        let first = animations.get(blend.first)?;
        match blend.second.and_then(|i| animations.get(i)) {
            Some(second) => actor.play_blend(self.slot, first, second, playback, blend.weight),
            None => actor.play_animation(self.slot, first, playback),
        }
    }

    /// Turn the loop toward the actor's aim angle. Returns `false` if no
    /// loop is running.
    pub fn update(&mut self, actor: &mut A) -> bool {
        let Some(handle) = self.handle else {
            return false;
        };
        let Some(animations) = self.animations.get(AIM_KEY) else {
            return false;
        };

        let aim = actor
            .aim_animation_angle()
            .unwrap_or_else(|| 900 * actor.facing_sign());
        let aim = angles::normalize_prec(aim, -1800, 10);
        match aim.signum() {
            -1 => actor.set_turn_forced(Some(Facing::Left)),
            1 => actor.set_turn_forced(Some(Facing::Right)),
            _ => {}
        }

        let by_position = animations.len() == 1;
        let (length, position) = if by_position {
            (
                actor.animation_length(&animations[0]).max(1),
                actor.animation_position(handle),
            )
        } else {
            (1000, actor.animation_weight(handle))
        };

        let angle = position * 1800 / length;
        let value = step_toward(angle, aim.abs(), self.speed) * length / 1800;
        if by_position {
            actor.set_animation_position(handle, value);
        } else {
            actor.set_animation_weight(handle, value);
        }
        true
    }
}

impl<A: AnimationRig + ?Sized> StanceBehaviour<A> for AimAnimation<A> {
    fn on_stance_reset(&mut self, actor: &mut A, _channel: StanceChannel, _forced: bool) {
        self.stop(actor);
    }

    fn timer(&mut self, actor: &mut A, _channel: StanceChannel) {
        if let LoopStatus::PausedUntil(frame) = self.status {
            if actor.frame_counter() < frame {
                return;
            }
            self.status = LoopStatus::Stopped;
        }

        let play = self.condition.map_or(true, |condition| condition(actor));
        match self.status {
            LoopStatus::Stopped if play => {
                if self.play_loop(actor, AIM_KEY).is_some() {
                    trace!(slot = self.slot, "Aim loop started");
                    self.status = LoopStatus::Playing;
                }
            }
            LoopStatus::Playing if play => {
                self.update(actor);
            }
            LoopStatus::Playing => self.stop(actor),
            _ => {}
        }
    }
}

impl<A: ?Sized> std::fmt::Debug for AimAnimation<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AimAnimation")
            .field("slot", &self.slot)
            .field("animations", &self.animations)
            .field("status", &self.status)
            .field("speed", &self.speed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stance::StanceGraphBuilder;

    #[derive(Debug, Default)]
    struct MockRig {
        frame: u64,
        next_handle: u32,
        playing: Vec<(String, Option<String>, Playback)>,
        position: i32,
        weight: i32,
        aim: Option<i32>,
        facing: Option<Facing>,
        visible: bool,
    }

    impl AnimationRig for MockRig {
        fn frame_counter(&self) -> u64 {
            self.frame
        }

        fn animation_length(&self, _name: &str) -> i32 {
            2000
        }

        fn play_animation(&mut self, _slot: i32, name: &str, playback: Playback) -> Option<AnimationHandle> {
            self.playing.push((name.to_string(), None, playback));
            if let Playback::Hold { position } = playback {
                self.position = position;
            }
            self.next_handle += 1;
            Some(AnimationHandle(self.next_handle))
        }

        fn play_blend(
            &mut self,
            _slot: i32,
            first: &str,
            second: &str,
            playback: Playback,
            weight: i32,
        ) -> Option<AnimationHandle> {
            self.playing.push((first.to_string(), Some(second.to_string()), playback));
            self.weight = weight;
            self.next_handle += 2;
            Some(AnimationHandle(self.next_handle))
        }

        fn stop_slot(&mut self, _slot: i32) {
            self.playing.clear();
        }

        fn animation_position(&self, _handle: AnimationHandle) -> i32 {
            self.position
        }

        fn set_animation_position(&mut self, _handle: AnimationHandle, position: i32) {
            self.position = position;
        }

        fn animation_weight(&self, _handle: AnimationHandle) -> i32 {
            self.weight
        }

        fn set_animation_weight(&mut self, _handle: AnimationHandle, weight: i32) {
            self.weight = weight;
        }

        fn aim_animation_angle(&self) -> Option<i32> {
            self.aim
        }

        fn facing_sign(&self) -> i32 {
            1
        }

        fn set_turn_forced(&mut self, facing: Option<Facing>) {
            self.facing = facing;
        }
    }

    #[test]
    fn test_single_shot_blend_weights() {
        assert_eq!(single_shot_blend(1, 45).second, None);
        assert_eq!(single_shot_blend(2, -90).weight, 500);
        let up = single_shot_blend(3, 45);
        assert_eq!((up.first, up.second, up.weight), (1, Some(0), 500));
        let down = single_shot_blend(3, 135);
        assert_eq!((down.first, down.second, down.weight), (0, Some(2), 500));
    }

    #[test]
    fn test_step_toward_respects_speed() {
        assert_eq!(step_toward(0, 900, 50), 50);
        assert_eq!(step_toward(900, 0, 50), 850);
        assert_eq!(step_toward(880, 900, 50), 900);
    }

    #[test]
    fn test_negative_speed_rejected() {
        let aim = AimAnimation::<MockRig>::new(["AimArms"], 1).expect("valid");
        assert_eq!(aim.with_speed(-1).map(|a| a.speed()), Err(AimAnimationError::NegativeSpeed(-1)));
        let aim = AimAnimation::<MockRig>::new(["AimArms"], 1).expect("valid");
        assert_eq!(aim.with_speed(0).expect("valid").speed(), INSTANT_AIM_SPEED);
        assert_eq!(
            AimAnimation::<MockRig>::new(Vec::<String>::new(), 1).map(|a| a.speed()),
            Err(AimAnimationError::AnimationCount(0))
        );
    }

    #[test]
    fn test_loop_follows_aim_by_position() {
        let mut rig = MockRig {
            aim: Some(900),
            ..MockRig::default()
        };
        let mut aim = AimAnimation::new(["AimArms"], 1)
            .expect("valid")
            .with_speed(300)
            .expect("valid");

        aim.timer(&mut rig, 1);
        assert!(aim.is_playing());
        assert_eq!(rig.position, 1000);

        rig.aim = Some(300);
        aim.timer(&mut rig, 1);
        // 1000 of 2000 is 90 degrees; one step of 30 degrees toward 30.
        assert_eq!(rig.position, 666);
        assert_eq!(rig.facing, Some(Facing::Right));

        rig.aim = Some(-1200);
        aim.timer(&mut rig, 1);
        assert_eq!(rig.facing, Some(Facing::Left));
    }

    #[test]
    fn test_blended_loop_uses_weight() {
        let mut rig = MockRig {
            aim: Some(1800),
            ..MockRig::default()
        };
        let mut aim = AimAnimation::new(["AimUp", "AimDown"], 1).expect("valid");

        aim.timer(&mut rig, 1);
        assert_eq!(rig.weight, 500);
        aim.timer(&mut rig, 1);
        assert_eq!(rig.weight, 1000);
    }

    #[test]
    fn test_one_shot_pauses_loop() {
        let mut rig = MockRig::default();
        let mut aim = AimAnimation::new(["AimArms"], 1).expect("valid");
        aim.define_animation("Fire", ["FireMid", "FireUp", "FireDown"])
            .expect("valid");

        aim.timer(&mut rig, 1);
        assert!(aim.is_playing());

        assert!(aim.play_single(&mut rig, "Fire", 30, 5).is_some());
        assert_eq!(rig.playing[0].0, "FireUp");
        assert_eq!(rig.playing[0].1.as_deref(), Some("FireMid"));
        assert!(!aim.is_playing());

        rig.frame = 3;
        aim.timer(&mut rig, 1);
        assert!(!aim.is_playing());

        rig.frame = 5;
        aim.timer(&mut rig, 1);
        assert!(aim.is_playing());
    }

    #[test]
    fn test_condition_stops_loop() {
        let mut rig = MockRig::default();
        let mut aim = AimAnimation::new(["AimArms"], 1)
            .expect("valid")
            .with_condition(|rig: &MockRig| rig.visible);

        aim.timer(&mut rig, 1);
        assert!(!aim.is_playing());

        rig.visible = true;
        aim.timer(&mut rig, 1);
        assert!(aim.is_playing());

        rig.visible = false;
        aim.timer(&mut rig, 1);
        assert!(!aim.is_playing());
        assert!(rig.playing.is_empty());
    }

    #[test]
    fn test_stance_exit_stops_animation() {
        let mut graph = StanceGraphBuilder::new();
        let ready = graph.add_stance("WeaponReady").expect("new");
        let aiming = graph.add_stance("WeaponAiming").expect("new");
        graph.add_path(&[ready, aiming, ready]).expect("valid");
        graph
            .add_behaviour(aiming, AimAnimation::new(["AimArms"], 1).expect("valid"))
            .expect("known");
        let mut manager = graph.build();
        let mut rig = MockRig {
            aim: Some(450),
            ..MockRig::default()
        };

        manager.set_stance(&mut rig, ready, 1, false).expect("known");
        manager.set_stance(&mut rig, aiming, 1, false).expect("known");
        manager.tick(&mut rig);
        assert_eq!(rig.playing.len(), 1);
        assert_eq!(rig.facing, None);
        manager.tick(&mut rig);
        assert_eq!(rig.facing, Some(Facing::Right));

        manager.set_stance(&mut rig, ready, 1, false).expect("known");
        assert!(rig.playing.is_empty());
        assert_eq!(rig.facing, None);
    }
}

//! Fire-mode configuration.
//!
//! A [`FireMode`] is the complete parameter set for one way of firing a
//! weapon: trigger behaviour, process delays, projectile properties and
//! spread. Fire modes are plain data; weapons hold them behind [`Arc`] so
//! that a single definition can be shared until somebody writes to it.
//!
//! [`Arc`]: std::sync::Arc

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or validating fire-mode data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireModeError {
    /// A sampled range was given with the wrong number of elements.
    #[error("sampled value expects 2 or 3 elements, got {0}")]
    SampleLength(usize),
    /// A sampled range has its bounds reversed.
    #[error("sampled range minimum {min} exceeds maximum {max}")]
    SampleBounds {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },
    /// Burst length set on a fire mode that is not in burst mode.
    #[error("fire mode '{0}' has a burst length but is not a burst mode")]
    BurstWithoutBurstMode(String),
    /// Deviation precision must be positive.
    #[error("deviation precision must be positive, got {0}")]
    InvalidPrecision(i32),
    /// Rate of ammo usage must be at least one shot.
    #[error("fire mode '{0}' has an ammo rate of zero")]
    ZeroAmmoRate(String),
}

/// Trigger behaviour of a fire mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireModeKind {
    /// One shot per trigger pull.
    #[default]
    Single,
    /// A fixed number of shots per trigger pull.
    Burst,
    /// Fires continuously while the trigger is held.
    Auto,
}

// ============================================================================
// Sampled values
// ============================================================================

/// An integer that is either fixed or drawn from a stepped range per shot.
///
/// In data files a plain integer is fixed, `[min, max]` samples with step 1
/// and `[min, max, step]` samples from `min, min + step, ...` below `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SampledRepr", into = "SampledRepr")]
pub enum SampledValue {
    /// Always the same value.
    Fixed(i32),
    /// Uniformly sampled from a stepped range.
    Range {
        /// Inclusive lower bound.
        min: i32,
        /// Exclusive upper bound.
        max: i32,
        /// Distance between candidate values.
        step: i32,
    },
}

impl SampledValue {
    /// Create a sampled range, rejecting reversed bounds.
    pub fn range(min: i32, max: i32, step: i32) -> Result<Self, FireModeError> {
        if min > max {
            return Err(FireModeError::SampleBounds { min, max });
        }
        Ok(Self::Range { min, max, step })
    }

    /// Draw a value.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> i32 {
        match *self {
            Self::Fixed(value) => value,
            Self::Range { min, max, step } => {
                let step = i64::from(step.max(1));
                let slots = (i64::from(max) - i64::from(min)).max(0) / step;
                if slots > 0 {
                    let value = i64::from(min) + step * rng.i64(0..slots);
                    i32::try_from(value).unwrap_or(min)
                } else {
                    min
                }
            }
        }
    }
}

impl Default for SampledValue {
    fn default() -> Self {
        Self::Fixed(0)
    }
}

impl From<i32> for SampledValue {
    fn from(value: i32) -> Self {
        Self::Fixed(value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SampledRepr {
    Fixed(i32),
    List(Vec<i32>),
}

impl TryFrom<SampledRepr> for SampledValue {
    type Error = FireModeError;

    fn try_from(repr: SampledRepr) -> Result<Self, Self::Error> {
        match repr {
            SampledRepr::Fixed(value) => Ok(Self::Fixed(value)),
            SampledRepr::List(values) => match values.as_slice() {
                [min, max] => Self::range(*min, *max, 1),
                [min, max, step] => Self::range(*min, *max, *step),
                other => Err(FireModeError::SampleLength(other.len())),
            },
        }
    }
}

impl From<SampledValue> for SampledRepr {
    fn from(value: SampledValue) -> Self {
        match value {
            SampledValue::Fixed(value) => Self::Fixed(value),
            SampledValue::Range { min, max, step } => Self::List(vec![min, max, step]),
        }
    }
}

// ============================================================================
// Deviation
// ============================================================================

/// Angular spread, `angle / precision` degrees to either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deviation {
    /// Spread amount in units of `1 / precision` degrees.
    pub angle: i32,
    /// Units per degree.
    pub precision: i32,
}

impl Deviation {
    /// Create a deviation.
    pub fn new(angle: i32, precision: i32) -> Result<Self, FireModeError> {
        if precision < 1 {
            return Err(FireModeError::InvalidPrecision(precision));
        }
        Ok(Self { angle, precision })
    }

    /// The spread expressed at another precision, truncated.
    #[must_use]
    pub fn to_precision(&self, precision: i32) -> i32 {
        self.angle * precision / self.precision.max(1)
    }

    /// Sum several deviations at the finest precision among them.
    pub fn compose<I>(deviations: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let all: Vec<Self> = deviations.into_iter().collect();
        let precision = all.iter().map(|d| d.precision.max(1)).max()?;
        let angle = all.iter().map(|d| d.to_precision(precision)).sum();
        Some(Self { angle, precision })
    }
}

impl Default for Deviation {
    fn default() -> Self {
        Self {
            angle: 0,
            precision: 100,
        }
    }
}

// ============================================================================
// Fire mode
// ============================================================================

/// Animations a user plays for the selected fire mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSet {
    /// Animation held while aiming.
    pub aim: Option<String>,
    /// Animation played per shot.
    pub shoot: Option<String>,
    /// Frames the shoot animation lasts.
    pub shoot_time: u32,
    /// Animation played while reloading.
    pub load: Option<String>,
    /// Frames the load animation lasts.
    pub load_time: u32,
    /// Walking speed while aiming forward.
    pub walk_speed_front: Option<i32>,
    /// Walking speed while aiming backward.
    pub walk_speed_back: Option<i32>,
}

/// Complete parameter set for one way of firing a weapon.
///
/// All fields have defaults, so data files only spell out what differs from
/// a plain single-shot rifle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireMode {
    /// Trigger behaviour.
    pub mode: FireModeKind,
    /// Display name, also the key for shot counting.
    pub name: String,
    /// Icon shown in fire-mode selection.
    pub icon: Option<String>,
    /// Name of the condition gating availability. `None` is always available.
    pub condition: Option<String>,

    /// Ammunition type consumed.
    pub ammo_id: Option<String>,
    /// Ammo units consumed per usage.
    pub ammo_usage: u32,
    /// Shots per usage.
    pub ammo_rate: u32,

    /// Frames to charge before the first shot.
    pub delay_charge: u32,
    /// Frames between shots.
    pub delay_recover: u32,
    /// Frames after a finished use before the weapon is ready again.
    pub delay_cooldown: u32,
    /// Frames to reload.
    pub delay_reload: u32,

    /// Damage per projectile.
    pub damage: i32,
    /// Damage type tag.
    pub damage_type: Option<String>,

    /// Projectile kind to launch.
    pub projectile_id: String,
    /// Launch speed.
    pub projectile_speed: SampledValue,
    /// Maximum flight range in pixels.
    pub projectile_range: SampledValue,
    /// Spawn distance from the muzzle pivot.
    pub projectile_distance: i32,
    /// Vertical pivot offset for aiming.
    pub projectile_offset_y: i32,
    /// Projectiles per shot.
    pub projectile_number: u32,
    /// Spread between projectiles of one shot.
    pub projectile_spread: Deviation,

    /// Inherent weapon spread.
    pub spread: Deviation,

    /// Shots per burst. Only valid in burst mode.
    pub burst: u32,
    /// Keep reloading after the user lets go.
    pub auto_reload: bool,

    /// Animation held while aiming.
    pub anim_aim_name: Option<String>,
    /// Animation played per shot.
    pub anim_shoot_name: Option<String>,
    /// Animation played while reloading.
    pub anim_load_name: Option<String>,
    /// Walking speed while aiming forward.
    pub walk_speed_front: Option<i32>,
    /// Walking speed while aiming backward.
    pub walk_speed_back: Option<i32>,
}

impl Default for FireMode {
    fn default() -> Self {
        Self {
            mode: FireModeKind::Single,
            name: "Standard".to_string(),
            icon: None,
            condition: None,
            ammo_id: None,
            ammo_usage: 1,
            ammo_rate: 1,
            delay_charge: 0,
            delay_recover: 1,
            delay_cooldown: 0,
            delay_reload: 0,
            damage: 10,
            damage_type: None,
            projectile_id: "NormalBullet".to_string(),
            projectile_speed: SampledValue::Fixed(100),
            projectile_range: SampledValue::Fixed(600),
            projectile_distance: 10,
            projectile_offset_y: -6,
            projectile_number: 1,
            projectile_spread: Deviation::default(),
            spread: Deviation {
                angle: 1,
                precision: 100,
            },
            burst: 0,
            auto_reload: false,
            anim_aim_name: None,
            anim_shoot_name: None,
            anim_load_name: None,
            walk_speed_front: None,
            walk_speed_back: None,
        }
    }
}

impl FireMode {
    /// Create a fire mode with the given name and trigger behaviour.
    #[must_use]
    pub fn new(name: impl Into<String>, mode: FireModeKind) -> Self {
        Self {
            name: name.into(),
            mode,
            ..Self::default()
        }
    }

    /// Set the recovery delay.
    pub fn with_recovery(mut self, frames: u32) -> Self {
        self.delay_recover = frames;
        self
    }

    /// Set the charge delay.
    pub fn with_charge(mut self, frames: u32) -> Self {
        self.delay_charge = frames;
        self
    }

    /// Set the cooldown delay.
    pub fn with_cooldown(mut self, frames: u32) -> Self {
        self.delay_cooldown = frames;
        self
    }

    /// Set the reload delay.
    pub fn with_reload(mut self, frames: u32) -> Self {
        self.delay_reload = frames;
        self
    }

    /// Set the burst length.
    pub fn with_burst(mut self, shots: u32) -> Self {
        self.burst = shots;
        self
    }

    /// Set the availability condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the ammunition type.
    pub fn with_ammo(mut self, ammo_id: impl Into<String>) -> Self {
        self.ammo_id = Some(ammo_id.into());
        self
    }

    /// Check data consistency.
    pub fn validate(&self) -> Result<(), FireModeError> {
        if self.burst > 0 && self.mode != FireModeKind::Burst {
            return Err(FireModeError::BurstWithoutBurstMode(self.name.clone()));
        }
        if self.ammo_rate == 0 {
            return Err(FireModeError::ZeroAmmoRate(self.name.clone()));
        }
        for deviation in [self.spread, self.projectile_spread] {
            if deviation.precision < 1 {
                return Err(FireModeError::InvalidPrecision(deviation.precision));
            }
        }
        for value in [self.projectile_speed, self.projectile_range] {
            if let SampledValue::Range { min, max, .. } = value {
                if min > max {
                    return Err(FireModeError::SampleBounds { min, max });
                }
            }
        }
        Ok(())
    }

    /// Combined spread applied to every projectile of a shot.
    #[must_use]
    pub fn total_deviation(&self) -> Deviation {
        Deviation::compose([self.spread, self.projectile_spread]).unwrap_or_default()
    }

    /// Animations for this fire mode.
    #[must_use]
    pub fn animation_set(&self) -> AnimationSet {
        AnimationSet {
            aim: self.anim_aim_name.clone(),
            shoot: self.anim_shoot_name.clone(),
            shoot_time: self.delay_recover,
            load: self.anim_load_name.clone(),
            load_time: self.delay_reload,
            walk_speed_front: self.walk_speed_front,
            walk_speed_back: self.walk_speed_back,
        }
    }
}

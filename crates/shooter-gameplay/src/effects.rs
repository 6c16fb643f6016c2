//! Timed weapon processes.
//!
//! Charging, recovering, cooling down and reloading all share the same
//! shape: a frame counter running against a fixed delay, owned by one user
//! and bound to the fire mode that started it. The weapon lock is a timer
//! without an owner. The firearm advances every running process by one
//! frame per tick; what happens on completion is decided there.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shooter_common::EntityId;

use crate::firemode::FireMode;

/// The kind of a timed weapon process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// Winding up before the first shot.
    Charge,
    /// Pause between consecutive shots.
    Recovery,
    /// Pause after a finished use.
    Cooldown,
    /// Refilling ammunition.
    Reload,
}

/// Frame counter against a fixed delay.
///
/// A timer with delay `D` completes on the frame its elapsed count exceeds
/// `D`, so a process is observable for exactly `D` full frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessTimer {
    delay: u32,
    elapsed: u32,
    percentage: u32,
    percent_old: u32,
}

impl ProcessTimer {
    /// Create a timer that has not run yet.
    #[must_use]
    pub fn new(delay: u32) -> Self {
        Self {
            delay,
            elapsed: 0,
            percentage: 0,
            percent_old: 0,
        }
    }

    /// Advance by one frame.
    pub fn advance(&mut self) {
        self.elapsed = self.elapsed.saturating_add(1);
        self.percentage = if self.delay == 0 {
            100
        } else {
            (u64::from(self.elapsed) * 100 / u64::from(self.delay)).min(100) as u32
        };
    }

    /// Whether the delay has fully passed.
    #[must_use]
    pub fn is_elapsed(&self) -> bool {
        self.elapsed > self.delay
    }

    /// Completion in percent, `0..=100`.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    /// Percent gained since the last acknowledged report.
    #[must_use]
    pub fn progress(&self) -> u32 {
        self.percentage.saturating_sub(self.percent_old)
    }

    /// Mark the current percentage as reported.
    pub fn acknowledge(&mut self) {
        self.percent_old = self.percentage;
    }

    /// Frames run so far.
    #[must_use]
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Configured delay.
    #[must_use]
    pub fn delay(&self) -> u32 {
        self.delay
    }
}

/// A running charge, recovery, cooldown or reload.
#[derive(Debug, Clone)]
pub struct ProcessEffect {
    kind: ProcessKind,
    user: EntityId,
    firemode: Arc<FireMode>,
    aim: (i32, i32),
    timer: ProcessTimer,
    completed: bool,
    consumed: bool,
}

impl ProcessEffect {
    /// Start a process for `user` with the given fire mode and delay.
    #[must_use]
    pub fn new(
        kind: ProcessKind,
        user: EntityId,
        firemode: Arc<FireMode>,
        delay: u32,
        aim: (i32, i32),
    ) -> Self {
        Self {
            kind,
            user,
            firemode,
            aim,
            timer: ProcessTimer::new(delay),
            completed: false,
            consumed: false,
        }
    }

    /// Kind of process.
    #[must_use]
    pub fn kind(&self) -> ProcessKind {
        self.kind
    }

    /// User that started the process.
    #[must_use]
    pub fn user(&self) -> EntityId {
        self.user
    }

    /// Fire mode the process is bound to.
    #[must_use]
    pub fn firemode(&self) -> &Arc<FireMode> {
        &self.firemode
    }

    /// Last known aim coordinates.
    #[must_use]
    pub fn aim(&self) -> (i32, i32) {
        self.aim
    }

    /// Update the aim coordinates.
    pub fn set_aim(&mut self, x: i32, y: i32) {
        self.aim = (x, y);
    }

    /// Whether this process belongs to `user` and the exact fire mode.
    #[must_use]
    pub fn matches(&self, user: EntityId, firemode: &Arc<FireMode>) -> bool {
        self.user == user && Arc::ptr_eq(&self.firemode, firemode)
    }

    /// Timer state.
    #[must_use]
    pub fn timer(&self) -> &ProcessTimer {
        &self.timer
    }

    /// Mutable timer state.
    pub fn timer_mut(&mut self) -> &mut ProcessTimer {
        &mut self.timer
    }

    /// Whether the process has reached its goal and is waiting to be used.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Latch completion.
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// Whether a completed process has already been used once.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Mark a completed process as used.
    pub fn consume(&mut self) {
        self.consumed = true;
    }
}

/// A block on firing, either timed or until explicitly lifted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponLock {
    timer: Option<ProcessTimer>,
}

impl WeaponLock {
    /// Lock for `frames`, or indefinitely if `frames` is zero.
    #[must_use]
    pub fn new(frames: u32) -> Self {
        Self {
            timer: (frames > 0).then(|| ProcessTimer::new(frames)),
        }
    }

    /// Advance by one frame. Returns `true` once the lock has run out.
    pub fn advance(&mut self) -> bool {
        match &mut self.timer {
            Some(timer) => {
                timer.advance();
                timer.is_elapsed()
            }
            None => false,
        }
    }

    /// Whether the lock only ends by an explicit unlock.
    #[must_use]
    pub fn is_indefinite(&self) -> bool {
        self.timer.is_none()
    }
}

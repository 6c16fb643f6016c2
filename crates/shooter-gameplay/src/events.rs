//! Event bus for fire-cycle notifications.
//!
//! Hosts publish what happened to their firearms here so that logging,
//! sound and UI can react without hooking into the fire cycle directly.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

use shooter_common::EntityId;

use crate::effects::ProcessKind;
use crate::projectile::Impact;

/// Something that happened to a firearm or its user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FirearmEvent {
    /// A projectile left the weapon.
    ProjectileLaunched {
        /// Shooting user.
        shooter: EntityId,
        /// Fire mode name.
        firemode: String,
        /// Launch angle in degrees.
        angle: i32,
    },
    /// A projectile's flight ended.
    ProjectileImpact {
        /// Shooting user.
        shooter: EntityId,
        /// Where the flight ended.
        position: (i32, i32),
        /// What was hit.
        impact: Impact,
    },
    /// A timed process started.
    ProcessStarted {
        /// Owning user.
        user: EntityId,
        /// Process kind.
        kind: ProcessKind,
    },
    /// A timed process ran to completion.
    ProcessFinished {
        /// Owning user.
        user: EntityId,
        /// Process kind.
        kind: ProcessKind,
    },
    /// A timed process was cancelled.
    ProcessCancelled {
        /// Owning user.
        user: EntityId,
        /// Process kind.
        kind: ProcessKind,
    },
    /// Trigger pulled on an empty weapon.
    OutOfAmmo {
        /// Shooting user.
        user: EntityId,
        /// Fire mode name.
        firemode: String,
    },
    /// A different fire mode was selected.
    FiremodeChanged {
        /// Weapon.
        weapon: EntityId,
        /// New fire mode name.
        firemode: String,
    },
    /// A stance channel changed.
    StanceChanged {
        /// Actor.
        actor: EntityId,
        /// Stance channel.
        channel: u32,
        /// New stance name.
        stance: String,
    },
}

/// Bounded queue of [`FirearmEvent`]s.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<FirearmEvent>,
    receiver: Receiver<FirearmEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Create a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publish an event. Dropped if the bus is full.
    pub fn publish(&self, event: FirearmEvent) {
        let _ = self.sender.try_send(event);
    }

    /// Take all pending events.
    pub fn drain(&self) -> Vec<FirearmEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of undrained events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Maximum number of undrained events.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// A sender for publishing from elsewhere.
    #[must_use]
    pub fn sender(&self) -> Sender<FirearmEvent> {
        self.sender.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        let user = EntityId::new();
        bus.publish(FirearmEvent::ProcessStarted {
            user,
            kind: ProcessKind::Reload,
        });
        bus.sender()
            .send(FirearmEvent::OutOfAmmo {
                user,
                firemode: "Auto".to_string(),
            })
            .expect("bus open");

        assert_eq!(bus.pending_count(), 2);
        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_events() {
        let bus = EventBus::new(1);
        let user = EntityId::new();
        for _ in 0..3 {
            bus.publish(FirearmEvent::ProcessFinished {
                user,
                kind: ProcessKind::Cooldown,
            });
        }
        assert_eq!(bus.drain().len(), 1);
        assert_eq!(bus.capacity(), 1);
    }
}

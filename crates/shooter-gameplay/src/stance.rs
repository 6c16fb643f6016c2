//! Stance manager.
//!
//! A stance is a named node in a directed graph of allowed transitions,
//! such as standing, crouching and prone for posture, or idle, ready and
//! aiming for weapon handling. The manager keeps one current stance per
//! channel; channels are independent of each other.
//!
//! The graph is built once with a [`StanceGraphBuilder`] and cannot change
//! afterwards. Behaviours attached to a stance get entry, exit and per-tick
//! callbacks with mutable access to the actor the manager belongs to.

use std::collections::BTreeMap;
use std::fmt;

use ahash::AHashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Slot holding one current stance.
pub type StanceChannel = u32;

/// Channel used when none is given.
pub const DEFAULT_CHANNEL: StanceChannel = 0;

/// Stance manager errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StanceError {
    /// The channel never had a stance.
    #[error("stance channel {0} was never initialized")]
    InvalidChannel(StanceChannel),
    /// No stance with this name.
    #[error("unknown stance '{0}'")]
    UnknownStance(String),
    /// No stance with this id.
    #[error("unknown stance id {0}")]
    UnknownStanceId(usize),
    /// A stance with this name already exists.
    #[error("stance '{0}' is already defined")]
    DuplicateStance(String),
    /// Transition from a stance to itself.
    #[error("stance '{0}' cannot transition to itself")]
    SelfTransition(String),
}

/// Result type for stance operations.
pub type StanceResult<T> = Result<T, StanceError>;

/// Handle of a stance within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StanceId(usize);

impl StanceId {
    /// Position in the graph.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle callbacks attached to a stance.
#[allow(unused_variables)]
pub trait StanceBehaviour<A: ?Sized> {
    /// The stance became current on `channel`.
    fn on_stance_set(&mut self, actor: &mut A, channel: StanceChannel, forced: bool) {}

    /// The stance stopped being current on `channel`.
    fn on_stance_reset(&mut self, actor: &mut A, channel: StanceChannel, forced: bool) {}

    /// Called every tick while the stance is current on `channel`.
    fn timer(&mut self, actor: &mut A, channel: StanceChannel) {}
}

/// A node of the stance graph.
pub struct StanceDefinition<A: ?Sized> {
    name: String,
    transitions: Vec<StanceId>,
    behaviours: Vec<Box<dyn StanceBehaviour<A>>>,
}

impl<A: ?Sized> StanceDefinition<A> {
    /// Stance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stances reachable in one step.
    #[must_use]
    pub fn transitions(&self) -> &[StanceId] {
        &self.transitions
    }

    /// Whether a direct transition to `target` exists.
    #[must_use]
    pub fn can_transition_to(&self, target: StanceId) -> bool {
        self.transitions.contains(&target)
    }
}

impl<A: ?Sized> fmt::Debug for StanceDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StanceDefinition")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("behaviours", &self.behaviours.len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builds an immutable stance graph.
pub struct StanceGraphBuilder<A: ?Sized> {
    stances: Vec<StanceDefinition<A>>,
    by_name: AHashMap<String, StanceId>,
}

impl<A: ?Sized> StanceGraphBuilder<A> {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stances: Vec::new(),
            by_name: AHashMap::new(),
        }
    }

    /// Add a stance.
    pub fn add_stance(&mut self, name: impl Into<String>) -> StanceResult<StanceId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(StanceError::DuplicateStance(name));
        }
        let id = StanceId(self.stances.len());
        self.by_name.insert(name.clone(), id);
        self.stances.push(StanceDefinition {
            name,
            transitions: Vec::new(),
            behaviours: Vec::new(),
        });
        Ok(id)
    }

    /// Allow `from -> to`. Returns `to`, so paths can be chained.
    pub fn add_transition(&mut self, from: StanceId, to: StanceId) -> StanceResult<StanceId> {
        self.check(to)?;
        let stance = self.stance_mut(from)?;
        if from == to {
            return Err(StanceError::SelfTransition(stance.name.clone()));
        }
        if !stance.transitions.contains(&to) {
            stance.transitions.push(to);
        }
        Ok(to)
    }

    /// Allow every consecutive step along `path`.
    pub fn add_path(&mut self, path: &[StanceId]) -> StanceResult<()> {
        for step in path.windows(2) {
            self.add_transition(step[0], step[1])?;
        }
        Ok(())
    }

    /// Attach a behaviour to a stance.
    pub fn add_behaviour<B>(&mut self, id: StanceId, behaviour: B) -> StanceResult<()>
    where
        B: StanceBehaviour<A> + 'static,
    {
        self.stance_mut(id)?.behaviours.push(Box::new(behaviour));
        Ok(())
    }

    /// Finish the graph. No channel has a stance yet.
    #[must_use]
    pub fn build(self) -> StanceManager<A> {
        StanceManager {
            stances: self.stances,
            by_name: self.by_name,
            channels: BTreeMap::new(),
        }
    }

    fn check(&self, id: StanceId) -> StanceResult<()> {
        if id.0 < self.stances.len() {
            Ok(())
        } else {
            Err(StanceError::UnknownStanceId(id.0))
        }
    }

    fn stance_mut(&mut self, id: StanceId) -> StanceResult<&mut StanceDefinition<A>> {
        self.stances
            .get_mut(id.0)
            .ok_or(StanceError::UnknownStanceId(id.0))
    }
}

impl<A: ?Sized> Default for StanceGraphBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Current stance per channel over a fixed stance graph.
pub struct StanceManager<A: ?Sized> {
    stances: Vec<StanceDefinition<A>>,
    by_name: AHashMap<String, StanceId>,
    channels: BTreeMap<StanceChannel, StanceId>,
}

impl<A: ?Sized> StanceManager<A> {
    /// Look up a stance by name.
    #[must_use]
    pub fn stance_id(&self, name: &str) -> Option<StanceId> {
        self.by_name.get(name).copied()
    }

    /// Stance definition for an id.
    pub fn definition(&self, id: StanceId) -> StanceResult<&StanceDefinition<A>> {
        self.stances
            .get(id.0)
            .ok_or(StanceError::UnknownStanceId(id.0))
    }

    /// Current stance id on `channel`, if initialized.
    #[must_use]
    pub fn current(&self, channel: StanceChannel) -> Option<StanceId> {
        self.channels.get(&channel).copied()
    }

    /// Current stance on `channel`.
    pub fn get_stance(&self, channel: StanceChannel) -> StanceResult<&StanceDefinition<A>> {
        let id = self
            .current(channel)
            .ok_or(StanceError::InvalidChannel(channel))?;
        self.definition(id)
    }

    /// Initialized channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = StanceChannel> + '_ {
        self.channels.keys().copied()
    }

    /// Change the stance on `channel`.
    ///
    /// Succeeds if `forced` or the current stance has an edge to `target`.
    /// An uninitialized channel accepts any stance. Switching to the current
    /// stance always fails. On success the old stance's behaviours are reset
    /// before the new ones are set.
    pub fn set_stance(
        &mut self,
        actor: &mut A,
        target: StanceId,
        channel: StanceChannel,
        forced: bool,
    ) -> StanceResult<bool> {
        self.definition(target)?;
        let current = self.current(channel);

        let allowed = match current {
            None => true,
            Some(current) if current == target => false,
            Some(current) => forced || self.stances[current.0].can_transition_to(target),
        };
        if !allowed {
            trace!(
                channel,
                from = current.map(|id| self.stances[id.0].name.as_str()),
                to = %self.stances[target.0].name,
                "Stance transition rejected"
            );
            return Ok(false);
        }

        if let Some(current) = current {
            for behaviour in &mut self.stances[current.0].behaviours {
                behaviour.on_stance_reset(actor, channel, forced);
            }
        }
        self.channels.insert(channel, target);
        for behaviour in &mut self.stances[target.0].behaviours {
            behaviour.on_stance_set(actor, channel, forced);
        }

        debug!(
            channel,
            from = current.map(|id| self.stances[id.0].name.as_str()),
            to = %self.stances[target.0].name,
            forced,
            "Stance changed"
        );
        Ok(true)
    }

    /// Change the stance on `channel` by stance name.
    pub fn set_stance_by_name(
        &mut self,
        actor: &mut A,
        name: &str,
        channel: StanceChannel,
        forced: bool,
    ) -> StanceResult<bool> {
        let target = self
            .stance_id(name)
            .ok_or_else(|| StanceError::UnknownStance(name.to_string()))?;
        self.set_stance(actor, target, channel, forced)
    }

    /// Run the tick callback of every current stance.
    pub fn tick(&mut self, actor: &mut A) {
        let active: Vec<(StanceChannel, StanceId)> =
            self.channels.iter().map(|(c, id)| (*c, *id)).collect();
        for (channel, id) in active {
            for behaviour in &mut self.stances[id.0].behaviours {
                behaviour.timer(actor, channel);
            }
        }
    }
}

impl<A: ?Sized> fmt::Debug for StanceManager<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StanceManager")
            .field("stances", &self.stances)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const STANDING: &str = "Standing";
    const CROUCHING: &str = "Crouching";
    const PRONE: &str = "Prone";
    const WEAPON_IDLE: &str = "WeaponIdle";
    const WEAPON_READY: &str = "WeaponReady";
    const WEAPON_AIMING: &str = "WeaponAiming";

    const WEAPON_CHANNEL: StanceChannel = 1;

    /// Writes every callback into the actor's log.
    struct Recorder(&'static str);

    impl StanceBehaviour<Vec<String>> for Recorder {
        fn on_stance_set(&mut self, actor: &mut Vec<String>, channel: StanceChannel, _forced: bool) {
            actor.push(format!("set {} {channel}", self.0));
        }

        fn on_stance_reset(&mut self, actor: &mut Vec<String>, channel: StanceChannel, _forced: bool) {
            actor.push(format!("reset {} {channel}", self.0));
        }

        fn timer(&mut self, actor: &mut Vec<String>, channel: StanceChannel) {
            actor.push(format!("tick {} {channel}", self.0));
        }
    }

    fn manager() -> (StanceManager<Vec<String>>, Vec<String>) {
        let mut graph = StanceGraphBuilder::new();
        let standing = graph.add_stance(STANDING).expect("new");
        let crouching = graph.add_stance(CROUCHING).expect("new");
        let prone = graph.add_stance(PRONE).expect("new");
        graph
            .add_path(&[standing, crouching, prone, crouching, standing])
            .expect("valid path");

        let idle = graph.add_stance(WEAPON_IDLE).expect("new");
        let ready = graph.add_stance(WEAPON_READY).expect("new");
        let aiming = graph.add_stance(WEAPON_AIMING).expect("new");
        graph.add_path(&[idle, ready, idle]).expect("valid path");
        graph.add_path(&[ready, aiming, ready]).expect("valid path");

        for (id, name) in [(standing, STANDING), (aiming, WEAPON_AIMING)] {
            graph.add_behaviour(id, Recorder(name)).expect("known stance");
        }

        let mut manager = graph.build();
        let mut actor = Vec::new();
        assert!(manager.set_stance(&mut actor, standing, DEFAULT_CHANNEL, false).expect("known"));
        assert!(manager.set_stance(&mut actor, idle, WEAPON_CHANNEL, false).expect("known"));
        actor.clear();
        (manager, actor)
    }

    fn transition(
        manager: &mut StanceManager<Vec<String>>,
        actor: &mut Vec<String>,
        channel: StanceChannel,
        from: &str,
        to: &str,
        expected: bool,
        forced: bool,
    ) {
        assert_eq!(manager.get_stance(channel).expect("initialized").name(), from);
        assert_eq!(
            manager.set_stance_by_name(actor, to, channel, forced).expect("known stance"),
            expected,
            "[{from} => {to}]({channel})"
        );
        let last = if expected { to } else { from };
        assert_eq!(manager.get_stance(channel).expect("initialized").name(), last);
    }

    #[test]
    fn test_initial_stances() {
        let (manager, _) = manager();
        assert_eq!(manager.get_stance(DEFAULT_CHANNEL).expect("initialized").name(), STANDING);
        assert_eq!(manager.get_stance(WEAPON_CHANNEL).expect("initialized").name(), WEAPON_IDLE);
        assert_eq!(manager.get_stance(7).map(StanceDefinition::name), Err(StanceError::InvalidChannel(7)));
    }

    #[test]
    fn test_posture_transitions() {
        let (mut m, mut a) = manager();
        let c = DEFAULT_CHANNEL;
        transition(&mut m, &mut a, c, STANDING, STANDING, false, false);
        transition(&mut m, &mut a, c, STANDING, PRONE, false, false);
        transition(&mut m, &mut a, c, STANDING, CROUCHING, true, false);
        transition(&mut m, &mut a, c, CROUCHING, CROUCHING, false, false);
        transition(&mut m, &mut a, c, CROUCHING, PRONE, true, false);
        transition(&mut m, &mut a, c, PRONE, PRONE, false, false);
        transition(&mut m, &mut a, c, PRONE, STANDING, false, false);
        transition(&mut m, &mut a, c, PRONE, CROUCHING, true, false);
        transition(&mut m, &mut a, c, CROUCHING, STANDING, true, false);
    }

    #[test]
    fn test_weapon_transitions() {
        let (mut m, mut a) = manager();
        let c = WEAPON_CHANNEL;
        transition(&mut m, &mut a, c, WEAPON_IDLE, WEAPON_IDLE, false, false);
        transition(&mut m, &mut a, c, WEAPON_IDLE, WEAPON_AIMING, false, false);
        transition(&mut m, &mut a, c, WEAPON_IDLE, WEAPON_READY, true, false);
        transition(&mut m, &mut a, c, WEAPON_READY, WEAPON_READY, false, false);
        transition(&mut m, &mut a, c, WEAPON_READY, WEAPON_AIMING, true, false);
        transition(&mut m, &mut a, c, WEAPON_AIMING, WEAPON_AIMING, false, false);
        transition(&mut m, &mut a, c, WEAPON_AIMING, WEAPON_IDLE, false, false);
        transition(&mut m, &mut a, c, WEAPON_AIMING, WEAPON_READY, true, false);
        transition(&mut m, &mut a, c, WEAPON_READY, WEAPON_IDLE, true, false);
    }

    #[test]
    fn test_no_transitions_across_graphs() {
        let (mut m, mut a) = manager();
        for target in [WEAPON_IDLE, WEAPON_AIMING, WEAPON_READY] {
            transition(&mut m, &mut a, DEFAULT_CHANNEL, STANDING, target, false, false);
        }
    }

    #[test]
    fn test_forced_transitions() {
        let (mut m, mut a) = manager();
        let c = DEFAULT_CHANNEL;
        transition(&mut m, &mut a, c, STANDING, STANDING, false, true);
        transition(&mut m, &mut a, c, STANDING, PRONE, true, true);
        transition(&mut m, &mut a, c, PRONE, PRONE, false, true);
        transition(&mut m, &mut a, c, PRONE, STANDING, true, true);
        transition(&mut m, &mut a, c, STANDING, WEAPON_AIMING, true, true);
    }

    #[test]
    fn test_behaviour_callbacks_in_order() {
        let (mut m, mut a) = manager();
        m.set_stance_by_name(&mut a, CROUCHING, DEFAULT_CHANNEL, false).expect("known");
        m.set_stance_by_name(&mut a, WEAPON_READY, WEAPON_CHANNEL, false).expect("known");
        m.set_stance_by_name(&mut a, WEAPON_AIMING, WEAPON_CHANNEL, false).expect("known");
        m.tick(&mut a);
        m.set_stance_by_name(&mut a, WEAPON_READY, WEAPON_CHANNEL, false).expect("known");

        assert_eq!(
            a,
            vec![
                "reset Standing 0".to_string(),
                "set WeaponAiming 1".to_string(),
                "tick WeaponAiming 1".to_string(),
                "reset WeaponAiming 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_graph_build_errors() {
        let mut graph = StanceGraphBuilder::<()>::new();
        let a = graph.add_stance("A").expect("new");
        assert_eq!(graph.add_stance("A"), Err(StanceError::DuplicateStance("A".to_string())));
        assert_eq!(graph.add_transition(a, a), Err(StanceError::SelfTransition("A".to_string())));
        assert_eq!(
            graph.add_transition(a, StanceId(9)),
            Err(StanceError::UnknownStanceId(9))
        );

        let mut manager = graph.build();
        assert_eq!(
            manager.set_stance_by_name(&mut (), "B", 0, false),
            Err(StanceError::UnknownStance("B".to_string()))
        );
    }

    proptest! {
        #[test]
        fn test_channels_are_independent(targets in prop::collection::vec((0usize..6, any::<bool>()), 0..40)) {
            let (mut m, mut a) = manager();
            let posture = m.current(DEFAULT_CHANNEL);
            let names = [STANDING, CROUCHING, PRONE, WEAPON_IDLE, WEAPON_READY, WEAPON_AIMING];
            for (target, forced) in targets {
                let before = m.current(WEAPON_CHANNEL);
                let changed = m.set_stance_by_name(&mut a, names[target], WEAPON_CHANNEL, forced).expect("known");
                prop_assert_eq!(m.current(DEFAULT_CHANNEL), posture);
                prop_assert_eq!(changed, m.current(WEAPON_CHANNEL) != before);
            }
        }
    }
}

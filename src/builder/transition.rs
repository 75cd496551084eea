//! Builder for constructing transitions.

use crate::chart::{Transition, Trigger};
use crate::core::{Action, Guard, Statechart};
use std::fmt;
use std::time::Duration;

/// Builder for one transition, attached to a state with
/// [`StateBuilder::on`](crate::builder::StateBuilder::on).
///
/// The source is the state the builder is attached to. Without `.to()` the
/// transition is targetless and only runs its actions.
pub struct TransitionBuilder<M: Statechart> {
    trigger: Trigger,
    target: Option<M::State>,
    guard: Option<Guard<M>>,
    actions: Vec<Action<M>>,
    reenter: bool,
}

impl<M: Statechart> TransitionBuilder<M> {
    fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            target: None,
            guard: None,
            actions: Vec::new(),
            reenter: false,
        }
    }

    /// React to an external event with this name.
    pub fn on(event: &'static str) -> Self {
        Self::new(Trigger::Event(event))
    }

    /// Fire once `delay` has elapsed since the source state was entered.
    pub fn after(delay: Duration) -> Self {
        Self::new(Trigger::After(delay))
    }

    /// Shorthand for [`after`](Self::after) in milliseconds.
    pub fn after_ms(millis: u64) -> Self {
        Self::after(Duration::from_millis(millis))
    }

    /// React to the source state completing.
    pub fn done() -> Self {
        Self::new(Trigger::Done)
    }

    /// React to the source state's invocation succeeding.
    pub fn invoke_done() -> Self {
        Self::new(Trigger::InvokeDone)
    }

    /// React to the source state's invocation failing.
    pub fn invoke_error() -> Self {
        Self::new(Trigger::InvokeError)
    }

    /// Set the target state.
    pub fn to(mut self, state: M::State) -> Self {
        self.target = Some(state);
        self
    }

    /// Add a guard; the transition is only enabled while it holds.
    pub fn when(mut self, guard: Guard<M>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Append an action, run in declaration order.
    pub fn action(mut self, action: Action<M>) -> Self {
        self.actions.push(action);
        self
    }

    /// Exit and re-enter the target even when it is the source itself.
    pub fn reenter(mut self) -> Self {
        self.reenter = true;
        self
    }

    pub(crate) fn build(self, source: M::State) -> Transition<M> {
        Transition {
            trigger: self.trigger,
            source,
            target: self.target,
            guard: self.guard,
            actions: self.actions,
            reenter: self.reenter,
        }
    }
}

impl<M: Statechart> fmt::Debug for TransitionBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionBuilder")
            .field("trigger", &self.trigger)
            .field("target", &self.target)
            .field("reenter", &self.reenter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Context, Event, Signal, State};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Idle,
        Busy,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Idle => "Idle",
                Self::Busy => "Busy",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Go;

    impl Event for Go {
        fn name(&self) -> &'static str {
            "GO"
        }
    }

    #[derive(Clone, Debug, Default, Serialize)]
    struct Counter {
        count: u32,
    }

    impl Context for Counter {
        type Patch = u32;
        fn apply(&mut self, patch: u32) {
            self.count = patch;
        }
    }

    struct TestChart;

    impl Statechart for TestChart {
        type State = TestState;
        type Event = Go;
        type Context = Counter;
        type Output = ();
        type Host = ();
    }

    #[test]
    fn fluent_api_builds_transition() {
        let transition = TransitionBuilder::<TestChart>::on("GO")
            .to(TestState::Busy)
            .when(Guard::context("below limit", |ctx: &Counter| ctx.count < 3))
            .action(Action::assign("increment", |ctx: &Counter, _| ctx.count + 1))
            .build(TestState::Idle);

        assert_eq!(transition.trigger, Trigger::Event("GO"));
        assert_eq!(transition.source, TestState::Idle);
        assert_eq!(transition.target, Some(TestState::Busy));
        assert_eq!(transition.actions.len(), 1);
        assert!(!transition.reenter);
        assert!(transition.is_enabled(&Counter { count: 0 }, &Signal::Event(Go)));
        assert!(!transition.is_enabled(&Counter { count: 3 }, &Signal::Event(Go)));
    }

    #[test]
    fn builder_without_target_is_targetless() {
        let transition = TransitionBuilder::<TestChart>::on("GO").build(TestState::Idle);

        assert!(transition.target.is_none());
        assert!(transition.is_action_only());
    }

    #[test]
    fn delayed_builder_carries_delay() {
        let transition = TransitionBuilder::<TestChart>::after_ms(150)
            .to(TestState::Idle)
            .reenter()
            .build(TestState::Busy);

        assert_eq!(transition.trigger, Trigger::After(Duration::from_millis(150)));
        assert_eq!(transition.delay(), Some(Duration::from_millis(150)));
        assert!(transition.reenter);
    }
}

//! Guard predicates for controlling state transitions.
//!
//! Guards are pure boolean functions over the context and the signal being
//! processed. They decide whether a transition is enabled and never write to
//! the context.

use super::signal::Signal;
use super::state::Statechart;
use std::fmt;
use std::sync::Arc;

type Predicate<M> = dyn Fn(&<M as Statechart>::Context, &Signal<M>) -> bool + Send + Sync;

/// Pure predicate that determines if a transition can execute.
///
/// A guard must be total. A guard that panics is treated as a programming
/// defect by the interpreter and surfaces from the call that evaluated it.
///
/// # Example
///
/// ```rust
/// use chartmind::core::{Context, Event, Guard, Signal, State, Statechart};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Node { Root }
///
/// impl State for Node {
///     fn name(&self) -> &'static str { "Root" }
/// }
///
/// #[derive(Clone, Debug)]
/// struct Tick;
///
/// impl Event for Tick {
///     fn name(&self) -> &'static str { "TICK" }
/// }
///
/// #[derive(Clone, Debug, Default, Serialize)]
/// struct Count(u32);
///
/// impl Context for Count {
///     type Patch = u32;
///     fn apply(&mut self, patch: u32) { self.0 = patch; }
/// }
///
/// struct Counter;
///
/// impl Statechart for Counter {
///     type State = Node;
///     type Event = Tick;
///     type Context = Count;
///     type Output = ();
///     type Host = ();
/// }
///
/// let below_limit = Guard::<Counter>::context("below_limit", |ctx| ctx.0 < 3);
///
/// assert!(below_limit.check(&Count(2), &Signal::Event(Tick)));
/// assert!(!below_limit.check(&Count(3), &Signal::Event(Tick)));
/// ```
pub struct Guard<M: Statechart> {
    name: &'static str,
    predicate: Arc<Predicate<M>>,
}

impl<M: Statechart> Guard<M> {
    /// Create a guard from a pure predicate over context and signal.
    pub fn new<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&M::Context, &Signal<M>) -> bool + Send + Sync + 'static,
    {
        Guard {
            name,
            predicate: Arc::new(predicate),
        }
    }

    /// Create a guard that only inspects the context.
    pub fn context<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&M::Context) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |ctx, _| predicate(ctx))
    }

    /// Create a guard that only inspects the external event payload.
    ///
    /// Internal signals never satisfy an event guard.
    pub fn event<F>(name: &'static str, predicate: F) -> Self
    where
        F: Fn(&M::Event) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |_, signal| {
            signal.event().is_some_and(|event| predicate(event))
        })
    }

    /// Negate this guard.
    pub fn negate(self) -> Self {
        let inner = self.predicate;
        Self::new(self.name, move |ctx, signal| !inner(ctx, signal))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Check if the guard allows the transition.
    pub fn check(&self, context: &M::Context, signal: &Signal<M>) -> bool {
        (self.predicate)(context, signal)
    }
}

impl<M: Statechart> Clone for Guard<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<M: Statechart> fmt::Debug for Guard<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Guard").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Context, Event, State};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Root,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            "Root"
        }
    }

    #[derive(Clone, Debug)]
    enum TestEvent {
        Submit { text: String },
        Reset,
    }

    impl Event for TestEvent {
        fn name(&self) -> &'static str {
            match self {
                Self::Submit { .. } => "SUBMIT",
                Self::Reset => "RESET",
            }
        }
    }

    #[derive(Clone, Debug, Default, Serialize)]
    struct TestContext {
        enabled: bool,
    }

    impl Context for TestContext {
        type Patch = bool;
        fn apply(&mut self, patch: bool) {
            self.enabled = patch;
        }
    }

    struct TestChart;

    impl Statechart for TestChart {
        type State = TestState;
        type Event = TestEvent;
        type Context = TestContext;
        type Output = ();
        type Host = ();
    }

    fn submit(text: &str) -> Signal<TestChart> {
        Signal::Event(TestEvent::Submit {
            text: text.to_string(),
        })
    }

    #[test]
    fn context_guard_reads_context() {
        let guard = Guard::<TestChart>::context("enabled", |ctx| ctx.enabled);

        assert!(guard.check(&TestContext { enabled: true }, &submit("a")));
        assert!(!guard.check(&TestContext { enabled: false }, &submit("a")));
    }

    #[test]
    fn event_guard_reads_payload() {
        let guard = Guard::<TestChart>::event("has_text", |event| {
            matches!(event, TestEvent::Submit { text } if !text.is_empty())
        });
        let ctx = TestContext::default();

        assert!(guard.check(&ctx, &submit("hello")));
        assert!(!guard.check(&ctx, &submit("")));
        assert!(!guard.check(&ctx, &Signal::Event(TestEvent::Reset)));
        assert!(!guard.check(&ctx, &Signal::Done { state: TestState::Root }));
    }

    #[test]
    fn negated_guard_inverts_result() {
        let guard = Guard::<TestChart>::context("enabled", |ctx| ctx.enabled).negate();

        assert!(!guard.check(&TestContext { enabled: true }, &submit("a")));
        assert!(guard.check(&TestContext { enabled: false }, &submit("a")));
        assert_eq!(guard.name(), "enabled");
    }

    #[test]
    fn guard_is_deterministic() {
        let guard = Guard::<TestChart>::context("enabled", |ctx| ctx.enabled);
        let ctx = TestContext { enabled: true };
        let signal = submit("x");

        assert_eq!(guard.check(&ctx, &signal), guard.check(&ctx, &signal));
    }

    #[test]
    fn cloned_guard_shares_predicate() {
        let guard = Guard::<TestChart>::context("enabled", |ctx| ctx.enabled);
        let cloned = guard.clone();

        assert_eq!(cloned.name(), guard.name());
        assert!(cloned.check(&TestContext { enabled: true }, &submit("a")));
    }
}

//! Entry, exit and transition actions.

use super::context::Context;
use super::signal::Signal;
use super::state::Statechart;
use std::fmt;
use std::sync::Arc;

type AssignFn<M> = dyn Fn(&<M as Statechart>::Context, &Signal<M>) -> Vec<<<M as Statechart>::Context as Context>::Patch>
    + Send
    + Sync;

type EffectFn<M> =
    dyn Fn(&<M as Statechart>::Context, &Signal<M>, &<M as Statechart>::Host) + Send + Sync;

enum ActionKind<M: Statechart> {
    Assign(Arc<AssignFn<M>>),
    Effect(Arc<EffectFn<M>>),
}

/// A named action run on entry, on exit, or while a transition is taken.
///
/// An action either assigns context fields (returns patches, applied in
/// order) or performs a side effect through the host collaborators. Effects
/// see the context as it is at that point of the step but cannot change it.
pub struct Action<M: Statechart> {
    name: &'static str,
    kind: ActionKind<M>,
}

impl<M: Statechart> Action<M> {
    /// An action assigning a single context field.
    pub fn assign<F>(name: &'static str, assign: F) -> Self
    where
        F: Fn(&M::Context, &Signal<M>) -> <M::Context as Context>::Patch + Send + Sync + 'static,
    {
        Self::assign_many(name, move |ctx, signal| vec![assign(ctx, signal)])
    }

    /// An action assigning any number of context fields.
    pub fn assign_many<F>(name: &'static str, assign: F) -> Self
    where
        F: Fn(&M::Context, &Signal<M>) -> Vec<<M::Context as Context>::Patch>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            kind: ActionKind::Assign(Arc::new(assign)),
        }
    }

    /// An action producing a side effect through the host.
    pub fn effect<F>(name: &'static str, effect: F) -> Self
    where
        F: Fn(&M::Context, &Signal<M>, &M::Host) + Send + Sync + 'static,
    {
        Self {
            name,
            kind: ActionKind::Effect(Arc::new(effect)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_assign(&self) -> bool {
        matches!(self.kind, ActionKind::Assign(_))
    }

    /// Run the action against the machine's context.
    pub fn execute(&self, context: &mut M::Context, signal: &Signal<M>, host: &M::Host) {
        match &self.kind {
            ActionKind::Assign(assign) => {
                let patches = assign(context, signal);
                context.apply_all(patches);
            }
            ActionKind::Effect(effect) => effect(context, signal, host),
        }
    }
}

impl<M: Statechart> Clone for Action<M> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            ActionKind::Assign(assign) => ActionKind::Assign(Arc::clone(assign)),
            ActionKind::Effect(effect) => ActionKind::Effect(Arc::clone(effect)),
        };
        Self {
            name: self.name,
            kind,
        }
    }
}

impl<M: Statechart> fmt::Debug for Action<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_assign() { "assign" } else { "effect" };
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Event, State};
    use parking_lot::Mutex;
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
    struct Add(i32);

    impl Event for Add {
        fn name(&self) -> &'static str {
            "ADD"
        }
    }

    #[derive(Clone, Debug, Default, Serialize)]
    struct Tally {
        sum: i32,
        updates: u32,
    }

    #[derive(Debug)]
    enum TallyPatch {
        Sum(i32),
        Updates(u32),
    }

    impl Context for Tally {
        type Patch = TallyPatch;

        fn apply(&mut self, patch: TallyPatch) {
            match patch {
                TallyPatch::Sum(sum) => self.sum = sum,
                TallyPatch::Updates(updates) => self.updates = updates,
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<i32>>>,
    }

    struct TestChart;

    impl Statechart for TestChart {
        type State = TestState;
        type Event = Add;
        type Context = Tally;
        type Output = ();
        type Host = Recorder;
    }

    fn amount(signal: &Signal<TestChart>) -> i32 {
        signal.event().map(|Add(n)| *n).unwrap_or_default()
    }

    #[test]
    fn assign_applies_patches_in_order() {
        let action = Action::<TestChart>::assign_many("add", |ctx, signal| {
            vec![
                TallyPatch::Sum(ctx.sum + amount(signal)),
                TallyPatch::Updates(ctx.updates + 1),
            ]
        });
        let mut ctx = Tally::default();
        let host = Recorder::default();

        action.execute(&mut ctx, &Signal::Event(Add(5)), &host);
        action.execute(&mut ctx, &Signal::Event(Add(2)), &host);

        assert_eq!(ctx.sum, 7);
        assert_eq!(ctx.updates, 2);
        assert!(action.is_assign());
    }

    #[test]
    fn effect_reaches_host_without_touching_context() {
        let action = Action::<TestChart>::effect("record", |ctx, signal, host| {
            host.seen.lock().push(ctx.sum + amount(signal));
        });
        let mut ctx = Tally {
            sum: 10,
            updates: 0,
        };
        let host = Recorder::default();

        action.execute(&mut ctx, &Signal::Event(Add(1)), &host);

        assert_eq!(*host.seen.lock(), vec![11]);
        assert_eq!(ctx.sum, 10);
        assert!(!action.is_assign());
    }

    #[test]
    fn single_assign_sets_one_field() {
        let action = Action::<TestChart>::assign("reset", |_, _| TallyPatch::Sum(0));
        let mut ctx = Tally { sum: 4, updates: 3 };

        action.execute(&mut ctx, &Signal::Event(Add(1)), &Recorder::default());

        assert_eq!(ctx.sum, 0);
        assert_eq!(ctx.updates, 3);
        assert_eq!(action.name(), "reset");
    }
}

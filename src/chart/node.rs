//! Nodes, transitions and invocations of a chart.

use crate::core::{Action, Event, Guard, InvokeError, Signal, Statechart};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stillwater::effect::BoxedEffect;

/// How much of the parent's configuration a history node restores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryMode {
    /// Restore the parent's direct child only; it re-enters its own defaults.
    Shallow,
    /// Restore the full nested configuration below the parent.
    Deep,
}

/// Kind of a chart node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Atomic,
    /// Exactly one child active at a time.
    Compound,
    /// Every child region active at once.
    Parallel,
    /// Pseudo-state resolved to a remembered configuration on entry.
    History(HistoryMode),
    /// Terminal for its containing region.
    Final,
}

impl NodeKind {
    pub fn is_atomic(self) -> bool {
        matches!(self, Self::Atomic | Self::Final)
    }

    pub fn is_history(self) -> bool {
        matches!(self, Self::History(_))
    }
}

/// What a transition reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// An external event with this name.
    Event(&'static str),
    /// A delay elapsed since the source node was entered.
    After(Duration),
    /// The source node's invocation succeeded.
    InvokeDone,
    /// The source node's invocation failed.
    InvokeError,
    /// The source node completed.
    Done,
}

impl Trigger {
    /// Whether a signal addressed to the chart can fire this trigger.
    ///
    /// Timer signals are routed by index instead, so `After` never matches.
    pub fn matches<M: Statechart>(&self, signal: &Signal<M>) -> bool {
        match (self, signal) {
            (Self::Event(name), Signal::Event(event)) => *name == event.name(),
            (Self::InvokeDone, Signal::InvokeDone { .. }) => true,
            (Self::InvokeError, Signal::InvokeError { .. }) => true,
            (Self::Done, Signal::Done { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(name) => write!(f, "{name}"),
            Self::After(delay) => write!(f, "after({}ms)", delay.as_millis()),
            Self::InvokeDone => write!(f, "invoke.done"),
            Self::InvokeError => write!(f, "invoke.error"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A transition declared on `source`.
pub struct Transition<M: Statechart> {
    pub trigger: Trigger,
    pub source: M::State,
    /// `None` for a targetless transition, which only runs its actions.
    pub target: Option<M::State>,
    pub guard: Option<Guard<M>>,
    pub actions: Vec<Action<M>>,
    /// Exit and re-enter even when the target is the source itself.
    pub reenter: bool,
}

impl<M: Statechart> Transition<M> {
    /// Check the guard, if any (pure).
    pub fn is_enabled(&self, context: &M::Context, signal: &Signal<M>) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(context, signal))
    }

    /// True if taking this transition leaves the configuration unchanged.
    pub fn is_action_only(&self) -> bool {
        match self.target {
            None => true,
            Some(target) => target == self.source && !self.reenter,
        }
    }

    pub fn delay(&self) -> Option<Duration> {
        match self.trigger {
            Trigger::After(delay) => Some(delay),
            _ => None,
        }
    }
}

impl<M: Statechart> Clone for Transition<M> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger,
            source: self.source,
            target: self.target,
            guard: self.guard.clone(),
            actions: self.actions.clone(),
            reenter: self.reenter,
        }
    }
}

impl<M: Statechart> fmt::Debug for Transition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("trigger", &self.trigger)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("guard", &self.guard)
            .field("actions", &self.actions)
            .field("reenter", &self.reenter)
            .finish()
    }
}

/// Type alias for invocation factories.
/// A fresh effect is built from the context every time the state is entered.
pub type InvocationFactory<M> = Arc<
    dyn Fn(
            &<M as Statechart>::Context,
        ) -> BoxedEffect<<M as Statechart>::Output, InvokeError, <M as Statechart>::Host>
        + Send
        + Sync,
>;

/// An asynchronous operation tied to the lifetime of one state.
pub struct Invocation<M: Statechart> {
    name: &'static str,
    factory: InvocationFactory<M>,
}

impl<M: Statechart> Invocation<M> {
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(&M::Context) -> BoxedEffect<M::Output, InvokeError, M::Host> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Build the effect for one entry of the invoking state.
    pub fn operation(&self, context: &M::Context) -> BoxedEffect<M::Output, InvokeError, M::Host> {
        (self.factory)(context)
    }
}

impl<M: Statechart> Clone for Invocation<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<M: Statechart> fmt::Debug for Invocation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Invocation").field(&self.name).finish()
    }
}

/// One node of the chart tree.
///
/// The parent is referenced by id only; the definition owns every node.
pub struct StateNode<M: Statechart> {
    pub(crate) id: M::State,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<M::State>,
    pub(crate) children: Vec<M::State>,
    pub(crate) initial: Option<M::State>,
    /// Default target of a history node with no record.
    pub(crate) history_default: Option<M::State>,
    pub(crate) entry: Vec<Action<M>>,
    pub(crate) exit: Vec<Action<M>>,
    pub(crate) transitions: Vec<Transition<M>>,
    pub(crate) delayed: Vec<Transition<M>>,
    pub(crate) invocation: Option<Invocation<M>>,
    pub(crate) depth: usize,
    pub(crate) order: usize,
}

impl<M: Statechart> StateNode<M> {
    pub fn id(&self) -> M::State {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<M::State> {
        self.parent
    }

    pub fn children(&self) -> &[M::State] {
        &self.children
    }

    pub fn initial(&self) -> Option<M::State> {
        self.initial
    }

    pub fn history_default(&self) -> Option<M::State> {
        self.history_default
    }

    pub fn entry_actions(&self) -> &[Action<M>] {
        &self.entry
    }

    pub fn exit_actions(&self) -> &[Action<M>] {
        &self.exit
    }

    pub fn transitions(&self) -> &[Transition<M>] {
        &self.transitions
    }

    pub fn delayed_transitions(&self) -> &[Transition<M>] {
        &self.delayed
    }

    pub fn invocation(&self) -> Option<&Invocation<M>> {
        self.invocation.as_ref()
    }

    /// Distance from the root (root is 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pre-order position in the chart.
    pub fn order(&self) -> usize {
        self.order
    }

    pub fn is_final(&self) -> bool {
        self.kind == NodeKind::Final
    }

    pub fn is_compound(&self) -> bool {
        self.kind == NodeKind::Compound
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == NodeKind::Parallel
    }

    pub fn is_history(&self) -> bool {
        self.kind.is_history()
    }

    pub fn is_atomic(&self) -> bool {
        self.kind.is_atomic()
    }
}

impl<M: Statechart> fmt::Debug for StateNode<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("initial", &self.initial)
            .finish_non_exhaustive()
    }
}

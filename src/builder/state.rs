//! Builder for one node of the chart tree and its subtree.

use super::transition::TransitionBuilder;
use crate::chart::{HistoryMode, Invocation, NodeKind};
use crate::core::{Action, Statechart};
use std::fmt;

/// Fluent description of a state, its behaviour and its children.
///
/// Children are nested builders, so the Rust expression mirrors the shape of
/// the chart:
///
/// ```rust,ignore
/// StateBuilder::compound(Input, Typing)
///     .child(StateBuilder::atomic(Typing).on(TransitionBuilder::on("RECORD").to(Recording)))
///     .child(StateBuilder::atomic(Recording))
///     .child(StateBuilder::history(InputHistory, HistoryMode::Deep))
/// ```
pub struct StateBuilder<M: Statechart> {
    pub(crate) id: M::State,
    pub(crate) kind: NodeKind,
    pub(crate) initial: Option<M::State>,
    pub(crate) history_default: Option<M::State>,
    pub(crate) children: Vec<StateBuilder<M>>,
    pub(crate) entry: Vec<Action<M>>,
    pub(crate) exit: Vec<Action<M>>,
    pub(crate) transitions: Vec<TransitionBuilder<M>>,
    pub(crate) invocation: Option<Invocation<M>>,
}

impl<M: Statechart> StateBuilder<M> {
    fn new(id: M::State, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            initial: None,
            history_default: None,
            children: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            transitions: Vec::new(),
            invocation: None,
        }
    }

    /// A leaf state.
    pub fn atomic(id: M::State) -> Self {
        Self::new(id, NodeKind::Atomic)
    }

    /// A state with exactly one active child, starting at `initial`.
    pub fn compound(id: M::State, initial: M::State) -> Self {
        let mut builder = Self::new(id, NodeKind::Compound);
        builder.initial = Some(initial);
        builder
    }

    /// A state whose children are all active at once.
    pub fn parallel(id: M::State) -> Self {
        Self::new(id, NodeKind::Parallel)
    }

    /// A terminal leaf for its containing region.
    pub fn final_state(id: M::State) -> Self {
        Self::new(id, NodeKind::Final)
    }

    /// A history pseudo-state of its parent.
    pub fn history(id: M::State, mode: HistoryMode) -> Self {
        Self::new(id, NodeKind::History(mode))
    }

    /// Target of a history node entered before its parent was ever exited.
    /// Defaults to the parent's initial child.
    pub fn default_to(mut self, state: M::State) -> Self {
        self.history_default = Some(state);
        self
    }

    pub fn child(mut self, child: StateBuilder<M>) -> Self {
        self.children.push(child);
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = StateBuilder<M>>,
    {
        self.children.extend(children);
        self
    }

    pub fn entry(mut self, action: Action<M>) -> Self {
        self.entry.push(action);
        self
    }

    pub fn exit(mut self, action: Action<M>) -> Self {
        self.exit.push(action);
        self
    }

    /// Declare a transition with this state as its source.
    pub fn on(mut self, transition: TransitionBuilder<M>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Start `invocation` every time this state is entered.
    pub fn invoke(mut self, invocation: Invocation<M>) -> Self {
        self.invocation = Some(invocation);
        self
    }

    pub fn id(&self) -> M::State {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

impl<M: Statechart> fmt::Debug for StateBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBuilder")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

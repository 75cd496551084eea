//! The immutable chart tree.

use super::node::{NodeKind, StateNode};
use crate::core::Statechart;
use std::collections::HashMap;
use std::fmt;

/// A validated, immutable statechart.
///
/// Built once by [`ChartBuilder`](crate::builder::ChartBuilder) and shared
/// read-only (behind an `Arc`) by every interpreter running it. Node lookups
/// return `Option` so that identifiers outside the chart are never a panic.
pub struct ChartDefinition<M: Statechart> {
    root: M::State,
    nodes: HashMap<M::State, StateNode<M>>,
}

impl<M: Statechart> ChartDefinition<M> {
    /// Assemble a definition from validated nodes, assigning depth and
    /// document order by a pre-order walk from the root.
    pub(crate) fn from_nodes(root: M::State, mut nodes: HashMap<M::State, StateNode<M>>) -> Self {
        let mut order = 0;
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = nodes.get_mut(&id) else {
                continue;
            };
            node.depth = depth;
            node.order = order;
            order += 1;
            for child in node.children.iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        Self { root, nodes }
    }

    pub fn root(&self) -> M::State {
        self.root
    }

    pub fn node(&self, state: M::State) -> Option<&StateNode<M>> {
        self.nodes.get(&state)
    }

    pub fn contains(&self, state: M::State) -> bool {
        self.nodes.contains_key(&state)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node, in document order.
    pub fn nodes(&self) -> Vec<&StateNode<M>> {
        let mut nodes: Vec<_> = self.nodes.values().collect();
        nodes.sort_by_key(|node| node.order);
        nodes
    }

    pub fn kind(&self, state: M::State) -> Option<NodeKind> {
        self.node(state).map(StateNode::kind)
    }

    pub fn parent(&self, state: M::State) -> Option<M::State> {
        self.node(state).and_then(StateNode::parent)
    }

    pub fn children(&self, state: M::State) -> &[M::State] {
        self.node(state).map(StateNode::children).unwrap_or_default()
    }

    pub fn depth(&self, state: M::State) -> usize {
        self.node(state).map(StateNode::depth).unwrap_or_default()
    }

    pub fn order(&self, state: M::State) -> usize {
        self.node(state).map(StateNode::order).unwrap_or(usize::MAX)
    }

    /// Proper ancestors of `state`, nearest first.
    pub fn ancestors(&self, state: M::State) -> Vec<M::State> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(state);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// Proper ancestors of `state` strictly below `bound`, nearest first.
    pub fn ancestors_below(&self, state: M::State, bound: Option<M::State>) -> Vec<M::State> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(state);
        while let Some(parent) = current {
            if Some(parent) == bound {
                break;
            }
            ancestors.push(parent);
            current = self.parent(parent);
        }
        ancestors
    }

    /// True if `state` lies strictly below `ancestor`.
    pub fn is_descendant(&self, state: M::State, ancestor: M::State) -> bool {
        let mut current = self.parent(state);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// True if `state` is `ancestor` or lies below it.
    pub fn is_within(&self, state: M::State, ancestor: M::State) -> bool {
        state == ancestor || self.is_descendant(state, ancestor)
    }

    /// Least common compound ancestor.
    ///
    /// The nearest compound proper ancestor of the first state that contains
    /// every other state. Parallel nodes are skipped, so two states in
    /// different regions resolve above their parallel node.
    pub fn lcca(&self, states: &[M::State]) -> Option<M::State> {
        let (first, rest) = states.split_first()?;
        self.ancestors(*first).into_iter().find(|ancestor| {
            self.kind(*ancestor) == Some(NodeKind::Compound)
                && rest.iter().all(|s| self.is_descendant(*s, *ancestor))
        })
    }

    /// History pseudo-states owned by `state`.
    pub fn history_children(&self, state: M::State) -> impl Iterator<Item = M::State> + '_ {
        self.children(state)
            .iter()
            .copied()
            .filter(|child| self.kind(*child).is_some_and(NodeKind::is_history))
    }

    /// Non-history children: the regions of a parallel node or the
    /// alternatives of a compound node.
    pub fn substates(&self, state: M::State) -> impl Iterator<Item = M::State> + '_ {
        self.children(state)
            .iter()
            .copied()
            .filter(|child| self.kind(*child).is_some_and(|kind| !kind.is_history()))
    }

    /// Sort states into document order.
    pub fn sort_document_order(&self, states: &mut [M::State]) {
        states.sort_by_key(|s| self.order(*s));
    }

    /// Sort states deepest first, reverse document order among equals.
    pub fn sort_exit_order(&self, states: &mut [M::State]) {
        states.sort_by(|a, b| {
            self.depth(*b)
                .cmp(&self.depth(*a))
                .then(self.order(*b).cmp(&self.order(*a)))
        });
    }

    /// Sort states shallowest first, document order among equals.
    pub fn sort_entry_order(&self, states: &mut [M::State]) {
        states.sort_by(|a, b| {
            self.depth(*a)
                .cmp(&self.depth(*b))
                .then(self.order(*a).cmp(&self.order(*b)))
        });
    }
}

impl<M: Statechart> fmt::Debug for ChartDefinition<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartDefinition")
            .field("root", &self.root)
            .field("nodes", &self.nodes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ChartBuilder, StateBuilder};
    use crate::core::{Context, Event, State};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Root,
        Main,
        Left,
        LeftA,
        LeftB,
        Right,
        RightA,
        Other,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Root => "Root",
                Self::Main => "Main",
                Self::Left => "Left",
                Self::LeftA => "LeftA",
                Self::LeftB => "LeftB",
                Self::Right => "Right",
                Self::RightA => "RightA",
                Self::Other => "Other",
            }
        }
    }

    #[derive(Clone, Debug)]
    struct Nop;

    impl Event for Nop {
        fn name(&self) -> &'static str {
            "NOP"
        }
    }

    #[derive(Clone, Debug, Default, Serialize)]
    struct Empty;

    impl Context for Empty {
        type Patch = ();
        fn apply(&mut self, _patch: ()) {}
    }

    struct TestChart;

    impl Statechart for TestChart {
        type State = TestState;
        type Event = Nop;
        type Context = Empty;
        type Output = ();
        type Host = ();
    }

    use TestState::*;

    fn chart() -> ChartDefinition<TestChart> {
        ChartBuilder::new(
            StateBuilder::compound(Root, Main)
                .child(
                    StateBuilder::parallel(Main)
                        .child(
                            StateBuilder::compound(Left, LeftA)
                                .child(StateBuilder::atomic(LeftA))
                                .child(StateBuilder::atomic(LeftB)),
                        )
                        .child(
                            StateBuilder::compound(Right, RightA).child(StateBuilder::atomic(RightA)),
                        ),
                )
                .child(StateBuilder::atomic(Other)),
        )
        .build()
        .unwrap()
    }

    #[test]
    fn document_order_is_pre_order() {
        let chart = chart();
        let order: Vec<_> = chart.nodes().iter().map(|n| n.id()).collect();

        assert_eq!(order, vec![Root, Main, Left, LeftA, LeftB, Right, RightA, Other]);
        assert_eq!(chart.depth(LeftB), 3);
        assert_eq!(chart.depth(Root), 0);
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let chart = chart();

        assert_eq!(chart.ancestors(LeftA), vec![Left, Main, Root]);
        assert_eq!(chart.ancestors_below(LeftA, Some(Main)), vec![Left]);
        assert!(chart.ancestors(Root).is_empty());
    }

    #[test]
    fn descendant_checks_are_strict() {
        let chart = chart();

        assert!(chart.is_descendant(LeftA, Main));
        assert!(!chart.is_descendant(Main, Main));
        assert!(chart.is_within(Main, Main));
        assert!(!chart.is_descendant(Other, Main));
    }

    #[test]
    fn lcca_skips_parallel_nodes() {
        let chart = chart();

        assert_eq!(chart.lcca(&[LeftA, LeftB]), Some(Left));
        assert_eq!(chart.lcca(&[LeftA, RightA]), Some(Root));
        assert_eq!(chart.lcca(&[LeftA, Other]), Some(Root));
        assert_eq!(chart.lcca(&[Root]), None);
    }

    #[test]
    fn exit_and_entry_orders_are_mirrored() {
        let chart = chart();
        let mut states = vec![Left, LeftA, Main, RightA, Right];

        chart.sort_exit_order(&mut states);
        assert_eq!(states, vec![RightA, LeftA, Right, Left, Main]);

        chart.sort_entry_order(&mut states);
        assert_eq!(states, vec![Main, Left, Right, LeftA, RightA]);
    }
}

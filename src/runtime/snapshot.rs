//! Read-only views of a running interpreter.

use crate::chart::{ChartDefinition, NodeKind};
use crate::core::{State, Statechart};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of an interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    NotStarted,
    Running,
    /// A final child of the root was entered. Events are discarded.
    Done,
    Stopped,
    /// A defect was hit. Every further call fails.
    Faulted,
}

/// The active configuration as a tree.
///
/// Mirrors the chart: a compound node carries its one active child, a
/// parallel node carries all of its active regions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "snake_case")]
pub enum StateValue<S: State> {
    Leaf(S),
    Compound {
        state: S,
        active: Box<StateValue<S>>,
    },
    Parallel {
        state: S,
        regions: Vec<StateValue<S>>,
    },
}

impl<S: State> StateValue<S> {
    pub fn state(&self) -> S {
        match self {
            Self::Leaf(state)
            | Self::Compound { state, .. }
            | Self::Parallel { state, .. } => *state,
        }
    }

    /// True if `path` is a chain of active states starting at this node.
    ///
    /// The path may stop above the leaves; an empty path always matches.
    pub fn matches(&self, path: &[S]) -> bool {
        let Some((head, rest)) = path.split_first() else {
            return true;
        };
        if *head != self.state() {
            return false;
        }
        match self {
            Self::Leaf(_) => rest.is_empty(),
            Self::Compound { active, .. } => rest.is_empty() || active.matches(rest),
            Self::Parallel { regions, .. } => {
                rest.is_empty() || regions.iter().any(|region| region.matches(rest))
            }
        }
    }

    /// True if `path` matches this node or any node below it.
    pub fn contains(&self, path: &[S]) -> bool {
        if self.matches(path) {
            return true;
        }
        match self {
            Self::Leaf(_) => false,
            Self::Compound { active, .. } => active.contains(path),
            Self::Parallel { regions, .. } => regions.iter().any(|region| region.contains(path)),
        }
    }

    /// Active leaves, left to right.
    pub fn leaves(&self) -> Vec<S> {
        match self {
            Self::Leaf(state) => vec![*state],
            Self::Compound { active, .. } => active.leaves(),
            Self::Parallel { regions, .. } => regions.iter().flat_map(StateValue::leaves).collect(),
        }
    }

    pub(crate) fn build<M>(chart: &ChartDefinition<M>, active: &[S], state: S) -> Self
    where
        M: Statechart<State = S>,
    {
        let children = chart.substates(state).filter(|child| active.contains(child));
        match chart.kind(state) {
            Some(NodeKind::Compound) => match children.take(1).next() {
                Some(child) => Self::Compound {
                    state,
                    active: Box::new(Self::build(chart, active, child)),
                },
                None => Self::Leaf(state),
            },
            Some(NodeKind::Parallel) => Self::Parallel {
                state,
                regions: children
                    .map(|child| Self::build(chart, active, child))
                    .collect(),
            },
            _ => Self::Leaf(state),
        }
    }
}

impl<S: State> fmt::Display for StateValue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(state) => write!(f, "{}", state.name()),
            Self::Compound { state, active } => write!(f, "{}.{}", state.name(), active),
            Self::Parallel { state, regions } => {
                write!(f, "{}.{{", state.name())?;
                for (i, region) in regions.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{region}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Configuration and context after a settled step.
pub struct Snapshot<M: Statechart> {
    pub(crate) chart: Arc<ChartDefinition<M>>,
    pub(crate) configuration: Vec<M::State>,
    pub(crate) context: M::Context,
    pub(crate) status: Status,
    pub(crate) step: u64,
}

impl<M: Statechart> Snapshot<M> {
    /// Active states in document order.
    pub fn configuration(&self) -> &[M::State] {
        &self.configuration
    }

    pub fn context(&self) -> &M::Context {
        &self.context
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of steps settled so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }

    pub fn chart(&self) -> &ChartDefinition<M> {
        &self.chart
    }

    /// True if `state` is active.
    pub fn matches(&self, state: M::State) -> bool {
        self.configuration.contains(&state)
    }

    /// True if `path` names a chain of active states anywhere in the tree,
    /// e.g. `[Input, InputReady, InputTypeMode]`.
    pub fn matches_path(&self, path: &[M::State]) -> bool {
        self.value().is_some_and(|value| value.contains(path))
    }

    /// The configuration as a tree, or `None` before start and after stop.
    pub fn value(&self) -> Option<StateValue<M::State>> {
        let root = self.chart.root();
        self.configuration
            .contains(&root)
            .then(|| StateValue::build(&self.chart, &self.configuration, root))
    }
}

impl<M: Statechart> Clone for Snapshot<M> {
    fn clone(&self) -> Self {
        Self {
            chart: Arc::clone(&self.chart),
            configuration: self.configuration.clone(),
            context: self.context.clone(),
            status: self.status,
            step: self.step,
        }
    }
}

impl<M: Statechart> fmt::Debug for Snapshot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("status", &self.status)
            .field("step", &self.step)
            .field("configuration", &self.configuration)
            .field("context", &self.context)
            .finish()
    }
}

impl<M: Statechart> Serialize for Snapshot<M> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut state = serializer.serialize_struct("Snapshot", 5)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("step", &self.step)?;
        state.serialize_field("value", &self.value())?;
        state.serialize_field("configuration", &self.configuration)?;
        state.serialize_field("context", &self.context)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Root,
        Active,
        Attachment,
        Open,
        Input,
        Ready,
        TypeMode,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Root => "Root",
                Self::Active => "Active",
                Self::Attachment => "Attachment",
                Self::Open => "Open",
                Self::Input => "Input",
                Self::Ready => "Ready",
                Self::TypeMode => "TypeMode",
            }
        }
    }

    use TestState::*;

    fn value() -> StateValue<TestState> {
        StateValue::Compound {
            state: Root,
            active: Box::new(StateValue::Parallel {
                state: Active,
                regions: vec![
                    StateValue::Compound {
                        state: Attachment,
                        active: Box::new(StateValue::Leaf(Open)),
                    },
                    StateValue::Compound {
                        state: Input,
                        active: Box::new(StateValue::Compound {
                            state: Ready,
                            active: Box::new(StateValue::Leaf(TypeMode)),
                        }),
                    },
                ],
            }),
        }
    }

    #[test]
    fn matches_follows_rooted_paths() {
        let value = value();

        assert!(value.matches(&[Root, Active, Input, Ready, TypeMode]));
        assert!(value.matches(&[Root, Active]));
        assert!(value.matches(&[]));
        assert!(!value.matches(&[Active]));
        assert!(!value.matches(&[Root, Input]));
    }

    #[test]
    fn contains_finds_nested_paths_in_any_region() {
        let value = value();

        assert!(value.contains(&[Attachment, Open]));
        assert!(value.contains(&[Ready, TypeMode]));
        assert!(!value.contains(&[Attachment, TypeMode]));
        assert!(!value.contains(&[Open, Attachment]));
    }

    #[test]
    fn leaves_and_display_follow_document_order() {
        let value = value();

        assert_eq!(value.leaves(), vec![Open, TypeMode]);
        assert_eq!(
            value.to_string(),
            "Root.Active.{Attachment.Open, Input.Ready.TypeMode}"
        );
    }

    #[test]
    fn state_value_serializes_as_tagged_tree() {
        let json = serde_json::to_value(StateValue::Compound {
            state: Attachment,
            active: Box::new(StateValue::Leaf(Open)),
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({"compound": {"state": "Attachment", "active": {"leaf": "Open"}}})
        );
    }
}

//! Builder assembling and validating a complete chart.

use super::error::{BuildError, ChartError};
use super::state::StateBuilder;
use crate::chart::{ChartDefinition, NodeKind, StateNode, Trigger};
use crate::core::{State, Statechart};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<BuildError>>;

/// Builds a [`ChartDefinition`] from a tree of [`StateBuilder`]s.
///
/// `build` reports every structural defect at once rather than stopping at
/// the first one.
pub struct ChartBuilder<M: Statechart> {
    root: StateBuilder<M>,
}

impl<M: Statechart> ChartBuilder<M> {
    pub fn new(root: StateBuilder<M>) -> Self {
        Self { root }
    }

    /// Validate and freeze the chart.
    pub fn build(self) -> Result<ChartDefinition<M>, ChartError> {
        let root = self.root.id;
        let mut nodes = HashMap::new();
        let mut duplicates = Vec::new();
        flatten(self.root, None, &mut nodes, &mut duplicates);

        let definition = ChartDefinition::from_nodes(root, nodes);
        match validate(&definition, duplicates) {
            Validation::Success(_) => Ok(definition),
            Validation::Failure(errors) => Err(ChartError {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }
}

fn flatten<M: Statechart>(
    builder: StateBuilder<M>,
    parent: Option<M::State>,
    nodes: &mut HashMap<M::State, StateNode<M>>,
    duplicates: &mut Vec<BuildError>,
) {
    let StateBuilder {
        id,
        kind,
        initial,
        history_default,
        children,
        entry,
        exit,
        transitions,
        invocation,
    } = builder;

    let (delayed, transitions): (Vec<_>, Vec<_>) = transitions
        .into_iter()
        .map(|transition| transition.build(id))
        .partition(|transition| transition.delay().is_some());

    let node = StateNode {
        id,
        kind,
        parent,
        children: children.iter().map(StateBuilder::id).collect(),
        initial,
        history_default,
        entry,
        exit,
        transitions,
        delayed,
        invocation,
        depth: 0,
        order: 0,
    };

    if nodes.contains_key(&id) {
        duplicates.push(BuildError::DuplicateState(id.name()));
        return;
    }
    nodes.insert(id, node);

    for child in children {
        flatten(child, Some(id), nodes, duplicates);
    }
}

fn validate<M: Statechart>(definition: &ChartDefinition<M>, duplicates: Vec<BuildError>) -> Check {
    let mut checks: Vec<Check> = duplicates.into_iter().map(Validation::fail).collect();
    for node in definition.nodes() {
        checks.extend(check_node(definition, node));
    }

    if checks.is_empty() {
        return Validation::success(());
    }
    Validation::all_vec(checks).map(|_| ())
}

fn check_node<M: Statechart>(definition: &ChartDefinition<M>, node: &StateNode<M>) -> Vec<Check> {
    let mut checks = Vec::new();
    let name = node.id.name();
    let has_substates = definition.substates(node.id).next().is_some();

    match node.kind {
        NodeKind::Compound => {
            if !has_substates {
                checks.push(Validation::fail(BuildError::EmptyCompound(name)));
            }
            if let Some(initial) = node.initial {
                if !node.children.contains(&initial) {
                    checks.push(Validation::fail(BuildError::InitialNotChild {
                        state: name,
                        initial: initial.name(),
                    }));
                } else if definition.kind(initial).is_some_and(NodeKind::is_history) {
                    checks.push(Validation::fail(BuildError::InitialIsHistory {
                        state: name,
                        initial: initial.name(),
                    }));
                }
            }
        }
        NodeKind::Parallel => {
            if !has_substates {
                checks.push(Validation::fail(BuildError::EmptyParallel(name)));
            }
        }
        NodeKind::Atomic | NodeKind::Final | NodeKind::History(_) => {
            if !node.children.is_empty() {
                checks.push(Validation::fail(BuildError::ChildrenNotAllowed {
                    state: name,
                    kind: kind_label(node.kind),
                }));
            }
        }
    }

    let has_transitions = !node.transitions.is_empty() || !node.delayed.is_empty();
    let behaviour_forbidden = match node.kind {
        NodeKind::Final => has_transitions || node.invocation.is_some(),
        NodeKind::History(_) => {
            has_transitions
                || node.invocation.is_some()
                || !node.entry.is_empty()
                || !node.exit.is_empty()
        }
        _ => false,
    };
    if behaviour_forbidden {
        checks.push(Validation::fail(BuildError::BehaviourNotAllowed {
            state: name,
            kind: kind_label(node.kind),
        }));
    }

    if node.is_history() {
        checks.extend(check_history(definition, node));
    }

    for transition in node.transitions.iter().chain(&node.delayed) {
        if let Some(target) = transition.target {
            if !definition.contains(target) {
                checks.push(Validation::fail(BuildError::UnknownTarget {
                    state: name,
                    target: target.name(),
                }));
            } else if target == definition.root() {
                checks.push(Validation::fail(BuildError::TargetIsRoot(name)));
            }
        }
    }

    let reacts_to_invocation = node
        .transitions
        .iter()
        .any(|t| matches!(t.trigger, Trigger::InvokeDone | Trigger::InvokeError));
    if reacts_to_invocation && node.invocation.is_none() {
        checks.push(Validation::fail(BuildError::MissingInvocation(name)));
    }

    checks
}

fn check_history<M: Statechart>(definition: &ChartDefinition<M>, node: &StateNode<M>) -> Vec<Check> {
    let name = node.id.name();
    let Some(parent) = node
        .parent
        .filter(|p| matches!(definition.kind(*p), Some(NodeKind::Compound | NodeKind::Parallel)))
    else {
        return vec![Validation::fail(BuildError::OrphanHistory(name))];
    };

    match node.history_default {
        Some(target) if !definition.contains(target) => {
            vec![Validation::fail(BuildError::UnknownTarget {
                state: name,
                target: target.name(),
            })]
        }
        Some(target) if !definition.is_descendant(target, parent) || target == node.id => {
            vec![Validation::fail(BuildError::HistoryDefaultOutsideParent {
                state: name,
                target: target.name(),
            })]
        }
        _ => Vec::new(),
    }
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Atomic => "Atomic",
        NodeKind::Compound => "Compound",
        NodeKind::Parallel => "Parallel",
        NodeKind::History(_) => "History",
        NodeKind::Final => "Final",
    }
}

//! Build errors for chart, state and transition builders.

use std::fmt;
use thiserror::Error;

/// A structural defect found while building a chart.
///
/// States are referred to by name so errors stay independent of the chart's
/// state type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("State {0} is declared more than once")]
    DuplicateState(&'static str),

    #[error("State {state} references {target}, which is not part of the chart")]
    UnknownTarget {
        state: &'static str,
        target: &'static str,
    },

    #[error("Initial state {initial} of {state} is not one of its children")]
    InitialNotChild {
        state: &'static str,
        initial: &'static str,
    },

    #[error("Initial state {initial} of {state} is a history node")]
    InitialIsHistory {
        state: &'static str,
        initial: &'static str,
    },

    #[error("Compound state {0} has no children. Add at least one with .child(state)")]
    EmptyCompound(&'static str),

    #[error("Parallel state {0} has no regions. Add at least one with .child(state)")]
    EmptyParallel(&'static str),

    #[error("{kind} state {state} cannot have children")]
    ChildrenNotAllowed {
        state: &'static str,
        kind: &'static str,
    },

    #[error("History state {0} must be a child of a compound or parallel state")]
    OrphanHistory(&'static str),

    #[error("Default target {target} of history state {state} is outside its parent")]
    HistoryDefaultOutsideParent {
        state: &'static str,
        target: &'static str,
    },

    #[error("{kind} state {state} cannot declare transitions, actions or invocations")]
    BehaviourNotAllowed {
        state: &'static str,
        kind: &'static str,
    },

    #[error("Transition from {0} targets the root state")]
    TargetIsRoot(&'static str),

    #[error("State {0} reacts to invocation results but declares no invocation")]
    MissingInvocation(&'static str),
}

/// Every defect found in one call to
/// [`ChartBuilder::build`](crate::builder::ChartBuilder::build).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub struct ChartError {
    pub errors: Vec<BuildError>,
}

impl ChartError {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, error: &BuildError) -> bool {
        self.errors.contains(error)
    }
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid chart ({} defects)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_error_lists_every_defect() {
        let error = ChartError {
            errors: vec![
                BuildError::DuplicateState("Idle"),
                BuildError::EmptyParallel("Active"),
            ],
        };

        let message = error.to_string();
        assert!(message.starts_with("Invalid chart (2 defects)"));
        assert!(message.contains("State Idle is declared more than once"));
        assert!(message.contains("Parallel state Active has no regions"));
        assert!(error.contains(&BuildError::DuplicateState("Idle")));
    }
}

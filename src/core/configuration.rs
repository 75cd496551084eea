//! The set of currently active nodes.

use super::state::State;
use std::collections::HashSet;

/// Set of active node ids.
///
/// Ordering is not tracked here; the chart definition supplies document
/// order and depth whenever an ordered view is needed.
#[derive(Clone, Debug)]
pub struct Configuration<S: State> {
    active: HashSet<S>,
}

impl<S: State> Default for Configuration<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Configuration<S> {
    pub fn new() -> Self {
        Self {
            active: HashSet::new(),
        }
    }

    pub fn contains(&self, state: S) -> bool {
        self.active.contains(&state)
    }

    /// Returns `true` if the node was not already active.
    pub fn insert(&mut self, state: S) -> bool {
        self.active.insert(state)
    }

    /// Returns `true` if the node was active.
    pub fn remove(&mut self, state: S) -> bool {
        self.active.remove(&state)
    }

    pub fn iter(&self) -> impl Iterator<Item = S> + '_ {
        self.active.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

impl<S: State> FromIterator<S> for Configuration<S> {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            active: iter.into_iter().collect(),
        }
    }
}

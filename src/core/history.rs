//! Remembered configurations for history pseudo-states.
//!
//! Each history node owns one record: the part of its parent's configuration
//! that was active the last time the parent was exited. Shallow history keeps
//! the parent's active children, deep history keeps the active atomic
//! descendants. The store itself is mode-agnostic; the interpreter decides
//! what to record.

use super::state::State;
use std::collections::HashMap;

/// Records keyed by history node id.
///
/// # Example
///
/// ```rust
/// use chartmind::core::{HistoryStore, State};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Node { Hist, Typing, Recording }
///
/// impl State for Node {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Hist => "Hist",
///             Self::Typing => "Typing",
///             Self::Recording => "Recording",
///         }
///     }
/// }
///
/// let mut store = HistoryStore::new();
/// assert!(store.get(Node::Hist).is_none());
///
/// store.record(Node::Hist, vec![Node::Recording]);
/// assert_eq!(store.get(Node::Hist), Some(&[Node::Recording][..]));
/// ```
#[derive(Clone, Debug)]
pub struct HistoryStore<S: State> {
    records: HashMap<S, Vec<S>>,
}

impl<S: State> Default for HistoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> HistoryStore<S> {
    /// Create an empty store; every history node starts without a record.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Replace the record of `history` with `states`.
    ///
    /// Called on every exit of the history node's parent, so the record
    /// always reflects the most recent exit.
    pub fn record(&mut self, history: S, states: Vec<S>) {
        self.records.insert(history, states);
    }

    /// The remembered states, or `None` if the parent was never exited.
    pub fn get(&self, history: S) -> Option<&[S]> {
        self.records.get(&history).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Shallow,
        Deep,
        Typing,
        Recording,
        Playing,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Shallow => "Shallow",
                Self::Deep => "Deep",
                Self::Typing => "Typing",
                Self::Recording => "Recording",
                Self::Playing => "Playing",
            }
        }
    }

    #[test]
    fn new_store_is_empty() {
        let store: HistoryStore<TestState> = HistoryStore::new();
        assert!(store.is_empty());
        assert!(store.get(TestState::Shallow).is_none());
    }

    #[test]
    fn record_overwrites_previous_exit() {
        let mut store = HistoryStore::new();

        store.record(TestState::Shallow, vec![TestState::Typing]);
        store.record(TestState::Shallow, vec![TestState::Recording]);

        assert_eq!(
            store.get(TestState::Shallow),
            Some(&[TestState::Recording][..])
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn records_are_independent_per_history_node() {
        let mut store = HistoryStore::new();

        store.record(TestState::Shallow, vec![TestState::Typing]);
        store.record(TestState::Deep, vec![TestState::Recording, TestState::Playing]);

        assert_eq!(store.get(TestState::Shallow), Some(&[TestState::Typing][..]));
        assert_eq!(store.get(TestState::Deep).map(<[_]>::len), Some(2));
    }

    #[test]
    fn clear_forgets_every_record() {
        let mut store = HistoryStore::new();
        store.record(TestState::Deep, vec![TestState::Playing]);
        store.clear();

        assert!(store.get(TestState::Deep).is_none());
    }
}

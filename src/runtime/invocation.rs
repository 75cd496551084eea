//! Bookkeeping for invocations tied to active states.

use crate::core::{InvocationId, State};
use std::collections::HashMap;
use tokio::task::AbortHandle;

#[derive(Debug)]
struct PendingInvocation {
    id: InvocationId,
    settled: bool,
    task: Option<AbortHandle>,
}

impl PendingInvocation {
    fn abort(self) {
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

/// At most one live invocation per state.
///
/// Results are matched by [`InvocationId`]: a result is accepted once
/// ([`settle`](Self::settle)) and acted upon once ([`consume`](Self::consume)),
/// and only while the invoking state still holds the same id. Cancelling an
/// invocation forgets its id, which turns any late result into a no-op.
#[derive(Debug)]
pub struct InvocationManager<S: State> {
    pending: HashMap<S, PendingInvocation>,
}

impl<S: State> Default for InvocationManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> InvocationManager<S> {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Start tracking a fresh invocation for `state`, cancelling any
    /// previous one.
    pub fn register(&mut self, state: S) -> InvocationId {
        let id = InvocationId::new();
        let previous = self.pending.insert(
            state,
            PendingInvocation {
                id,
                settled: false,
                task: None,
            },
        );
        if let Some(previous) = previous {
            previous.abort();
        }
        id
    }

    /// Attach the task running invocation `id`. Aborts the task straight
    /// away if the invocation is no longer current.
    pub fn attach(&mut self, state: S, id: InvocationId, task: AbortHandle) {
        match self.pending.get_mut(&state) {
            Some(pending) if pending.id == id => pending.task = Some(task),
            _ => task.abort(),
        }
    }

    pub fn is_current(&self, state: S, id: InvocationId) -> bool {
        self.pending.get(&state).is_some_and(|p| p.id == id)
    }

    /// Accept the result of invocation `id`. Returns false if the invocation
    /// was cancelled, replaced, or already produced a result.
    pub fn settle(&mut self, state: S, id: InvocationId) -> bool {
        match self.pending.get_mut(&state) {
            Some(pending) if pending.id == id && !pending.settled => {
                pending.settled = true;
                true
            }
            _ => false,
        }
    }

    /// Retire a settled invocation when its result is processed. Returns
    /// false if the invoking state was exited in the meantime.
    pub fn consume(&mut self, state: S, id: InvocationId) -> bool {
        match self.pending.get(&state) {
            Some(pending) if pending.id == id && pending.settled => {
                self.pending.remove(&state);
                true
            }
            _ => false,
        }
    }

    /// Cancel the invocation owned by `state`, if any.
    pub fn cancel(&mut self, state: S) -> bool {
        match self.pending.remove(&state) {
            Some(pending) => {
                pending.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum TestState {
        Loading,
        Saving,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Loading => "Loading",
                Self::Saving => "Saving",
            }
        }
    }

    #[test]
    fn result_is_settled_and_consumed_once() {
        let mut manager = InvocationManager::new();
        let id = manager.register(TestState::Loading);

        assert!(manager.settle(TestState::Loading, id));
        assert!(!manager.settle(TestState::Loading, id));
        assert!(manager.consume(TestState::Loading, id));
        assert!(!manager.consume(TestState::Loading, id));
        assert!(manager.is_empty());
    }

    #[test]
    fn unsettled_invocation_cannot_be_consumed() {
        let mut manager = InvocationManager::new();
        let id = manager.register(TestState::Loading);

        assert!(!manager.consume(TestState::Loading, id));
        assert!(manager.is_current(TestState::Loading, id));
    }

    #[test]
    fn cancelled_invocation_ignores_late_results() {
        let mut manager = InvocationManager::new();
        let id = manager.register(TestState::Loading);

        assert!(manager.cancel(TestState::Loading));
        assert!(!manager.settle(TestState::Loading, id));
        assert!(!manager.cancel(TestState::Loading));
    }

    #[test]
    fn settled_result_is_dropped_when_state_exits_before_processing() {
        let mut manager = InvocationManager::new();
        let id = manager.register(TestState::Loading);

        assert!(manager.settle(TestState::Loading, id));
        manager.cancel(TestState::Loading);
        assert!(!manager.consume(TestState::Loading, id));
    }

    #[test]
    fn reentry_replaces_previous_invocation() {
        let mut manager = InvocationManager::new();
        let first = manager.register(TestState::Loading);
        let second = manager.register(TestState::Loading);

        assert_ne!(first, second);
        assert!(!manager.settle(TestState::Loading, first));
        assert!(manager.settle(TestState::Loading, second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn invocations_are_tracked_per_state() {
        let mut manager = InvocationManager::new();
        let loading = manager.register(TestState::Loading);
        manager.register(TestState::Saving);

        manager.cancel_all();
        assert!(manager.is_empty());
        assert!(!manager.is_current(TestState::Loading, loading));
    }

    #[tokio::test]
    async fn cancelling_aborts_the_attached_task() {
        let mut manager = InvocationManager::new();
        let id = manager.register(TestState::Loading);
        let task = tokio::spawn(std::future::pending::<()>());
        manager.attach(TestState::Loading, id, task.abort_handle());

        manager.cancel(TestState::Loading);

        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn attaching_a_stale_task_aborts_it() {
        let mut manager = InvocationManager::new();
        let stale = manager.register(TestState::Loading);
        manager.register(TestState::Loading);
        let task = tokio::spawn(std::future::pending::<()>());

        manager.attach(TestState::Loading, stale, task.abort_handle());

        assert!(task.await.unwrap_err().is_cancelled());
    }
}

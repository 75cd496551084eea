//! Pending delayed transitions.
//!
//! The scheduler is passive: it stores timers and reports which ones are due,
//! but never fires anything on its own. The interpreter pops due timers one
//! at a time, so a timer cancelled by an earlier timer's step is already gone
//! by the time it would have been popped. A tick only pops timers armed
//! before it began; zero-delay timers armed while ticking wait for the next.

use crate::core::State;
use std::collections::BTreeMap;
use std::time::Duration;

/// One armed delayed transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTimer<S: State> {
    /// State whose delayed transition this is.
    pub state: S,
    /// Position of the transition in the state's delayed list.
    pub index: usize,
    pub delay: Duration,
    /// Clock reading at which the timer is due.
    pub deadline: Duration,
    /// Arm order, unique for the scheduler's lifetime.
    pub epoch: u64,
}

/// Timers ordered by (deadline, arm order).
#[derive(Debug)]
pub struct Scheduler<S: State> {
    next_epoch: u64,
    timers: BTreeMap<(Duration, u64), PendingTimer<S>>,
}

impl<S: State> Default for Scheduler<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Scheduler<S> {
    pub fn new() -> Self {
        Self {
            next_epoch: 0,
            timers: BTreeMap::new(),
        }
    }

    /// Arm the delayed transition `index` of `state`, due `delay` after `now`.
    /// Returns the timer's epoch.
    pub fn arm(&mut self, state: S, index: usize, delay: Duration, now: Duration) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let deadline = now.saturating_add(delay);
        self.timers.insert(
            (deadline, epoch),
            PendingTimer {
                state,
                index,
                delay,
                deadline,
                epoch,
            },
        );
        epoch
    }

    /// Drop every timer armed by `state`. Returns how many were dropped.
    pub fn cancel_all_for(&mut self, state: S) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, timer| timer.state != state);
        before - self.timers.len()
    }

    /// Epoch the next armed timer will get.
    pub fn next_epoch(&self) -> u64 {
        self.next_epoch
    }

    /// Remove and return the earliest timer due at `now` that was armed
    /// before `horizon`, if any.
    pub fn pop_due(&mut self, now: Duration, horizon: u64) -> Option<PendingTimer<S>> {
        let key = self
            .timers
            .keys()
            .take_while(|(deadline, _)| *deadline <= now)
            .find(|(_, epoch)| *epoch < horizon)
            .copied()?;
        self.timers.remove(&key)
    }

    /// Deadline of the earliest pending timer.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.first_key_value().map(|((deadline, _), _)| *deadline)
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingTimer<S>> {
        self.timers.values()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

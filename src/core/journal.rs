//! Bounded log of settled steps.
//!
//! Every processed signal that changed the machine leaves one record: what
//! triggered it, which nodes were exited and entered, and when it settled.

use super::state::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Record of a single settled step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StepRecord<S: State> {
    /// Step counter after this step
    pub step: u64,
    /// Signal that triggered the step
    pub trigger: String,
    /// Nodes exited, deepest first
    pub exited: Vec<S>,
    /// Nodes entered, shallowest first
    pub entered: Vec<S>,
    /// When the step settled
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded history of steps.
///
/// Oldest records are dropped once `capacity` is reached. A capacity of zero
/// disables recording.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Journal<S: State> {
    capacity: usize,
    records: VecDeque<StepRecord<S>>,
}

impl<S: State> Default for Journal<S> {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl<S: State> Journal<S> {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
        }
    }

    /// Append a record, evicting the oldest one if full.
    pub fn record(&mut self, record: StepRecord<S>) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &StepRecord<S>> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&StepRecord<S>> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Time between the oldest and newest retained record.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.records.front(), self.records.back()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }
}

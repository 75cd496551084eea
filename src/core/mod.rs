//! Core statechart types and logic.
//!
//! This module contains the pure pieces the interpreter is assembled from:
//! - The `Statechart` type bundle and the `State`/`Event`/`Context` traits
//! - Signals (external events plus internal timer/invocation/done events)
//! - Guard predicates and actions
//! - The active configuration, history records and the step journal
//!
//! Nothing in here performs I/O or spawns work; that lives in `runtime`.

mod action;
mod configuration;
mod context;
mod guard;
mod history;
mod journal;
mod signal;
mod state;

pub use action::Action;
pub use configuration::Configuration;
pub use context::Context;
pub use guard::Guard;
pub use history::HistoryStore;
pub use journal::{Journal, StepRecord};
pub use signal::{InvocationId, InvokeError, Signal};
pub use state::{Event, State, Statechart};

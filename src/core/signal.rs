//! Events as seen by the interpreter: external events plus the internal
//! signals synthesised by timers, invocations and state completion.

use super::state::{Event, State, Statechart};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identity of one started invocation.
///
/// A fresh id is minted every time an invoking state is entered, so a result
/// that arrives for an older entry of the same state can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure value of an invoked operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvokeError {
    pub message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Everything a guard or action can be evaluated against.
pub enum Signal<M: Statechart> {
    /// The interpreter is entering its initial configuration.
    Start,

    /// The interpreter is being stopped and exits every active node.
    Stop,

    /// An event sent by the host.
    Event(M::Event),

    /// A delayed transition armed by `state` has elapsed.
    Timer {
        state: M::State,
        index: usize,
        delay: Duration,
    },

    /// The invocation started by `state` succeeded.
    InvokeDone {
        state: M::State,
        id: InvocationId,
        output: M::Output,
    },

    /// The invocation started by `state` failed.
    InvokeError {
        state: M::State,
        id: InvocationId,
        error: InvokeError,
    },

    /// `state` completed: a compound reached a final child, or every region
    /// of a parallel node did.
    Done { state: M::State },
}

impl<M: Statechart> Signal<M> {
    /// Event type used for logging and journal records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Event(event) => event.name(),
            Self::Timer { .. } => "timer",
            Self::InvokeDone { .. } => "invoke.done",
            Self::InvokeError { .. } => "invoke.error",
            Self::Done { .. } => "done",
        }
    }

    /// The external event, if this is one.
    pub fn event(&self) -> Option<&M::Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// The invocation result, if this is a success signal.
    pub fn output(&self) -> Option<&M::Output> {
        match self {
            Self::InvokeDone { output, .. } => Some(output),
            _ => None,
        }
    }

    /// The invocation failure, if this is an error signal.
    pub fn error(&self) -> Option<&InvokeError> {
        match self {
            Self::InvokeError { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The node an internal signal is addressed to.
    pub fn origin(&self) -> Option<M::State> {
        match self {
            Self::Start | Self::Stop | Self::Event(_) => None,
            Self::Timer { state, .. }
            | Self::InvokeDone { state, .. }
            | Self::InvokeError { state, .. }
            | Self::Done { state } => Some(*state),
        }
    }
}

impl<M: Statechart> Clone for Signal<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Start => Self::Start,
            Self::Stop => Self::Stop,
            Self::Event(event) => Self::Event(event.clone()),
            Self::Timer {
                state,
                index,
                delay,
            } => Self::Timer {
                state: *state,
                index: *index,
                delay: *delay,
            },
            Self::InvokeDone { state, id, output } => Self::InvokeDone {
                state: *state,
                id: *id,
                output: output.clone(),
            },
            Self::InvokeError { state, id, error } => Self::InvokeError {
                state: *state,
                id: *id,
                error: error.clone(),
            },
            Self::Done { state } => Self::Done { state: *state },
        }
    }
}

impl<M: Statechart> fmt::Debug for Signal<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::Stop => f.write_str("Stop"),
            Self::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Self::Timer {
                state,
                index,
                delay,
            } => f
                .debug_struct("Timer")
                .field("state", state)
                .field("index", index)
                .field("delay", delay)
                .finish(),
            Self::InvokeDone { state, id, output } => f
                .debug_struct("InvokeDone")
                .field("state", state)
                .field("id", id)
                .field("output", output)
                .finish(),
            Self::InvokeError { state, id, error } => f
                .debug_struct("InvokeError")
                .field("state", state)
                .field("id", id)
                .field("error", error)
                .finish(),
            Self::Done { state } => f.debug_struct("Done").field("state", state).finish(),
        }
    }
}

impl<M: Statechart> fmt::Display for Signal<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Event(event) => write!(f, "{}", event.name()),
            Self::Timer { state, delay, .. } => {
                write!(f, "after({}ms)#{}", delay.as_millis(), state.name())
            }
            Self::InvokeDone { state, .. } => write!(f, "done.invoke#{}", state.name()),
            Self::InvokeError { state, .. } => write!(f, "error.invoke#{}", state.name()),
            Self::Done { state } => write!(f, "done.state#{}", state.name()),
        }
    }
}

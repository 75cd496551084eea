//! Errors surfaced by the interpreter.

use thiserror::Error;

/// A programming error found while processing a step.
///
/// Defects are never absorbed: the call that hit one returns it and the
/// interpreter is left faulted.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Defect {
    #[error("Guard '{guard}' on {state} panicked: {message}")]
    GuardPanicked {
        state: &'static str,
        guard: &'static str,
        message: String,
    },

    #[error("Action '{action}' on {state} panicked: {message}")]
    ActionPanicked {
        state: &'static str,
        action: &'static str,
        message: String,
    },

    #[error("{operation} needs a tokio runtime, but none is available")]
    NoRuntime { operation: String },

    #[error("State {0} is not part of the chart")]
    UnknownState(&'static str),
}

/// Errors returned by [`Interpreter`](crate::runtime::Interpreter) calls.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InterpreterError {
    #[error("Interpreter has not been started")]
    NotStarted,

    #[error("Interpreter was already started")]
    AlreadyStarted,

    #[error("Interpreter has been stopped")]
    Stopped,

    #[error("Interpreter is faulted after an earlier defect")]
    Faulted,

    #[error(transparent)]
    Defect(#[from] Defect),
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Static chart structure.
//!
//! A chart is an immutable tree of [`StateNode`]s with the transitions,
//! delayed transitions and invocations declared on them. It is built once
//! and can be shared by any number of interpreters.

mod definition;
mod node;

pub use definition::ChartDefinition;
pub use node::{
    HistoryMode, Invocation, InvocationFactory, NodeKind, StateNode, Transition, Trigger,
};

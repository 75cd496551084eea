//! Core traits naming the types a statechart is built from.
//!
//! A chart is described by a single [`Statechart`] type bundle: the enum of
//! node identifiers, the external event type, the extended context, the value
//! produced by a successful invocation, and the host environment that side
//! effects and invocations run against.

use super::context::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for statechart node identifiers.
///
/// Every node of a chart (atomic, compound, parallel, history or final) is a
/// distinct value of one `State` type, usually a fieldless enum generated with
/// [`state_enum!`](crate::state_enum). Because identifiers are plain values,
/// querying "is the machine in X" can never name a node that does not exist.
///
/// # Example
///
/// ```rust
/// use chartmind::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum Door {
///     Root,
///     Open,
///     Closed,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Root => "Root",
///             Self::Open => "Open",
///             Self::Closed => "Closed",
///         }
///     }
/// }
///
/// assert_eq!(Door::Open.name(), "Open");
/// ```
pub trait State:
    Copy + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Get the node's name for display/logging.
    fn name(&self) -> &'static str;
}

/// Trait for external events sent to an interpreter.
///
/// The event name is the event *type* transitions are keyed on; any payload
/// lives in the implementing type and is visible to guards and actions.
pub trait Event: Clone + Debug + Send + Sync + 'static {
    /// The event type this value is matched against.
    fn name(&self) -> &'static str;
}

/// Type bundle describing one family of statecharts.
///
/// Implemented on a marker type; every chart, interpreter and snapshot is
/// generic over it.
pub trait Statechart: Sized + Send + Sync + 'static {
    /// Node identifiers.
    type State: State;
    /// External events.
    type Event: Event;
    /// Extended state, mutated only through [`Context::apply`].
    type Context: Context;
    /// Success value of an invoked operation.
    type Output: Clone + Debug + Send + Sync + 'static;
    /// Host collaborators handed to effect actions and invocations.
    type Host: Clone + Send + Sync + 'static;
}

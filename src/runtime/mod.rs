//! Runtime shell for executing charts.
//!
//! The step algorithm itself is synchronous and runs to completion under the
//! interpreter's lock. Everything that waits lives out here: invocations are
//! spawned as tokio tasks and feed their results back through the queue, and
//! delayed transitions fire from [`Interpreter::tick`] or the timer driver.
//!
//! # Example
//!
//! ```rust
//! use chartmind::builder::{ChartBuilder, StateBuilder, TransitionBuilder};
//! use chartmind::core::{Context, Event, Statechart};
//! use chartmind::runtime::{Interpreter, ManualClock};
//! use chartmind::state_enum;
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! state_enum! {
//!     enum Light {
//!         Root,
//!         Off,
//!         On,
//!     }
//! }
//!
//! #[derive(Clone, Debug)]
//! struct Toggle;
//!
//! impl Event for Toggle {
//!     fn name(&self) -> &'static str {
//!         "TOGGLE"
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, Serialize)]
//! struct Empty;
//!
//! impl Context for Empty {
//!     type Patch = ();
//!     fn apply(&mut self, _patch: ()) {}
//! }
//!
//! struct Switch;
//!
//! impl Statechart for Switch {
//!     type State = Light;
//!     type Event = Toggle;
//!     type Context = Empty;
//!     type Output = ();
//!     type Host = ();
//! }
//!
//! let chart = ChartBuilder::<Switch>::new(
//!     StateBuilder::compound(Light::Root, Light::Off)
//!         .child(StateBuilder::atomic(Light::Off).on(TransitionBuilder::on("TOGGLE").to(Light::On)))
//!         .child(StateBuilder::atomic(Light::On).on(TransitionBuilder::on("TOGGLE").to(Light::Off))),
//! )
//! .build()
//! .unwrap();
//!
//! let interpreter = Interpreter::builder(Arc::new(chart), Empty, ())
//!     .clock(Arc::new(ManualClock::new()))
//!     .build();
//! interpreter.start().unwrap();
//! interpreter.send(Toggle).unwrap();
//!
//! assert!(interpreter.snapshot().matches(Light::On));
//! ```

mod clock;
mod error;
mod interpreter;
mod invocation;
mod scheduler;
mod snapshot;
mod step;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{Defect, InterpreterError};
pub use interpreter::{Interpreter, InterpreterBuilder, Subscription};
pub use invocation::InvocationManager;
pub use scheduler::{PendingTimer, Scheduler};
pub use snapshot::{Snapshot, StateValue, Status};

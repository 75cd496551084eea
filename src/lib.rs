//! Chartmind: a hierarchical, parallel, history-aware statechart interpreter
//!
//! Chartmind follows a "pure core, imperative shell" split. Charts are
//! immutable trees built once and shared between instances; the step
//! algorithm is a synchronous function of (configuration, context, signal).
//! Waiting happens only in the runtime shell, where invoked operations run as
//! tokio tasks and delayed transitions are fired by a clock.
//!
//! # Core Concepts
//!
//! - **Chart**: compound, parallel, final and history nodes with their
//!   transitions, built with [`builder::ChartBuilder`]
//! - **Guards and actions**: pure predicates, and named context assignments
//!   or host side effects
//! - **Delayed transitions**: `after(ms)` timers owned by the state that armed
//!   them and cancelled when it exits
//! - **Invocations**: one asynchronous operation per state, expressed as a
//!   Stillwater effect, whose result is routed back as an event
//! - **Interpreter**: the event loop with run-to-completion steps, FIFO
//!   queueing and snapshot subscriptions
//!
//! # Example
//!
//! ```rust
//! use chartmind::builder::{ChartBuilder, StateBuilder, TransitionBuilder};
//! use chartmind::chart::HistoryMode;
//! use chartmind::core::{Context, Event, Statechart};
//! use chartmind::runtime::{Interpreter, ManualClock};
//! use chartmind::state_enum;
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! state_enum! {
//!     enum Player {
//!         Root,
//!         On,
//!         Stopped,
//!         Playing,
//!         Resume,
//!         Off,
//!     }
//! }
//!
//! #[derive(Clone, Debug)]
//! enum Button {
//!     Play,
//!     Power,
//! }
//!
//! impl Event for Button {
//!     fn name(&self) -> &'static str {
//!         match self {
//!             Self::Play => "PLAY",
//!             Self::Power => "POWER",
//!         }
//!     }
//! }
//!
//! #[derive(Clone, Debug, Default, Serialize)]
//! struct NoContext;
//!
//! impl Context for NoContext {
//!     type Patch = ();
//!     fn apply(&mut self, _patch: ()) {}
//! }
//!
//! struct Radio;
//!
//! impl Statechart for Radio {
//!     type State = Player;
//!     type Event = Button;
//!     type Context = NoContext;
//!     type Output = ();
//!     type Host = ();
//! }
//!
//! type S = StateBuilder<Radio>;
//! type On = TransitionBuilder<Radio>;
//!
//! let chart = ChartBuilder::new(
//!     S::compound(Player::Root, Player::Off)
//!         .child(
//!             S::compound(Player::On, Player::Stopped)
//!                 .on(On::on("POWER").to(Player::Off))
//!                 .child(S::atomic(Player::Stopped).on(On::on("PLAY").to(Player::Playing)))
//!                 .child(S::atomic(Player::Playing).on(On::on("PLAY").to(Player::Stopped)))
//!                 .child(S::history(Player::Resume, HistoryMode::Shallow)),
//!         )
//!         .child(S::atomic(Player::Off).on(On::on("POWER").to(Player::Resume))),
//! )
//! .build()
//! .unwrap();
//!
//! let radio = Interpreter::builder(Arc::new(chart), NoContext, ())
//!     .clock(Arc::new(ManualClock::new()))
//!     .build();
//! radio.start().unwrap();
//!
//! radio.send(Button::Power).unwrap();
//! radio.send(Button::Play).unwrap();
//! radio.send(Button::Power).unwrap();
//! radio.send(Button::Power).unwrap();
//!
//! assert!(radio.snapshot().matches_path(&[Player::On, Player::Playing]));
//! ```

pub mod builder;
pub mod chart;
pub mod core;
pub mod runtime;
pub mod widget;

// Re-export commonly used types
pub use builder::{ChartBuilder, StateBuilder, TransitionBuilder};
pub use chart::{ChartDefinition, HistoryMode};
pub use self::core::{Action, Context, Event, Guard, Signal, State, Statechart};
pub use runtime::{Interpreter, InterpreterError, Snapshot, Status};

//! Builder API for ergonomic chart construction.
//!
//! Charts are described as nested [`StateBuilder`] trees, with transitions
//! attached through [`TransitionBuilder`], then frozen and validated by
//! [`ChartBuilder::build`].

pub mod chart;
pub mod error;
pub mod macros;
pub mod state;
pub mod transition;

pub use chart::ChartBuilder;
pub use error::{BuildError, ChartError};
pub use state::StateBuilder;
pub use transition::TransitionBuilder;

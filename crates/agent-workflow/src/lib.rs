//! Typed sequential workflows
//!
//! A [`Workflow`] chains [`Step`]s whose input and output types line up at
//! compile time, and traces each step as it runs.

pub mod step;
pub mod workflow;

// Re-export for convenience
pub use step::{Chain, Step, Traced};
pub use workflow::Workflow;

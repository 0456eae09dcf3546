//! Analysis stage runner
//!
//! Each synthesized series goes to its own analyst agent. Absent data skips
//! the agent, and a failing stage degrades to a marker instead of aborting.

mod reasoning;
mod runner;
mod stage;

pub use reasoning::strip_reasoning;
pub use runner::AnalysisRunner;
pub use stage::AnalysisStage;

//! Agent runtime: provider-backed agents, the tool loop and an agent factory

pub mod agent;
pub mod executor;
pub mod runtime;

// Re-export key types
pub use agent::{AgentConfig, LlmAgent};
pub use executor::{AgentExecutor, ExecutorConfig};
pub use runtime::{AgentRuntime, AgentRuntimeBuilder, RuntimeConfig};

//! Errors surfaced by the invocation adapter

use thiserror::Error;

/// Result type for tool invocation
pub type Result<T> = std::result::Result<T, ToolError>;

/// Normalised tool invocation failure
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under this name
    #[error("capability not found: {name}")]
    CapabilityNotFound { name: String },

    /// The tool's provider failed, or did not answer in time
    #[error("upstream call to '{tool}' failed: {source}")]
    Upstream {
        tool: String,
        #[source]
        source: agent_core::Error,
    },
}

impl ToolError {
    /// Name of the tool involved
    pub fn tool_name(&self) -> &str {
        match self {
            Self::CapabilityNotFound { name } => name,
            Self::Upstream { tool, .. } => tool,
        }
    }

    /// Whether the upstream call hit its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Upstream { source, .. } if source.is_timeout())
    }
}

impl From<ToolError> for agent_core::Error {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Upstream { source, .. } if source.is_timeout() => source,
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

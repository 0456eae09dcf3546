//! Error types for MCP operations

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during MCP operations
#[derive(Error, Debug)]
pub enum MCPError {
    /// Spawning or talking to the server process failed
    #[error("MCP connection failed: {0}")]
    ConnectionFailed(String),

    /// The initialize handshake was rejected or malformed
    #[error("MCP initialization failed: {0}")]
    InitializationFailed(String),

    /// Not connected to MCP server
    #[error("Not connected to MCP server")]
    NotConnected,

    /// The server answered with a JSON-RPC error
    #[error("MCP request failed: {0}")]
    RequestFailed(String),

    /// A tool result could not be decoded
    #[error("MCP tool call failed: {0}")]
    ToolCallFailed(String),

    /// MCP server not found
    #[error("MCP server not found: {0}")]
    ServerNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// No response within the request deadline
    #[error("MCP request '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Invalid pattern error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl MCPError {
    /// Failures of the transport rather than of the request itself
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::NotConnected | Self::Timeout { .. } | Self::IoError(_)
        )
    }
}

/// Convert MCPError to agent_core::Error
impl From<MCPError> for agent_core::Error {
    fn from(err: MCPError) -> Self {
        match err {
            MCPError::Timeout { after, .. } => agent_core::Error::Timeout(after),
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_maps_to_core_timeout() {
        let err = MCPError::Timeout {
            method: "tools/call".to_string(),
            after: Duration::from_secs(5),
        };
        assert!(err.is_transport());
        let core: agent_core::Error = err.into();
        assert!(core.is_timeout());
    }

    #[test]
    fn test_request_failure_is_not_transport() {
        assert!(!MCPError::RequestFailed("bad params".to_string()).is_transport());
        assert!(MCPError::NotConnected.is_transport());
    }
}

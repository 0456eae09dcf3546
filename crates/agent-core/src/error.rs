//! Error types for agent-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for agent and tool operations
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error message
    #[error("{0}")]
    Generic(String),

    /// Agent initialization failed
    #[error("Agent initialization failed: {0}")]
    InitializationFailed(String),

    /// Agent processing failed
    #[error("Agent processing failed: {0}")]
    ProcessingFailed(String),

    /// An external call did not finish in time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Whether this error came from an elapsed deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

//! Error types for the financial research pipeline

use agent_tools::ToolError;
use thiserror::Error;

use crate::model::Series;

/// Financial pipeline errors
#[derive(Debug, Error)]
pub enum FinanceError {
    /// The query was empty or otherwise unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required capability is missing or its provider failed
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// A whole-series fetch failed; aborts the run
    #[error("Failed to fetch {series} for {ticker}: {source}")]
    DataFetch {
        ticker: String,
        series: Series,
        #[source]
        source: ToolError,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An agent invocation failed or timed out
    #[error("Agent error: {0}")]
    Agent(#[from] agent_core::Error),

    /// A prompt template failed to render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl FinanceError {
    /// Series whose fetch failed, for `DataFetch` errors
    pub fn series(&self) -> Option<Series> {
        match self {
            Self::DataFetch { series, .. } => Some(*series),
            _ => None,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, FinanceError>;

impl From<agent_utils::ConfigError> for FinanceError {
    fn from(err: agent_utils::ConfigError) -> Self {
        FinanceError::ConfigError(err.to_string())
    }
}

/// Convert FinanceError to agent_core::Error
impl From<FinanceError> for agent_core::Error {
    fn from(err: FinanceError) -> Self {
        match err {
            FinanceError::ConfigError(msg) => agent_core::Error::InitializationFailed(msg),
            FinanceError::Agent(err) => err,
            other => agent_core::Error::ProcessingFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FinanceError::InvalidInput("query is empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: query is empty");

        let err = FinanceError::DataFetch {
            ticker: "AAPL".to_string(),
            series: Series::News,
            source: ToolError::CapabilityNotFound {
                name: "yahoo-finance_get_news".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch news for AAPL: capability not found: yahoo-finance_get_news"
        );
        assert_eq!(err.series(), Some(Series::News));
    }

    #[test]
    fn test_error_conversion() {
        let err: agent_core::Error = FinanceError::ConfigError("bad".to_string()).into();
        assert!(matches!(err, agent_core::Error::InitializationFailed(_)));

        let err: agent_core::Error = FinanceError::InvalidInput("empty".to_string()).into();
        match err {
            agent_core::Error::ProcessingFailed(msg) => assert!(msg.contains("Invalid input")),
            other => panic!("Expected ProcessingFailed variant, got {other:?}"),
        }
    }
}

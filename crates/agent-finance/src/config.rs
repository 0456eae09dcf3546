//! Configuration for the financial research pipeline

use std::time::Duration;

use agent_utils::{env_or, env_parse};
use serde::{Deserialize, Serialize};

use crate::error::{FinanceError, Result};
use crate::model::Series;

/// Configuration for the financial research pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// Model used by every agent
    pub model: String,

    /// Prefix of the data tools, e.g. `yahoo-finance` for
    /// `yahoo-finance_get_dividends`
    pub data_provider: String,

    /// Search capability offered to the ticker resolver, when registered
    pub search_tool: Option<String>,

    /// Deadline for each data tool call, MCP reconnects and retries included.
    ///
    /// This is the outer bound: a server's own request deadline must be
    /// shorter, or a stalled request is never reset and retried.
    pub tool_timeout: Duration,

    /// Deadline for each agent invocation, stream drain included
    pub llm_timeout: Duration,

    /// Series fetched or analyzed at the same time; 1 is strictly sequential
    pub max_concurrency: usize,

    /// Soft length target given to the analysis personas
    pub word_budget: u32,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Sampling temperature (provider default when unset)
    pub temperature: Option<f32>,

    /// Cap on data tool calls per second, shared by all runs
    pub rate_limit_per_second: Option<u32>,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            data_provider: "yahoo-finance".to_string(),
            search_tool: Some("duckduckgo_search".to_string()),
            tool_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(120),
            max_concurrency: 4,
            word_budget: 400,
            max_tokens: 2048,
            temperature: None,
            rate_limit_per_second: None,
        }
    }
}

impl FinanceConfig {
    /// Create a new configuration builder
    pub fn builder() -> FinanceConfigBuilder {
        FinanceConfigBuilder::default()
    }

    /// Defaults overridden from the environment
    ///
    /// Reads `OPENAI_MODEL` and the `FIN_*` variables (`FIN_MODEL`,
    /// `FIN_DATA_PROVIDER`, `FIN_SEARCH_TOOL`, `FIN_TOOL_TIMEOUT_SECS`,
    /// `FIN_LLM_TIMEOUT_SECS`, `FIN_MAX_CONCURRENCY`, `FIN_WORD_BUDGET`,
    /// `FIN_MAX_TOKENS`, `FIN_TEMPERATURE`, `FIN_RATE_LIMIT`). Setting
    /// `FIN_SEARCH_TOOL=none` disables the resolver's search tool.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let model = env_or("OPENAI_MODEL", &defaults.model);

        let mut builder = Self::builder()
            .model(env_or("FIN_MODEL", &model))
            .data_provider(env_or("FIN_DATA_PROVIDER", &defaults.data_provider));

        if let Some(tool) = env_parse::<String>("FIN_SEARCH_TOOL")? {
            builder = if tool.eq_ignore_ascii_case("none") {
                builder.without_search_tool()
            } else {
                builder.search_tool(tool)
            };
        }
        if let Some(secs) = env_parse::<u64>("FIN_TOOL_TIMEOUT_SECS")? {
            builder = builder.tool_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = env_parse::<u64>("FIN_LLM_TIMEOUT_SECS")? {
            builder = builder.llm_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = env_parse("FIN_MAX_CONCURRENCY")? {
            builder = builder.max_concurrency(n);
        }
        if let Some(words) = env_parse("FIN_WORD_BUDGET")? {
            builder = builder.word_budget(words);
        }
        if let Some(tokens) = env_parse("FIN_MAX_TOKENS")? {
            builder = builder.max_tokens(tokens);
        }
        if let Some(temperature) = env_parse("FIN_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }
        if let Some(per_second) = env_parse("FIN_RATE_LIMIT")? {
            builder = builder.rate_limit_per_second(per_second);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(FinanceError::ConfigError("model must not be empty".to_string()));
        }
        if self.data_provider.trim().is_empty() {
            return Err(FinanceError::ConfigError(
                "data_provider must not be empty".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(FinanceError::ConfigError(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }
        if self.word_budget == 0 {
            return Err(FinanceError::ConfigError(
                "word_budget must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(FinanceError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.tool_timeout.is_zero() || self.llm_timeout.is_zero() {
            return Err(FinanceError::ConfigError(
                "timeouts must be greater than 0".to_string(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(FinanceError::ConfigError(format!(
                    "temperature {t} outside 0.0..=2.0"
                )));
            }
        }
        Ok(())
    }

    /// Whether a transport request deadline leaves room for a retry inside
    /// `tool_timeout`
    pub fn fits_request_timeout(&self, request_timeout: Duration) -> bool {
        request_timeout < self.tool_timeout
    }

    /// Registry name of the data tool for `series`
    pub fn tool_name(&self, series: Series) -> String {
        format!("{}_{}", self.data_provider, series.operation())
    }

    /// Registry names of all seven data tools, in collection order
    pub fn tool_names(&self) -> Vec<String> {
        Series::ALL.iter().map(|s| self.tool_name(*s)).collect()
    }
}

/// Builder for FinanceConfig
#[derive(Debug, Default)]
pub struct FinanceConfigBuilder {
    model: Option<String>,
    data_provider: Option<String>,
    search_tool: Option<Option<String>>,
    tool_timeout: Option<Duration>,
    llm_timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    word_budget: Option<u32>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    rate_limit_per_second: Option<u32>,
}

impl FinanceConfigBuilder {
    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the data tool prefix
    pub fn data_provider(mut self, provider: impl Into<String>) -> Self {
        self.data_provider = Some(provider.into());
        self
    }

    /// Offer `tool` to the ticker resolver
    pub fn search_tool(mut self, tool: impl Into<String>) -> Self {
        self.search_tool = Some(Some(tool.into()));
        self
    }

    /// Resolve tickers from the model's knowledge alone
    pub fn without_search_tool(mut self) -> Self {
        self.search_tool = Some(None);
        self
    }

    /// Set the data tool deadline
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Set the agent deadline
    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    /// Set how many series run at once
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Set the analysis word budget
    pub fn word_budget(mut self, words: u32) -> Self {
        self.word_budget = Some(words);
        self
    }

    /// Set max tokens per completion
    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap data tool calls per second
    pub fn rate_limit_per_second(mut self, per_second: u32) -> Self {
        self.rate_limit_per_second = Some(per_second);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<FinanceConfig> {
        let defaults = FinanceConfig::default();

        let config = FinanceConfig {
            model: self.model.unwrap_or(defaults.model),
            data_provider: self.data_provider.unwrap_or(defaults.data_provider),
            search_tool: self.search_tool.unwrap_or(defaults.search_tool),
            tool_timeout: self.tool_timeout.unwrap_or(defaults.tool_timeout),
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            word_budget: self.word_budget.unwrap_or(defaults.word_budget),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.or(defaults.temperature),
            rate_limit_per_second: self.rate_limit_per_second.or(defaults.rate_limit_per_second),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinanceConfig::default();
        assert_eq!(config.word_budget, 400);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tool_names() {
        let config = FinanceConfig::default();
        assert_eq!(config.tool_name(Series::Dividends), "yahoo-finance_get_dividends");
        assert_eq!(config.tool_names().len(), 7);
        assert_eq!(config.tool_names()[6], "yahoo-finance_get_earning_dates");
    }

    #[test]
    fn test_config_builder() {
        let config = FinanceConfig::builder()
            .model("llama3")
            .max_concurrency(1)
            .without_search_tool()
            .tool_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.model, "llama3");
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.search_tool, None);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_request_timeout_must_fit_inside_tool_timeout() {
        let config = FinanceConfig::default();
        assert!(config.fits_request_timeout(Duration::from_secs(20)));
        assert!(!config.fits_request_timeout(Duration::from_secs(30)));
        assert!(!config.fits_request_timeout(Duration::from_secs(60)));
    }

    #[test]
    fn test_validation() {
        assert!(FinanceConfig::builder().max_concurrency(0).build().is_err());
        assert!(FinanceConfig::builder().word_budget(0).build().is_err());
        assert!(FinanceConfig::builder().temperature(3.5).build().is_err());
        assert!(
            FinanceConfig::builder()
                .llm_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_from_env() {
        // SAFETY: no other test reads these variables
        unsafe {
            std::env::set_var("FIN_DATA_PROVIDER", "yf");
            std::env::set_var("FIN_SEARCH_TOOL", "none");
            std::env::set_var("FIN_WORD_BUDGET", "250");
        }
        let config = FinanceConfig::from_env().unwrap();
        unsafe {
            std::env::remove_var("FIN_DATA_PROVIDER");
            std::env::remove_var("FIN_SEARCH_TOOL");
            std::env::remove_var("FIN_WORD_BUDGET");
        }

        assert_eq!(config.data_provider, "yf");
        assert_eq!(config.search_tool, None);
        assert_eq!(config.word_budget, 250);
    }
}

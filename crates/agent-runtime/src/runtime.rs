//! Runtime for building agents with shared dependencies
//!
//! The AgentRuntime holds the LLM provider and the tool invoker, and hands
//! out [`LlmAgent`]s configured from its defaults.

use agent_core::Result;
use agent_llm::LLMProvider;
use agent_tools::ToolInvoker;
use std::sync::Arc;
use tracing::debug;

use crate::agent::{AgentConfig, LlmAgent};
use crate::executor::{AgentExecutor, ExecutorConfig};

/// Defaults applied to every agent the runtime creates
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Default model to use
    pub default_model: String,

    /// Default max tokens per completion
    pub default_max_tokens: usize,

    /// Default sampling temperature
    pub default_temperature: Option<f32>,

    /// Default maximum iterations for tool-using agents
    pub default_max_iterations: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            default_max_tokens: 4096,
            default_temperature: None,
            default_max_iterations: 10,
        }
    }
}

/// Factory for agents sharing one provider and one tool invoker
///
/// # Example
///
/// ```no_run
/// use agent_runtime::AgentRuntime;
/// use agent_core::Agent;
/// # use std::sync::Arc;
///
/// # async fn example(provider: Arc<dyn agent_llm::LLMProvider>, invoker: agent_tools::ToolInvoker) -> agent_core::Result<()> {
/// let runtime = AgentRuntime::builder()
///     .provider(provider)
///     .invoker(invoker)
///     .build()?;
///
/// let analyst = runtime.agent("news-analyst", "You are a financial news analyst.");
/// let text = analyst.generate("Summarize today's AAPL news".to_string()).await?;
/// # Ok(())
/// # }
/// ```
pub struct AgentRuntime {
    provider: Arc<dyn LLMProvider>,
    invoker: ToolInvoker,
    config: RuntimeConfig,
}

impl AgentRuntime {
    /// Create a new agent runtime
    pub fn new(provider: Arc<dyn LLMProvider>, invoker: ToolInvoker, config: RuntimeConfig) -> Self {
        Self {
            provider,
            invoker,
            config,
        }
    }

    /// Create a new runtime builder
    pub fn builder() -> AgentRuntimeBuilder {
        AgentRuntimeBuilder::new()
    }

    /// Get a reference to the LLM provider
    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }

    /// Get a reference to the tool invoker
    pub fn invoker(&self) -> &ToolInvoker {
        &self.invoker
    }

    /// Get a reference to the runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Agent configuration with runtime defaults and the given instructions
    pub fn agent_config(&self, instructions: impl Into<String>) -> AgentConfig {
        AgentConfig {
            model: self.config.default_model.clone(),
            instructions: instructions.into(),
            max_tokens: self.config.default_max_tokens,
            temperature: self.config.default_temperature,
            max_tool_iterations: self.config.default_max_iterations,
        }
    }

    /// Create a tool-less agent with the runtime defaults
    pub fn agent(&self, name: impl Into<String>, instructions: impl Into<String>) -> LlmAgent {
        self.create_agent(name, self.agent_config(instructions), &[])
    }

    /// Create an agent offered the named tools
    ///
    /// Tools missing from the registry are skipped; with none left the agent
    /// streams directly from the provider.
    pub fn create_agent(
        &self,
        name: impl Into<String>,
        config: AgentConfig,
        tools: &[&str],
    ) -> LlmAgent {
        let name = name.into();
        let agent = if tools.is_empty() {
            LlmAgent::new(name, Arc::clone(&self.provider), config)
        } else {
            let executor = AgentExecutor::new(
                Arc::clone(&self.provider),
                self.invoker.clone(),
                tools,
                ExecutorConfig {
                    max_iterations: config.max_tool_iterations,
                    model: config.model.clone(),
                    system_prompt: Some(config.instructions.clone()),
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                },
            );
            LlmAgent::new(name, Arc::clone(&self.provider), config).with_executor(executor)
        };
        debug!(agent = %agent_core::Agent::name(&agent), tools = agent.uses_tools(), "created agent");
        agent
    }
}

/// Builder for AgentRuntime
pub struct AgentRuntimeBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    invoker: Option<ToolInvoker>,
    config: RuntimeConfig,
}

impl AgentRuntimeBuilder {
    /// Create a new runtime builder
    pub fn new() -> Self {
        Self {
            provider: None,
            invoker: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool invoker
    pub fn invoker(mut self, invoker: ToolInvoker) -> Self {
        self.invoker = Some(invoker);
        self
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default model
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    /// Build the runtime
    ///
    /// Without an invoker the runtime gets one over an empty registry.
    pub fn build(self) -> Result<AgentRuntime> {
        let provider = self.provider.ok_or_else(|| {
            agent_core::Error::InitializationFailed("Provider not set".to_string())
        })?;
        let invoker = self
            .invoker
            .unwrap_or_else(|| ToolInvoker::new(Arc::default()));

        Ok(AgentRuntime::new(provider, invoker, self.config))
    }
}

impl Default for AgentRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, SearchTool};
    use agent_tools::ToolRegistry;

    fn runtime() -> AgentRuntime {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool));
        AgentRuntime::builder()
            .provider(Arc::new(ScriptedProvider::new(vec![])))
            .invoker(ToolInvoker::new(Arc::new(registry)))
            .default_model("test-model")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(AgentRuntime::builder().build().is_err());
    }

    #[test]
    fn test_agent_uses_defaults() {
        let agent = runtime().agent("earnings", "You are an earnings analyst.");
        assert_eq!(agent.config().model, "test-model");
        assert_eq!(agent.config().instructions, "You are an earnings analyst.");
        assert!(!agent.uses_tools());
    }

    #[test]
    fn test_missing_tools_fall_back_to_plain_agent() {
        let runtime = runtime();
        let with_search =
            runtime.create_agent("ticker", runtime.agent_config("find tickers"), &["duckduckgo_search"]);
        assert!(with_search.uses_tools());

        let without =
            runtime.create_agent("ticker", runtime.agent_config("find tickers"), &["brave_search"]);
        assert!(!without.uses_tools());
    }
}

//! Language-model agent implementing [`agent_core::Agent`]

use agent_core::{Agent, Error, Result, TextStream};
use agent_llm::{CompletionRequest, LLMProvider, Message};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

use crate::executor::AgentExecutor;

/// Configuration for an [`LlmAgent`]
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model to use
    pub model: String,

    /// System instructions (persona)
    pub instructions: String,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature for sampling
    pub temperature: Option<f32>,

    /// Upper bound on model calls when tools are attached
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            instructions: "You are a helpful assistant.".to_string(),
            max_tokens: 4096,
            temperature: None,
            max_tool_iterations: 10,
        }
    }
}

/// An agent backed by an [`LLMProvider`]
///
/// Without tools, [`Agent::stream`] forwards the provider's own stream.
/// With tools, the prompt runs through an [`AgentExecutor`] tool loop and the
/// final answer is emitted as a single chunk.
pub struct LlmAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    config: AgentConfig,
    executor: Option<AgentExecutor>,
}

impl LlmAgent {
    /// Create an agent without tools
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>, config: AgentConfig) -> Self {
        Self {
            name: name.into(),
            provider,
            config,
            executor: None,
        }
    }

    /// Attach a tool loop; an executor offering no tools is ignored
    pub fn with_executor(mut self, executor: AgentExecutor) -> Self {
        if !executor.tool_names().is_empty() {
            self.executor = Some(executor);
        }
        self
    }

    /// The agent's configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Whether prompts go through a tool loop
    pub fn uses_tools(&self) -> bool {
        self.executor.is_some()
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .system(&self.config.instructions)
            .add_message(Message::user(prompt))
            .max_tokens(self.config.max_tokens);
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        builder.build()
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, prompt: String) -> Result<TextStream> {
        if let Some(executor) = &self.executor {
            debug!(agent = %self.name, "running tool loop");
            let text = executor.run(prompt).await?;
            return Ok(agent_core::once(text));
        }

        debug!(agent = %self.name, model = %self.config.model, "streaming completion");
        let chunks = self
            .provider
            .stream(self.request(prompt))
            .await
            .map_err(Error::from)?;
        Ok(chunks.map(|chunk| chunk.map_err(Error::from)).boxed())
    }
}

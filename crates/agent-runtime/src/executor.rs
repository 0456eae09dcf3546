//! Agent executor for running tool loops
//!
//! The AgentExecutor implements the core agent loop pattern:
//! 1. Call LLM with conversation history and available tools
//! 2. Check stop reason
//! 3. If tool use requested, execute tools and loop back
//! 4. If completed, return final response

use agent_core::{Error, Result};
use agent_llm::{CompletionRequest, LLMProvider, Message, StopReason, ToolDefinition};
use agent_tools::ToolInvoker;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for agent execution
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of model calls (prevents infinite loops)
    pub max_iterations: usize,

    /// Model to use
    pub model: String,

    /// System prompt
    pub system_prompt: Option<String>,

    /// Max tokens per completion
    pub max_tokens: usize,

    /// Temperature
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            model: "gpt-4o-mini".to_string(),
            system_prompt: None,
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// Executes an agent loop: LLM → tool calls → execution → loop back
///
/// Tool calls go through a [`ToolInvoker`], so they share its deadline and
/// rate limit. Only the tools named at construction are offered to the model.
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    invoker: ToolInvoker,
    tools: Vec<ToolDefinition>,
    config: ExecutorConfig,
}

impl AgentExecutor {
    /// Create an executor offering `tool_names` from the invoker's registry
    ///
    /// Names that are not registered are skipped with a warning.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        invoker: ToolInvoker,
        tool_names: &[&str],
        config: ExecutorConfig,
    ) -> Self {
        let tools = tool_names
            .iter()
            .filter_map(|name| match invoker.registry().get(name) {
                Some(tool) => Some(ToolDefinition::new(
                    tool.name(),
                    tool.description(),
                    tool.input_schema(),
                )),
                None => {
                    warn!(tool = %name, "tool not registered, not offered to the model");
                    None
                }
            })
            .collect();

        Self {
            provider,
            invoker,
            tools,
            config,
        }
    }

    /// Names of the tools offered to the model
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Execute the agent loop for one user message
    ///
    /// Returns the assistant's final text. Running out of iterations is an
    /// error rather than a partial answer.
    pub async fn run(&self, user_message: String) -> Result<String> {
        let mut conversation = vec![Message::user(user_message)];

        for iteration in 1..=self.config.max_iterations {
            debug!(
                iteration,
                max_iterations = self.config.max_iterations,
                "agent iteration started"
            );

            let request = self.request(conversation.clone());
            let response = self.provider.complete(request).await.map_err(Error::from)?;

            debug!(
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM response received"
            );

            match response.stop_reason {
                StopReason::ToolUse if response.message.has_tool_uses() => {
                    let results = self.execute_tools(&response.message).await;
                    conversation.push(response.message);
                    conversation.extend(results);
                }
                StopReason::MaxTokens => {
                    warn!(model = %self.config.model, "response truncated at max tokens");
                    return Ok(response.message.text_content());
                }
                _ => {
                    let text = response.message.text_content();
                    info!(iteration, response_length = text.len(), "agent completed");
                    return Ok(text);
                }
            }
        }

        warn!(max_iterations = self.config.max_iterations, "max iterations reached");
        Err(Error::ProcessingFailed(format!(
            "no final answer after {} iterations",
            self.config.max_iterations
        )))
    }

    fn request(&self, messages: Vec<Message>) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(&self.config.model)
            .messages(messages)
            .max_tokens(self.config.max_tokens)
            .tools(self.tools.clone());
        if let Some(system) = &self.config.system_prompt {
            builder = builder.system(system);
        }
        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        builder.build()
    }

    /// Execute every tool call of an assistant message
    ///
    /// Failures are reported back to the model as error results.
    async fn execute_tools(&self, message: &Message) -> Vec<Message> {
        let mut results = Vec::new();

        for (id, name, input) in message.tool_uses() {
            let started = Instant::now();
            let outcome = self.invoker.invoke(name, Value::clone(input)).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(output) => {
                    let text = output.joined_text();
                    debug!(tool = %name, elapsed_ms, result_length = text.len(), "tool call succeeded");
                    results.push(Message::tool_result(id, text));
                }
                Err(e) => {
                    warn!(tool = %name, elapsed_ms, error = %e, "tool call failed");
                    results.push(Message::tool_error(id, format!("Error: {e}")));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, SearchTool, tool_call};
    use agent_llm::ContentBlock;
    use agent_llm::MessageContent;
    use agent_tools::ToolRegistry;

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchTool));
        ToolInvoker::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::text("AAPL")]));
        let executor = AgentExecutor::new(provider.clone(), invoker(), &[], ExecutorConfig::default());

        assert_eq!(executor.run("Apple".to_string()).await.unwrap(), "AAPL");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].has_tools());
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call("call-1", "duckduckgo_search", serde_json::json!({"query": "Nvidia ticker"})),
            ScriptedProvider::text("NVDA"),
        ]));
        let executor = AgentExecutor::new(
            provider.clone(),
            invoker(),
            &["duckduckgo_search", "not_registered"],
            ExecutorConfig::default(),
        );
        assert_eq!(executor.tool_names(), vec!["duckduckgo_search"]);

        assert_eq!(executor.run("Nvidia".to_string()).await.unwrap(), "NVDA");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].has_tools());
        let last = requests[1].messages.last().unwrap();
        match &last.content {
            Some(MessageContent::Blocks(blocks)) => assert!(matches!(
                &blocks[0],
                ContentBlock::ToolResult { content, is_error: None, .. } if content.contains("NVDA")
            )),
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call("call-1", "missing_tool", serde_json::json!({})),
            ScriptedProvider::text("done"),
        ]));
        let executor = AgentExecutor::new(provider.clone(), invoker(), &[], ExecutorConfig::default());

        assert_eq!(executor.run("q".to_string()).await.unwrap(), "done");
        let requests = provider.requests();
        let last = requests[1].messages.last().unwrap();
        assert!(matches!(
            &last.content,
            Some(MessageContent::Blocks(blocks))
                if matches!(&blocks[0], ContentBlock::ToolResult { is_error: Some(true), .. })
        ));
    }

    #[tokio::test]
    async fn test_iteration_limit_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_call("a", "duckduckgo_search", serde_json::json!({"query": "x"})),
            tool_call("b", "duckduckgo_search", serde_json::json!({"query": "y"})),
        ]));
        let config = ExecutorConfig {
            max_iterations: 2,
            ..ExecutorConfig::default()
        };
        let executor = AgentExecutor::new(provider, invoker(), &["duckduckgo_search"], config);

        let err = executor.run("loop".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed(_)));
    }
}

//! General financial analyst: free-form questions over every registered tool
//!
//! Unlike the pipeline personas, this agent picks its own tools. It is
//! offered everything in the runtime's registry, typically the market data
//! tools plus web search and page fetching.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_core::Agent;
use agent_runtime::AgentRuntime;
use tracing::{info, instrument, warn};

use crate::analysis::strip_reasoning;
use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use crate::pipeline::agent_config;
use crate::prompts::Prompts;

/// Answers free-form financial questions with a tool-calling agent
pub struct FinancialAnalyst {
    agent: Arc<dyn Agent>,
    llm_timeout: Duration,
}

impl FinancialAnalyst {
    pub fn new(agent: Arc<dyn Agent>, llm_timeout: Duration) -> Self {
        Self { agent, llm_timeout }
    }

    /// Build the analyst from `runtime`, offering it every registered tool
    pub fn from_runtime(runtime: &AgentRuntime, config: &FinanceConfig) -> Result<Self> {
        config.validate()?;
        let prompts = Prompts::new()?;

        let registry = runtime.invoker().registry();
        let tools = registry.names();
        if tools.is_empty() {
            warn!("no tools registered, the analyst answers without live data");
        }

        let instructions = prompts.financial_analyst_instructions(&tools)?;
        let agent = runtime.create_agent(
            "financial-analyst",
            agent_config(runtime, config, instructions),
            &tools,
        );
        info!(model = %config.model, tools = tools.len(), "financial analyst ready");
        Ok(Self::new(Arc::new(agent), config.llm_timeout))
    }

    /// Answer `question`, tool calls included, within the agent deadline
    ///
    /// Reasoning spans are removed from the answer. An empty answer is an
    /// error.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FinanceError::InvalidInput("question is empty".to_string()));
        }

        let started = Instant::now();
        let answer = tokio::time::timeout(self.llm_timeout, self.agent.generate(question.to_string()))
            .await
            .map_err(|_| agent_core::Error::Timeout(self.llm_timeout))??;

        let answer = strip_reasoning(&answer);
        if answer.is_empty() {
            return Err(FinanceError::Agent(agent_core::Error::ProcessingFailed(
                "the analyst returned an empty answer".to_string(),
            )));
        }
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            words = answer.split_whitespace().count(),
            "question answered"
        );
        Ok(answer)
    }
}

//! Scripted agents and fixture tools shared by the unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use agent_core::{Agent, Error, TextStream};
use agent_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message, MessageContent, Role,
    StopReason, TokenUsage,
};
use agent_tools::{Tool, ToolOutput, ToolRegistry};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::FinanceConfig;
use crate::model::Series;

/// An agent replaying a fixed chunk sequence, counting invocations
pub(crate) struct ScriptedAgent {
    name: String,
    chunks: Option<Vec<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub(crate) fn replying<I, S>(name: &str, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            chunks: Some(chunks.into_iter().map(Into::into).collect()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(name: &str) -> Self {
        Self {
            chunks: None,
            ..Self::replying(name, Vec::<String>::new())
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(&self, prompt: String) -> agent_core::Result<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.chunks {
            Some(chunks) => Ok(agent_core::from_chunks(chunks.clone())),
            None => Err(Error::ProcessingFailed("model unavailable".to_string())),
        }
    }
}

/// Canned behaviour of a data tool
#[derive(Clone)]
pub(crate) enum Fixture {
    Text(String),
    Output(ToolOutput),
    Fail,
    Stall,
}

/// A data tool returning a fixture and recording its arguments
pub(crate) struct FixtureTool {
    name: String,
    fixture: Fixture,
    pub(crate) args: Mutex<Vec<Value>>,
}

impl FixtureTool {
    pub(crate) fn new(name: impl Into<String>, fixture: Fixture) -> Self {
        Self {
            name: name.into(),
            fixture,
            args: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Tool for FixtureTool {
    async fn execute(&self, params: Value) -> agent_core::Result<ToolOutput> {
        self.args.lock().unwrap().push(params);
        match &self.fixture {
            Fixture::Text(text) => Ok(ToolOutput::text(text.clone())),
            Fixture::Output(output) => Ok(output.clone()),
            Fixture::Fail => Err(Error::ProcessingFailed("HTTP 503 from provider".to_string())),
            Fixture::Stall => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(ToolOutput::empty())
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "fixture"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"symbol": {"type": "string"}}})
    }
}

/// Registry with all seven data tools, each answering `"<key> payload"`
/// unless overridden
pub(crate) fn data_registry(
    config: &FinanceConfig,
    overrides: &[(Series, Fixture)],
) -> (ToolRegistry, Vec<(Series, Arc<FixtureTool>)>) {
    let mut registry = ToolRegistry::new();
    let mut tools = Vec::new();
    for series in Series::ALL {
        let fixture = overrides
            .iter()
            .find(|(s, _)| *s == series)
            .map_or_else(|| Fixture::Text(format!("{} payload", series.key())), |(_, f)| f.clone());
        let tool = Arc::new(FixtureTool::new(config.tool_name(series), fixture));
        registry.register(tool.clone());
        tools.push((series, tool));
    }
    (registry, tools)
}

/// Provider answering like the deployed personas
///
/// Resolver prompts get `"The ticker is <ticker>"`. Analysis prompts get a
/// reasoning span followed by `"Reviewed <title> for <ticker>"`.
pub(crate) struct PersonaProvider {
    ticker: String,
    failing: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl PersonaProvider {
    pub(crate) fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            failing: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail analyses of the series whose lowercase title is `title`
    pub(crate) fn failing_for(mut self, title: &str) -> Self {
        self.failing = Some(title.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for PersonaProvider {
    async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
        let prompt = request
            .messages
            .first()
            .map(Message::text_content)
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        let text = if prompt.starts_with("Find the stock ticker symbol for:") {
            format!("The ticker is {}", self.ticker)
        } else {
            let title = prompt
                .strip_prefix("Analyze the following ")
                .and_then(|rest| rest.split(" data for ").next())
                .unwrap_or("data")
                .to_string();
            if self.failing.as_deref() == Some(title.as_str()) {
                return Err(LLMError::ProviderError("rate limited".to_string()));
            }
            format!("<think>Looking at {title}.</think>Reviewed {title} for {}", self.ticker)
        };

        Ok(CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        })
    }

    fn name(&self) -> &str {
        "persona"
    }
}

/// Provider replaying canned responses in order, recording every request
pub(crate) struct ScriptedProvider {
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn text(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    pub(crate) fn tool_call(id: &str, name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: Some(MessageContent::Blocks(vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                }])),
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LLMError::ProviderError("script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

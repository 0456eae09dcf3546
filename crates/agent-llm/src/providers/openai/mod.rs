//! OpenAI provider implementation
//!
//! Talks to any endpoint implementing the Chat Completions API, including
//! local servers (vLLM, LM Studio, llama.cpp) through `OPENAI_API_BASE`.
//!
//! ```no_run
//! use agent_llm::{CompletionRequest, Message, LLMProvider};
//! use agent_llm::providers::OpenAIProvider;
//! use futures::StreamExt;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OpenAIProvider::from_env()?;
//! let request = CompletionRequest::builder("gpt-4o-mini")
//!     .add_message(Message::user("Find the stock ticker symbol for: Apple"))
//!     .build();
//!
//! let mut chunks = provider.stream(request).await?;
//! while let Some(chunk) = chunks.next().await {
//!     print!("{}", chunk?);
//! }
//! # Ok(())
//! # }
//! ```

mod wire;

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use tracing::{debug, instrument};

use self::wire::{ChatRequest, ChatResponse, map_stop_reason};
use super::sse::SseDecoder;
use crate::{
    ChunkStream, CompletionRequest, CompletionResponse, LLMError, LLMProvider, Result, TokenUsage,
};

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for OpenAI provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL, without the `/chat/completions` suffix
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read `OPENAI_API_KEY` (required) and `OPENAI_API_BASE` (optional)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// OpenAI provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a new OpenAI provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    /// Create a provider from environment variables
    pub fn from_env() -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 => LLMError::AuthenticationFailed,
            429 => LLMError::RateLimitExceeded(error_text),
            400 => LLMError::InvalidRequest(error_text),
            404 => LLMError::ModelNotFound(body.model.clone()),
            _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = ChatRequest::from_request(request, false);
        let response: ChatResponse = self.send(&body).await?.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;
        let usage = response.usage.unwrap_or_default();

        debug!(
            finish_reason = ?choice.finish_reason,
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "completion received"
        );

        Ok(CompletionResponse {
            stop_reason: map_stop_reason(choice.finish_reason.as_deref()),
            message: choice.message.into_message()?,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    /// Streams text deltas over server-sent events.
    ///
    /// Requests that offer tools are answered through [`complete`](Self::complete)
    /// as a single chunk, since tool-call deltas carry no user-visible text.
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        if request.has_tools() {
            let response = self.complete(request).await?;
            let text = response.message.text_content();
            return Ok(stream::once(std::future::ready(Ok(text))).boxed());
        }

        let body = ChatRequest::from_request(request, true);
        let response = self.send(&body).await?;
        debug!("event stream opened");
        Ok(sse_chunks(response))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

struct SseBody {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    exhausted: bool,
}

fn sse_chunks(response: reqwest::Response) -> ChunkStream {
    let body = SseBody {
        bytes: response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()))
            .boxed(),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(Some(body), |state| async move {
        let mut body = state?;
        loop {
            if let Some(text) = body.pending.pop_front() {
                return Some((Ok(text), Some(body)));
            }
            if body.exhausted || body.decoder.is_done() {
                return None;
            }

            let decoded = match body.bytes.next().await {
                Some(Ok(bytes)) => body.decoder.feed(&bytes),
                Some(Err(e)) => return Some((Err(LLMError::HttpError(e)), None)),
                None => {
                    body.exhausted = true;
                    body.decoder.finish()
                }
            };
            match decoded {
                Ok(deltas) => body.pending.extend(deltas),
                Err(e) => return Some((Err(e), None)),
            }
        }
    })
    .boxed()
}

//! Ticker resolution: fast path, model disambiguation, deterministic fallback

use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use agent_core::Agent;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::analysis::strip_reasoning;
use crate::error::Result;
use crate::model::{Resolution, ResolvedTicker, TickerQuery};
use crate::prompts::Prompts;

#[allow(clippy::unwrap_used)]
static TICKER_SHAPED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2,5}$").unwrap());

#[allow(clippy::unwrap_used)]
static TICKER_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]{2,5}").unwrap());

/// Whether `input` already is a ticker: 2 to 5 uppercase Latin letters
pub fn is_ticker_shaped(input: &str) -> bool {
    TICKER_SHAPED.is_match(input)
}

/// First 2 to 5 letter uppercase run in `text`
pub fn extract_ticker(text: &str) -> Option<&str> {
    TICKER_IN_TEXT.find(text).map(|m| m.as_str())
}

/// Maps free-text company references to ticker symbols
///
/// Resolution never fails once the query is valid: agent errors, timeouts and
/// answers without a ticker all fall back to the uppercased query.
pub struct TickerResolver {
    agent: Arc<dyn Agent>,
    prompts: Arc<Prompts>,
    timeout: Duration,
}

impl TickerResolver {
    pub fn new(agent: Arc<dyn Agent>, prompts: Arc<Prompts>, timeout: Duration) -> Self {
        Self {
            agent,
            prompts,
            timeout,
        }
    }

    /// Validate raw input, then [`resolve`](Self::resolve) it
    ///
    /// Empty or whitespace-only input is the only error.
    pub async fn resolve_str(&self, input: &str) -> Result<ResolvedTicker> {
        let query = TickerQuery::new(input)?;
        Ok(self.resolve(&query).await)
    }

    /// Resolve a validated query
    #[instrument(skip(self), fields(query = %query))]
    pub async fn resolve(&self, query: &TickerQuery) -> ResolvedTicker {
        let input = query.as_str();
        if is_ticker_shaped(input) {
            debug!("input is already a ticker");
            return ResolvedTicker::new(input, Resolution::Verbatim);
        }

        let started = Instant::now();
        match self.ask_agent(input).await {
            Ok(answer) => {
                let answer = strip_reasoning(&answer);
                if let Some(ticker) = extract_ticker(&answer) {
                    info!(ticker, elapsed_ms = started.elapsed().as_millis() as u64, "resolved ticker");
                    return ResolvedTicker::new(ticker, Resolution::Model);
                }
                warn!(answer = %answer, "no ticker in resolver answer");
            }
            Err(reason) => {
                warn!(error = %reason, "ticker resolution failed");
            }
        }

        let fallback = input.to_uppercase();
        warn!(ticker = %fallback, "falling back to uppercased input");
        ResolvedTicker::new(fallback, Resolution::Fallback)
    }

    async fn ask_agent(&self, input: &str) -> std::result::Result<String, String> {
        let prompt = self.prompts.resolver_prompt(input).map_err(|e| e.to_string())?;
        match tokio::time::timeout(self.timeout, self.agent.generate(prompt)).await {
            Ok(answer) => answer.map_err(|e| e.to_string()),
            Err(_) => Err(format!("no answer within {:?}", self.timeout)),
        }
    }
}

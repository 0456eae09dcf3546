//! One series bound to its analyst agent

use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_core::Agent;
use tracing::{debug, warn};

use super::reasoning::strip_reasoning;
use crate::error::{FinanceError, Result};
use crate::model::{ANALYSIS_UNAVAILABLE, NOT_AVAILABLE, Series, is_absent};
use crate::prompts::Prompts;

/// Binds a synthesized series to the agent carrying its persona
#[derive(Clone)]
pub struct AnalysisStage {
    series: Series,
    agent: Arc<dyn Agent>,
}

impl AnalysisStage {
    /// Fails for price and recommendations, which are never synthesized
    pub fn new(series: Series, agent: Arc<dyn Agent>) -> Result<Self> {
        if !series.is_synthesized() {
            return Err(FinanceError::ConfigError(format!(
                "series '{series}' is passed through and takes no analysis stage"
            )));
        }
        Ok(Self { series, agent })
    }

    pub fn series(&self) -> Series {
        self.series
    }

    /// Synthesize `raw`; never fails
    ///
    /// Absent data yields [`NOT_AVAILABLE`] without calling the agent. Agent
    /// errors, timeouts and empty output yield [`ANALYSIS_UNAVAILABLE`].
    pub async fn run(&self, ticker: &str, raw: &str, prompts: &Prompts, timeout: Duration) -> String {
        if is_absent(raw) {
            debug!(series = %self.series, "no data, skipping analysis");
            return NOT_AVAILABLE.to_string();
        }

        let prompt = match prompts.analysis_prompt(self.series, ticker, raw) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(series = %self.series, error = %e, "analysis prompt failed to render");
                return ANALYSIS_UNAVAILABLE.to_string();
            }
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.agent.generate(prompt)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(text)) => {
                let text = strip_reasoning(&text);
                if text.is_empty() {
                    warn!(series = %self.series, elapsed_ms, "analysis came back empty");
                    ANALYSIS_UNAVAILABLE.to_string()
                } else {
                    debug!(series = %self.series, elapsed_ms, words = text.split_whitespace().count(), "analysis completed");
                    text
                }
            }
            Ok(Err(e)) => {
                warn!(series = %self.series, agent = %self.agent.name(), elapsed_ms, error = %e, "analysis failed");
                ANALYSIS_UNAVAILABLE.to_string()
            }
            Err(_) => {
                warn!(series = %self.series, agent = %self.agent.name(), ?timeout, "analysis timed out");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        }
    }
}

impl std::fmt::Debug for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisStage")
            .field("series", &self.series)
            .field("agent", &self.agent.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedAgent;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_passthrough_series_rejected() {
        let agent = Arc::new(ScriptedAgent::replying("x", ["x"]));
        assert!(AnalysisStage::new(Series::Price, agent.clone()).is_err());
        assert!(AnalysisStage::new(Series::Recommendations, agent).is_err());
    }

    #[tokio::test]
    async fn test_sentinel_skips_agent() {
        let agent = Arc::new(ScriptedAgent::replying("dividends", ["never"]));
        let stage = AnalysisStage::new(Series::Dividends, agent.clone()).unwrap();
        let prompts = Prompts::new().unwrap();

        assert_eq!(stage.run("AAPL", NOT_AVAILABLE, &prompts, TIMEOUT).await, NOT_AVAILABLE);
        assert_eq!(stage.run("AAPL", "", &prompts, TIMEOUT).await, NOT_AVAILABLE);
        assert_eq!(agent.calls(), 0);
    }

    #[tokio::test]
    async fn test_output_is_drained_and_stripped() {
        let agent = Arc::new(ScriptedAgent::replying(
            "news",
            ["<think>weigh the", " headlines</think>", "Sentiment is ", "mixed."],
        ));
        let stage = AnalysisStage::new(Series::News, agent.clone()).unwrap();
        let prompts = Prompts::new().unwrap();

        let text = stage.run("AAPL", "Apple unveils M5", &prompts, TIMEOUT).await;
        assert_eq!(text, "Sentiment is mixed.");
        assert_eq!(agent.calls(), 1);
        assert!(agent.prompts()[0].contains("Apple unveils M5"));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let agent = Arc::new(ScriptedAgent::failing("earnings"));
        let stage = AnalysisStage::new(Series::Earnings, agent).unwrap();
        let prompts = Prompts::new().unwrap();

        assert_eq!(stage.run("AAPL", "2025-01-30", &prompts, TIMEOUT).await, ANALYSIS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_timeout_is_isolated() {
        let agent = Arc::new(ScriptedAgent::replying("cash", ["late"]).with_delay(Duration::from_secs(5)));
        let stage = AnalysisStage::new(Series::CashFlow, agent).unwrap();
        let prompts = Prompts::new().unwrap();

        let text = stage.run("AAPL", "OCF 110B", &prompts, Duration::from_millis(50)).await;
        assert_eq!(text, ANALYSIS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_reasoning_only_output_is_unavailable() {
        let agent = Arc::new(ScriptedAgent::replying("income", ["<think>nothing to add</think>  "]));
        let stage = AnalysisStage::new(Series::IncomeStatement, agent).unwrap();
        let prompts = Prompts::new().unwrap();

        assert_eq!(stage.run("AAPL", "Revenue 391B", &prompts, TIMEOUT).await, ANALYSIS_UNAVAILABLE);
    }
}

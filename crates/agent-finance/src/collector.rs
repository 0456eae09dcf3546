//! Fetches the seven raw series for a resolved ticker

use std::time::Instant;

use agent_tools::ToolInvoker;
use futures::{StreamExt, TryStreamExt, stream};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use crate::model::{NOT_AVAILABLE, RawFinancialBundle, ResolvedTicker, Series};

/// Calls one data tool per series and assembles a [`RawFinancialBundle`]
///
/// Any failed call aborts collection; calls still in flight are dropped.
#[derive(Clone)]
pub struct DataCollector {
    invoker: ToolInvoker,
    tools: Vec<(Series, String)>,
    max_concurrency: usize,
}

impl DataCollector {
    /// Fails with a capability error when any data tool is not registered
    pub fn new(invoker: ToolInvoker, config: &FinanceConfig) -> Result<Self> {
        let tools: Vec<(Series, String)> = Series::ALL
            .into_iter()
            .map(|series| (series, config.tool_name(series)))
            .collect();
        invoker.require(tools.iter().map(|(_, name)| name.as_str()))?;

        Ok(Self {
            invoker,
            tools,
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    /// Tool name backing `series`
    pub fn tool_for(&self, series: Series) -> Option<&str> {
        self.tools
            .iter()
            .find(|(s, _)| *s == series)
            .map(|(_, name)| name.as_str())
    }

    #[instrument(skip(self), fields(ticker = %ticker.symbol()))]
    pub async fn collect(&self, ticker: &ResolvedTicker) -> Result<RawFinancialBundle> {
        let started = Instant::now();
        let symbol = ticker.symbol();

        let fetches: Vec<_> = self
            .tools
            .iter()
            .map(|(series, tool)| self.fetch(symbol, *series, tool))
            .collect();
        let fetched: Vec<(Series, String)> = stream::iter(fetches)
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        let mut bundle = RawFinancialBundle::new(symbol);
        let mut missing = 0;
        for (series, payload) in fetched {
            if payload == NOT_AVAILABLE {
                missing += 1;
            }
            bundle.set(series, payload);
        }

        info!(
            missing,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collected financial data"
        );
        Ok(bundle)
    }

    async fn fetch(&self, symbol: &str, series: Series, tool: &str) -> Result<(Series, String)> {
        let output = self
            .invoker
            .invoke(tool, json!({ "symbol": symbol }))
            .await
            .map_err(|source| {
                warn!(%series, error = %source, "data fetch failed");
                FinanceError::DataFetch {
                    ticker: symbol.to_string(),
                    series,
                    source,
                }
            })?;

        let payload = match output.first_text() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                debug!(%series, "empty payload");
                NOT_AVAILABLE.to_string()
            }
        };
        Ok((series, payload))
    }
}

impl std::fmt::Debug for DataCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCollector")
            .field("tools", &self.tools)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

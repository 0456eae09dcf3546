//! Fans a raw bundle out to the analysis stages

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument};

use super::stage::AnalysisStage;
use crate::error::{FinanceError, Result};
use crate::model::{ANALYSIS_UNAVAILABLE, AnalyzedFinancialBundle, NOT_AVAILABLE, RawFinancialBundle, Series};
use crate::prompts::Prompts;

/// Runs one [`AnalysisStage`] per synthesized series
#[derive(Debug)]
pub struct AnalysisRunner {
    stages: Vec<AnalysisStage>,
    prompts: Arc<Prompts>,
    llm_timeout: Duration,
    max_concurrency: usize,
}

impl AnalysisRunner {
    /// Every synthesized series must have exactly one stage
    pub fn new(
        stages: Vec<AnalysisStage>,
        prompts: Arc<Prompts>,
        llm_timeout: Duration,
        max_concurrency: usize,
    ) -> Result<Self> {
        for series in Series::SYNTHESIZED {
            let bound = stages.iter().filter(|s| s.series() == series).count();
            if bound != 1 {
                return Err(FinanceError::ConfigError(format!(
                    "expected one analysis stage for '{series}', found {bound}"
                )));
            }
        }

        let mut stages = stages;
        stages.sort_by_key(AnalysisStage::series);
        Ok(Self {
            stages,
            prompts,
            llm_timeout,
            max_concurrency: max_concurrency.max(1),
        })
    }

    /// Produce the analyzed bundle; never fails
    ///
    /// Price and recommendations are copied unchanged. The bundle is returned
    /// only once every stage has settled.
    #[instrument(skip_all, fields(ticker = %raw.ticker))]
    pub async fn analyze(&self, raw: RawFinancialBundle) -> AnalyzedFinancialBundle {
        let mut analyzed = AnalyzedFinancialBundle::new(raw.ticker.clone());
        analyzed.stock_price.clone_from(&raw.stock_price);
        analyzed.recommendations.clone_from(&raw.recommendations);

        let raw = &raw;
        let runs: Vec<_> = self
            .stages
            .iter()
            .map(|stage| async move {
                let text = stage
                    .run(&raw.ticker, raw.get(stage.series()), &self.prompts, self.llm_timeout)
                    .await;
                (stage.series(), text)
            })
            .collect();
        let results: Vec<(Series, String)> = stream::iter(runs)
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (series, text) in results {
            analyzed.set(series, text);
        }

        let skipped = Series::SYNTHESIZED
            .iter()
            .filter(|s| analyzed.get(**s) == NOT_AVAILABLE)
            .count();
        let failed = Series::SYNTHESIZED
            .iter()
            .filter(|s| analyzed.get(**s) == ANALYSIS_UNAVAILABLE)
            .count();
        info!(skipped, failed, "analysis finished");
        analyzed
    }
}

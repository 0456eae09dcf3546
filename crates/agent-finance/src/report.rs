//! Final report of a pipeline run

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{ANALYSIS_UNAVAILABLE, AnalyzedFinancialBundle, NOT_AVAILABLE, Resolution, Series};

/// What became of one series in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    /// Synthesized by its analyst agent
    Analyzed,
    /// Raw provider payload, by contract
    PassedThrough,
    /// Provider had no data
    NotAvailable,
    /// Data existed but the analyst failed
    AnalysisUnavailable,
}

impl SeriesStatus {
    fn of(series: Series, value: &str) -> Self {
        match value {
            NOT_AVAILABLE => Self::NotAvailable,
            ANALYSIS_UNAVAILABLE => Self::AnalysisUnavailable,
            _ if series.is_synthesized() => Self::Analyzed,
            _ => Self::PassedThrough,
        }
    }
}

impl fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Analyzed => "analyzed",
            Self::PassedThrough => "passed through",
            Self::NotAvailable => NOT_AVAILABLE,
            Self::AnalysisUnavailable => ANALYSIS_UNAVAILABLE,
        })
    }
}

/// An analyzed bundle plus run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReport {
    pub id: Uuid,
    /// Input as the user gave it, trimmed
    pub query: String,
    pub ticker: String,
    pub resolution: Resolution,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub analysis: AnalyzedFinancialBundle,
}

impl FinancialReport {
    pub fn new(
        query: impl Into<String>,
        resolution: Resolution,
        elapsed_ms: u64,
        analysis: AnalyzedFinancialBundle,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            ticker: analysis.ticker.clone(),
            resolution,
            generated_at: Utc::now(),
            elapsed_ms,
            analysis,
        }
    }

    /// Status of every series, in report order
    pub fn series_status(&self) -> Vec<(Series, SeriesStatus)> {
        self.analysis
            .iter()
            .map(|(series, value)| (series, SeriesStatus::of(series, value)))
            .collect()
    }

    /// Number of series that carry real content
    pub fn content_count(&self) -> usize {
        self.series_status()
            .into_iter()
            .filter(|(_, status)| matches!(status, SeriesStatus::Analyzed | SeriesStatus::PassedThrough))
            .count()
    }

    /// Render as a markdown document, one section per series
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Financial Analysis: {}\n\n", self.ticker));
        out.push_str(&format!(
            "_Query \"{}\" resolved by {} on {} in {} ms (run {})_\n\n",
            self.query,
            self.resolution,
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed_ms,
            self.id
        ));

        for (series, value) in self.analysis.iter() {
            out.push_str(&format!("## {}\n\n", series.title()));
            if series.is_synthesized() || value == NOT_AVAILABLE {
                out.push_str(value);
            } else {
                out.push_str("```\n");
                out.push_str(value);
                out.push_str("\n```");
            }
            out.push_str("\n\n");
        }

        out
    }
}

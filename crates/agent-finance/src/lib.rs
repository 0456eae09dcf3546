//! Financial research pipeline
//!
//! Turns a free-text company reference into a structured research report,
//! and answers free-form questions through [`FinancialAnalyst`]:
//!
//! - Ticker resolution: ticker-shaped input passes through, anything else is
//!   asked of a resolver agent, with the uppercased input as fallback
//! - Data collection: seven series fetched through `<provider>_<operation>`
//!   tools, empty payloads marked `"not available"`
//! - Analysis: five series summarized by dedicated analyst personas, price
//!   and recommendations passed through unchanged
//!
//! # Architecture
//!
//! [`FinancialPipeline`] chains three workflow steps:
//! - `fetch-ticker`: [`TickerResolver`]
//! - `fetch-stock-data`: [`DataCollector`]
//! - `analyze-stock-data`: [`AnalysisRunner`]
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_finance::{FinanceConfig, FinancialPipeline, TickerQuery};
//! use agent_runtime::AgentRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = AgentRuntime::builder()
//!         .provider(/* your provider */)
//!         .invoker(/* invoker over MCP tools */)
//!         .build()?;
//!
//!     let pipeline = FinancialPipeline::from_runtime(
//!         &runtime,
//!         runtime.invoker().clone(),
//!         FinanceConfig::from_env()?,
//!     )?;
//!
//!     let report = pipeline.run_report(TickerQuery::new("Apple")?).await?;
//!     println!("{}", report.to_markdown());
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod analyst;
pub mod collector;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod resolver;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use analysis::{AnalysisRunner, AnalysisStage, strip_reasoning};
pub use analyst::FinancialAnalyst;
pub use collector::DataCollector;
pub use config::{FinanceConfig, FinanceConfigBuilder};
pub use error::{FinanceError, Result};
pub use model::{
    ANALYSIS_UNAVAILABLE, AnalyzedFinancialBundle, NOT_AVAILABLE, RawFinancialBundle, Resolution,
    ResolvedTicker, Series, TickerQuery,
};
pub use pipeline::FinancialPipeline;
pub use prompts::Prompts;
pub use report::{FinancialReport, SeriesStatus};
pub use resolver::TickerResolver;

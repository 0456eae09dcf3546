//! The research pipeline: resolve, collect, analyze
//!
//! Built as a three-step [`Workflow`]. Each step consumes the previous
//! step's record and hands a new one on; nothing outlives a run.

use std::sync::Arc;
use std::time::Instant;

use agent_core::Agent;
use agent_runtime::AgentRuntime;
use agent_tools::ToolInvoker;
use agent_workflow::{Chain, Step, Traced, Workflow};
use async_trait::async_trait;
use tracing::{info, instrument};

use crate::analysis::{AnalysisRunner, AnalysisStage};
use crate::collector::DataCollector;
use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use crate::model::{AnalyzedFinancialBundle, RawFinancialBundle, ResolvedTicker, Series, TickerQuery};
use crate::prompts::Prompts;
use crate::report::FinancialReport;
use crate::resolver::TickerResolver;

/// Output of `fetch-stock-data`
#[derive(Debug, Clone)]
pub struct CollectedData {
    pub ticker: ResolvedTicker,
    pub raw: RawFinancialBundle,
}

/// Output of `analyze-stock-data`
#[derive(Debug, Clone)]
pub struct AnalyzedData {
    pub ticker: ResolvedTicker,
    pub analysis: AnalyzedFinancialBundle,
}

pub struct FetchTicker(Arc<TickerResolver>);

#[async_trait]
impl Step for FetchTicker {
    type Input = TickerQuery;
    type Output = ResolvedTicker;
    type Error = FinanceError;

    fn id(&self) -> &str {
        "fetch-ticker"
    }

    async fn execute(&self, input: TickerQuery) -> Result<ResolvedTicker> {
        Ok(self.0.resolve(&input).await)
    }
}

pub struct FetchStockData(Arc<DataCollector>);

#[async_trait]
impl Step for FetchStockData {
    type Input = ResolvedTicker;
    type Output = CollectedData;
    type Error = FinanceError;

    fn id(&self) -> &str {
        "fetch-stock-data"
    }

    async fn execute(&self, ticker: ResolvedTicker) -> Result<CollectedData> {
        let raw = self.0.collect(&ticker).await?;
        Ok(CollectedData { ticker, raw })
    }
}

pub struct AnalyzeStockData(Arc<AnalysisRunner>);

#[async_trait]
impl Step for AnalyzeStockData {
    type Input = CollectedData;
    type Output = AnalyzedData;
    type Error = FinanceError;

    fn id(&self) -> &str {
        "analyze-stock-data"
    }

    async fn execute(&self, input: CollectedData) -> Result<AnalyzedData> {
        let analysis = self.0.analyze(input.raw).await;
        Ok(AnalyzedData {
            ticker: input.ticker,
            analysis,
        })
    }
}

type Steps = Chain<Chain<Traced<FetchTicker>, Traced<FetchStockData>>, Traced<AnalyzeStockData>>;

/// Orchestrates one research run per query
///
/// Runs share the resolver, collector and runner read-only and can proceed
/// concurrently.
pub struct FinancialPipeline {
    workflow: Workflow<Steps>,
}

impl FinancialPipeline {
    pub fn new(resolver: TickerResolver, collector: DataCollector, runner: AnalysisRunner) -> Self {
        let workflow = Workflow::new("financial-analysis", FetchTicker(Arc::new(resolver)))
            .then(FetchStockData(Arc::new(collector)))
            .then(AnalyzeStockData(Arc::new(runner)));
        Self { workflow }
    }

    /// Build every agent from `runtime` and bind the data tools of `invoker`
    ///
    /// `invoker` is reconfigured with the configured tool timeout and rate
    /// limit. The resolver is offered the search tool only when the runtime's
    /// registry has it.
    pub fn from_runtime(runtime: &AgentRuntime, invoker: ToolInvoker, config: FinanceConfig) -> Result<Self> {
        config.validate()?;
        let prompts = Arc::new(Prompts::new()?);

        let mut invoker = invoker.with_timeout(config.tool_timeout);
        if let Some(per_second) = config.rate_limit_per_second {
            invoker = invoker.with_rate_limit(per_second);
        }
        let collector = DataCollector::new(invoker, &config)?;

        let search = config
            .search_tool
            .as_deref()
            .filter(|tool| runtime.invoker().registry().contains(tool));
        let resolver_agent = runtime.create_agent(
            "ticker-resolver",
            agent_config(runtime, &config, prompts.resolver_instructions(search)?),
            search.as_slice(),
        );
        let resolver = TickerResolver::new(Arc::new(resolver_agent), Arc::clone(&prompts), config.llm_timeout);

        let mut stages = Vec::with_capacity(Series::SYNTHESIZED.len());
        for series in Series::SYNTHESIZED {
            let instructions = prompts.analyst_instructions(series, config.word_budget)?;
            let agent: Arc<dyn Agent> = Arc::new(runtime.create_agent(
                format!("{}-analyst", series.key().replace('_', "-")),
                agent_config(runtime, &config, instructions),
                &[],
            ));
            stages.push(AnalysisStage::new(series, agent)?);
        }
        let runner = AnalysisRunner::new(stages, prompts, config.llm_timeout, config.max_concurrency)?;

        info!(
            model = %config.model,
            search = search.unwrap_or("none"),
            max_concurrency = config.max_concurrency,
            "financial pipeline ready"
        );
        Ok(Self::new(resolver, collector, runner))
    }

    /// Step identifiers in execution order
    pub fn step_ids(&self) -> Vec<String> {
        self.workflow.step_ids()
    }

    /// Resolve, collect and analyze
    ///
    /// Only a failed data fetch is an error; resolution and analysis problems
    /// degrade to fallbacks and sentinels.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn run(&self, query: TickerQuery) -> Result<AnalyzedFinancialBundle> {
        Ok(self.workflow.run(query).await?.analysis)
    }

    /// [`run`](Self::run) plus run metadata
    #[instrument(skip(self), fields(query = %query))]
    pub async fn run_report(&self, query: TickerQuery) -> Result<FinancialReport> {
        let started = Instant::now();
        let query_text = query.as_str().to_string();
        let output = self.workflow.run(query).await?;
        let report = FinancialReport::new(
            query_text,
            output.ticker.resolution(),
            started.elapsed().as_millis() as u64,
            output.analysis,
        );
        info!(
            id = %report.id,
            ticker = %report.ticker,
            elapsed_ms = report.elapsed_ms,
            "report ready"
        );
        Ok(report)
    }
}

pub(crate) fn agent_config(runtime: &AgentRuntime, config: &FinanceConfig, instructions: String) -> agent_runtime::AgentConfig {
    agent_runtime::AgentConfig {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        ..runtime.agent_config(instructions)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agent_tools::ToolRegistry;

    use super::*;
    use crate::model::{ANALYSIS_UNAVAILABLE, NOT_AVAILABLE, Resolution};
    use crate::test_support::{Fixture, PersonaProvider, ScriptedAgent, data_registry};

    struct Harness {
        pipeline: FinancialPipeline,
        resolver: Arc<ScriptedAgent>,
        analysts: Vec<(Series, Arc<ScriptedAgent>)>,
    }

    fn harness(resolver: ScriptedAgent, overrides: &[(Series, Fixture)]) -> Harness {
        let config = FinanceConfig::default();
        let prompts = Arc::new(Prompts::new().unwrap());
        let resolver = Arc::new(resolver);
        let (registry, _) = data_registry(&config, overrides);

        let analysts: Vec<_> = Series::SYNTHESIZED
            .into_iter()
            .map(|s| (s, Arc::new(ScriptedAgent::replying(s.key(), [format!("{} insight", s.key())]))))
            .collect();
        let stages = analysts
            .iter()
            .map(|(s, a)| AnalysisStage::new(*s, a.clone()).unwrap())
            .collect();

        let pipeline = FinancialPipeline::new(
            TickerResolver::new(resolver.clone(), prompts.clone(), Duration::from_secs(5)),
            DataCollector::new(ToolInvoker::new(Arc::new(registry)), &config).unwrap(),
            AnalysisRunner::new(stages, prompts, Duration::from_secs(5), 4).unwrap(),
        );
        Harness {
            pipeline,
            resolver,
            analysts,
        }
    }

    fn query(text: &str) -> TickerQuery {
        TickerQuery::new(text).unwrap()
    }

    #[test]
    fn test_step_order() {
        let h = harness(ScriptedAgent::replying("ticker", ["AAPL"]), &[]);
        assert_eq!(
            h.pipeline.step_ids(),
            vec!["fetch-ticker", "fetch-stock-data", "analyze-stock-data"]
        );
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let h = harness(
            ScriptedAgent::replying("ticker", ["Based on research, the ticker is AAPL."]),
            &[(Series::Dividends, Fixture::Text(String::new()))],
        );
        let bundle = h.pipeline.run(query("Apple")).await.unwrap();

        assert_eq!(bundle.ticker, "AAPL");
        assert_eq!(bundle.stock_price, "stock_price payload");
        assert_eq!(bundle.recommendations, "recommendations payload");
        assert_eq!(bundle.dividends, NOT_AVAILABLE);
        assert_eq!(bundle.news, "news insight");
        assert_eq!(bundle.earnings, "earnings insight");
        assert_eq!(h.resolver.calls(), 1);
        for (series, agent) in &h.analysts {
            let expected = usize::from(*series != Series::Dividends);
            assert_eq!(agent.calls(), expected, "{series}");
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_before_analysis() {
        let h = harness(ScriptedAgent::replying("ticker", ["MSFT"]), &[(Series::News, Fixture::Fail)]);
        let err = h.pipeline.run(query("MSFT")).await.unwrap_err();

        assert_eq!(err.series(), Some(Series::News));
        assert_eq!(h.resolver.calls(), 0);
        assert!(h.analysts.iter().all(|(_, a)| a.calls() == 0));
    }

    #[tokio::test]
    async fn test_no_data_means_no_analysis() {
        let empty: Vec<_> = Series::ALL
            .into_iter()
            .map(|s| (s, Fixture::Text(String::new())))
            .collect();
        let h = harness(ScriptedAgent::replying("ticker", ["ZZZZ"]), &empty);
        let bundle = h.pipeline.run(query("ZZZZ")).await.unwrap();

        assert!(bundle.iter().all(|(_, value)| value == NOT_AVAILABLE));
        assert!(h.analysts.iter().all(|(_, a)| a.calls() == 0));
    }

    #[tokio::test]
    async fn test_report_carries_resolution() {
        let h = harness(ScriptedAgent::failing("ticker"), &[]);
        let report = h.pipeline.run_report(query("  tesla ")).await.unwrap();

        assert_eq!(report.query, "tesla");
        assert_eq!(report.ticker, "TESLA");
        assert_eq!(report.resolution, Resolution::Fallback);
        assert_eq!(report.analysis.cash_flow, "cash_flow insight");
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_pipeline() {
        let h = harness(ScriptedAgent::replying("ticker", ["AAPL"]), &[]);
        let (a, b) = tokio::join!(h.pipeline.run(query("AAPL")), h.pipeline.run(query("MSFT")));
        assert_eq!(a.unwrap().ticker, "AAPL");
        assert_eq!(b.unwrap().ticker, "MSFT");
    }

    fn runtime(provider: Arc<PersonaProvider>, registry: ToolRegistry) -> AgentRuntime {
        AgentRuntime::builder()
            .provider(provider)
            .invoker(ToolInvoker::new(Arc::new(registry)))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_from_runtime_builds_personas() {
        let config = FinanceConfig::builder()
            .model("local-model")
            .without_search_tool()
            .max_concurrency(1)
            .build()
            .unwrap();
        let (data, _) = data_registry(&config, &[(Series::News, Fixture::Text(String::new()))]);
        let provider = Arc::new(PersonaProvider::new("NVDA"));
        let pipeline = FinancialPipeline::from_runtime(
            &runtime(provider.clone(), ToolRegistry::new()),
            ToolInvoker::new(Arc::new(data)),
            config,
        )
        .unwrap();

        let report = pipeline.run_report(query("Nvidia")).await.unwrap();
        assert_eq!(report.ticker, "NVDA");
        assert_eq!(report.resolution, Resolution::Model);
        assert_eq!(report.analysis.news, NOT_AVAILABLE);
        assert!(report.analysis.dividends.starts_with("Reviewed dividends"));
        assert!(!report.analysis.dividends.contains("<think>"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 5);
        assert!(requests.iter().all(|r| r.model == "local-model"));
        let system = requests[1].system.as_deref().unwrap_or_default();
        assert!(system.contains("under 400 words"));
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_from_runtime_offers_registered_search_tool() {
        let config = FinanceConfig::default();
        let (data, _) = data_registry(&config, &[]);
        let mut agent_tools = ToolRegistry::new();
        agent_tools.register(Arc::new(crate::test_support::FixtureTool::new(
            "duckduckgo_search",
            Fixture::Text("Apple Inc. (AAPL)".to_string()),
        )));
        let provider = Arc::new(PersonaProvider::new("AAPL"));
        let pipeline = FinancialPipeline::from_runtime(
            &runtime(provider.clone(), agent_tools),
            ToolInvoker::new(Arc::new(data)),
            config,
        )
        .unwrap();

        let bundle = pipeline.run(query("Apple")).await.unwrap();
        assert_eq!(bundle.ticker, "AAPL");
        let resolver_request = &provider.requests()[0];
        let tools = resolver_request.tools.as_ref().unwrap();
        assert_eq!(tools[0].name, "duckduckgo_search");
    }

    #[tokio::test]
    async fn test_from_runtime_requires_data_tools() {
        let config = FinanceConfig::default();
        let provider = Arc::new(PersonaProvider::new("AAPL"));
        let err = FinancialPipeline::from_runtime(
            &runtime(provider, ToolRegistry::new()),
            ToolInvoker::new(Arc::new(ToolRegistry::new())),
            config,
        )
        .err()
        .unwrap();
        assert!(matches!(err, FinanceError::Tool(_)));
    }

    #[tokio::test]
    async fn test_failed_analysis_is_isolated() {
        let config = FinanceConfig::default();
        let (data, _) = data_registry(&config, &[]);
        let provider = Arc::new(PersonaProvider::new("AAPL").failing_for("cash flow"));
        let pipeline =
            FinancialPipeline::from_runtime(&runtime(provider, ToolRegistry::new()), ToolInvoker::new(Arc::new(data)), config)
                .unwrap();

        let bundle = pipeline.run(query("AAPL")).await.unwrap();
        assert_eq!(bundle.cash_flow, ANALYSIS_UNAVAILABLE);
        assert!(bundle.income_statement.starts_with("Reviewed income statement"));
    }
}

//! `fin-analyst`: financial research from the command line
//!
//! Connects the configured MCP servers, then either runs the research
//! pipeline for one company or lets the general analyst answer a free-form
//! question with every discovered tool.
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! export OPENAI_API_BASE="http://localhost:1234/v1"   # optional
//!
//! cargo run -p agent-cli -- research "Apple" --format markdown
//! cargo run -p agent-cli -- ask "How did Nvidia's dividend change this year?"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use agent_finance::{FinanceConfig, FinancialAnalyst, FinancialPipeline, FinancialReport, TickerQuery};
use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
use agent_mcp::discovery::register_discovered_tools;
use agent_mcp::{MCPClientManager, MCPConfig};
use agent_runtime::AgentRuntime;
use agent_tools::{ToolInvoker, ToolRegistry};
use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{ContentArrangement, Table, presets};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fin-analyst")]
#[command(about = "Financial research over MCP market data and web search tools", long_about = None)]
struct Args {
    /// MCP server configuration (`mcpServers` JSON)
    #[arg(long, global = true, default_value = "mcp.json")]
    mcp_config: PathBuf,

    /// Model for every agent (overrides OPENAI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a company's ticker, fetch its financials and analyze them
    Research {
        /// Company name or ticker symbol
        query: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Fetch and analyze one series at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Answer a free-form financial question using every discovered tool
    Ask {
        /// The question, e.g. "What are analysts saying about MSFT?"
        question: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_config = agent_utils::Config::from_env().context("invalid logging configuration")?;
    agent_utils::init_tracing_with(&app_config);

    let args = Args::parse();

    let mut config = FinanceConfig::from_env()?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Command::Research { sequential: true, .. } = args.command {
        config.max_concurrency = 1;
    }

    let mcp_config = MCPConfig::from_file(&args.mcp_config)
        .with_context(|| format!("loading {}", args.mcp_config.display()))?;
    check_timeouts(&mcp_config, &config)?;
    let manager = Arc::new(MCPClientManager::new(Arc::new(mcp_config)));

    let outcome = run(&manager, args.command, config).await;

    if let Err(e) = manager.shutdown().await {
        warn!(error = %e, "MCP shutdown failed");
    }

    match outcome? {
        Outcome::Report(report, format) => match format {
            OutputFormat::Text => print_text(&report),
            OutputFormat::Markdown => print!("{}", report.to_markdown()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        },
        Outcome::Answer(answer) => println!("{answer}"),
    }
    Ok(())
}

enum Outcome {
    Report(FinancialReport, OutputFormat),
    Answer(String),
}

/// Reject server request deadlines that the tool timeout would always cut
/// short, leaving no room for the client's reset and retry
fn check_timeouts(mcp: &MCPConfig, config: &FinanceConfig) -> anyhow::Result<()> {
    for (name, server) in mcp.enabled_servers() {
        if !config.fits_request_timeout(server.request_timeout()) {
            bail!(
                "server '{name}' has requestTimeoutSecs {} but the tool timeout is {}s; \
                 lower requestTimeoutSecs or raise FIN_TOOL_TIMEOUT_SECS",
                server.request_timeout_secs,
                config.tool_timeout.as_secs()
            );
        }
    }
    Ok(())
}

async fn run(manager: &Arc<MCPClientManager>, command: Command, config: FinanceConfig) -> anyhow::Result<Outcome> {
    let connected = manager.initialize().await?;
    if connected == 0 {
        bail!("no MCP server could be started");
    }

    let mut registry = ToolRegistry::new();
    let tools = register_discovered_tools(manager, &mut registry).await?;
    info!(servers = connected, tools = tools.len(), "tools registered");
    let invoker = ToolInvoker::new(Arc::new(registry)).with_timeout(config.tool_timeout);

    let provider = OpenAIProvider::with_config(
        OpenAIConfig::from_env()?.with_timeout(config.llm_timeout.as_secs().max(1)),
    )?;
    let runtime = AgentRuntime::builder()
        .provider(Arc::new(provider))
        .invoker(invoker.clone())
        .default_model(config.model.clone())
        .build()?;

    match command {
        Command::Research { query, format, .. } => {
            let query = TickerQuery::new(&query)?;
            let pipeline = FinancialPipeline::from_runtime(&runtime, invoker, config)
                .context("building the research pipeline")?;
            Ok(Outcome::Report(pipeline.run_report(query).await?, format))
        }
        Command::Ask { question } => {
            let analyst = FinancialAnalyst::from_runtime(&runtime, &config).context("building the analyst")?;
            Ok(Outcome::Answer(analyst.ask(&question).await?))
        }
    }
}

fn print_text(report: &FinancialReport) {
    println!(
        "{} ({} via {}, {} ms)\n",
        report.ticker, report.query, report.resolution, report.elapsed_ms
    );

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Series", "Status"]);
    for (series, status) in report.series_status() {
        table.add_row(vec![series.title().to_string(), status.to_string()]);
    }
    println!("{table}\n");

    for (series, value) in report.analysis.iter() {
        println!("== {} ==\n{}\n", series.title(), value);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_shipped_server_config_fits_tool_timeout() {
        let mcp = MCPConfig::from_json(include_str!("../../../mcp.json")).unwrap();
        assert!(check_timeouts(&mcp, &FinanceConfig::default()).is_ok());
    }

    #[test]
    fn test_request_timeout_longer_than_tool_timeout_is_rejected() {
        let mcp = MCPConfig::from_json(
            r#"{"mcpServers": {"yahoo-finance": {"command": "uvx", "requestTimeoutSecs": 60}}}"#,
        )
        .unwrap();
        let err = check_timeouts(&mcp, &FinanceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("'yahoo-finance'"));

        let patient = FinanceConfig::builder()
            .tool_timeout(Duration::from_secs(90))
            .build()
            .unwrap();
        assert!(check_timeouts(&mcp, &patient).is_ok());
    }

    #[test]
    fn test_subcommands_parse() {
        let args = Args::try_parse_from(["fin-analyst", "research", "Apple", "--format", "json", "--sequential"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Research { ref query, format: OutputFormat::Json, sequential: true } if query == "Apple"
        ));

        let args = Args::try_parse_from(["fin-analyst", "ask", "Is AAPL a buy?", "--model", "llama3"]).unwrap();
        assert_eq!(args.model.as_deref(), Some("llama3"));
        assert!(matches!(args.command, Command::Ask { ref question } if question == "Is AAPL a buy?"));
    }
}

//! Prompt templates for the resolver and analyst agents
//!
//! Templates are rendered with MiniJinja:
//! - `system`: agent instructions, one persona per analyzed series plus the
//!   general analyst
//! - `user`: the single user message each invocation submits

mod system;
mod user;

use minijinja::{Environment, context};

use crate::error::Result;
use crate::model::Series;

const RESOLVER_SYSTEM: &str = "resolver.system";
const RESOLVER_USER: &str = "resolver.user";
const ANALYST_FOOTER: &str = "analyst.footer";
const ANALYSIS_USER: &str = "analysis.user";
const FINANCIAL_ANALYST: &str = "analyst.general";

/// Compiled prompt templates
pub struct Prompts {
    env: Environment<'static>,
}

impl Prompts {
    /// Compile every template
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(RESOLVER_SYSTEM, system::TICKER_RESOLVER)?;
        env.add_template(RESOLVER_USER, user::RESOLVE_TICKER)?;
        env.add_template(ANALYST_FOOTER, system::ANALYST_FOOTER)?;
        env.add_template(ANALYSIS_USER, user::ANALYZE_SERIES)?;
        env.add_template(FINANCIAL_ANALYST, system::FINANCIAL_ANALYST)?;
        for series in Series::SYNTHESIZED {
            env.add_template(persona_name(series), persona(series))?;
        }
        Ok(Self { env })
    }

    /// Resolver instructions, mentioning the search tool when one is offered
    pub fn resolver_instructions(&self, search_tool: Option<&str>) -> Result<String> {
        Ok(self
            .env
            .get_template(RESOLVER_SYSTEM)?
            .render(context! { search_tool })?)
    }

    /// The resolver's user message for an already trimmed query
    pub fn resolver_prompt(&self, query: &str) -> Result<String> {
        Ok(self
            .env
            .get_template(RESOLVER_USER)?
            .render(context! { query })?)
    }

    /// Persona for `series` plus the shared word budget instruction
    pub fn analyst_instructions(&self, series: Series, word_budget: u32) -> Result<String> {
        let persona = self.env.get_template(persona_name(series))?.render(context! {})?;
        let footer = self
            .env
            .get_template(ANALYST_FOOTER)?
            .render(context! { word_budget })?;
        Ok(persona + &footer)
    }

    /// General analyst instructions listing the tools it is offered
    pub fn financial_analyst_instructions(&self, tools: &[&str]) -> Result<String> {
        Ok(self
            .env
            .get_template(FINANCIAL_ANALYST)?
            .render(context! { tools })?)
    }

    /// The analyst's user message embedding the raw payload verbatim
    pub fn analysis_prompt(&self, series: Series, ticker: &str, data: &str) -> Result<String> {
        Ok(self.env.get_template(ANALYSIS_USER)?.render(context! {
            title => series.title(),
            ticker,
            data,
        })?)
    }
}

impl std::fmt::Debug for Prompts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompts")
            .field("templates", &self.env.templates().count())
            .finish()
    }
}

fn persona_name(series: Series) -> &'static str {
    match series {
        Series::Dividends => "analyst.dividends",
        Series::IncomeStatement => "analyst.income_statement",
        Series::CashFlow => "analyst.cash_flow",
        Series::News => "analyst.news",
        Series::Earnings => "analyst.earnings",
        Series::Price | Series::Recommendations => "analyst.passthrough",
    }
}

fn persona(series: Series) -> &'static str {
    match series {
        Series::Dividends => system::DIVIDEND_ANALYST,
        Series::IncomeStatement => system::INCOME_STATEMENT_ANALYST,
        Series::CashFlow => system::CASH_FLOW_ANALYST,
        Series::News => system::NEWS_ANALYST,
        Series::Earnings => system::EARNINGS_ANALYST,
        Series::Price | Series::Recommendations => "",
    }
}

//! Records flowing through the pipeline

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FinanceError, Result};

/// Placeholder for a series the provider returned nothing for
pub const NOT_AVAILABLE: &str = "not available";

/// Placeholder for a series whose synthesis failed
pub const ANALYSIS_UNAVAILABLE: &str = "analysis unavailable";

/// Whether `value` carries no data: empty or the [`NOT_AVAILABLE`] sentinel
pub fn is_absent(value: &str) -> bool {
    value.is_empty() || value == NOT_AVAILABLE
}

/// Free-text company reference, trimmed and non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerQuery(String);

impl TickerQuery {
    pub fn new(input: impl AsRef<str>) -> Result<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FinanceError::InvalidInput(
                "query must be a non-empty string".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TickerQuery {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TickerQuery {
    type Error = FinanceError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TickerQuery> for String {
    fn from(query: TickerQuery) -> Self {
        query.0
    }
}

impl fmt::Display for TickerQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a ticker was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The query already looked like a ticker
    Verbatim,
    /// Extracted from the resolver agent's answer
    Model,
    /// The agent failed or gave no ticker; uppercased query
    Fallback,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verbatim => "verbatim",
            Self::Model => "model",
            Self::Fallback => "fallback",
        })
    }
}

/// Canonical ticker produced by the resolver
///
/// Not re-validated downstream. A fallback symbol is the uppercased query and
/// need not be ticker-shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTicker {
    symbol: String,
    resolution: Resolution,
}

impl ResolvedTicker {
    pub(crate) fn new(symbol: impl Into<String>, resolution: Resolution) -> Self {
        Self {
            symbol: symbol.into(),
            resolution,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl fmt::Display for ResolvedTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// The seven tracked financial data series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    Price,
    Dividends,
    IncomeStatement,
    CashFlow,
    News,
    Recommendations,
    Earnings,
}

impl Series {
    /// Every series, in collection order
    pub const ALL: [Series; 7] = [
        Series::Price,
        Series::Dividends,
        Series::IncomeStatement,
        Series::CashFlow,
        Series::News,
        Series::Recommendations,
        Series::Earnings,
    ];

    /// Series that get a dedicated analysis agent
    pub const SYNTHESIZED: [Series; 5] = [
        Series::Dividends,
        Series::IncomeStatement,
        Series::CashFlow,
        Series::News,
        Series::Earnings,
    ];

    /// Provider operation name; the tool is `<provider>_<operation>`
    pub fn operation(self) -> &'static str {
        match self {
            Self::Price => "get_current_stock_price",
            Self::Dividends => "get_dividends",
            Self::IncomeStatement => "get_income_statement",
            Self::CashFlow => "get_cashflow",
            Self::News => "get_news",
            Self::Recommendations => "get_recommendations",
            Self::Earnings => "get_earning_dates",
        }
    }

    /// Stable snake_case name used in logs and errors
    pub fn key(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Dividends => "dividends",
            Self::IncomeStatement => "income_statement",
            Self::CashFlow => "cash_flow",
            Self::News => "news",
            Self::Recommendations => "recommendations",
            Self::Earnings => "earnings",
        }
    }

    /// Human-readable title
    pub fn title(self) -> &'static str {
        match self {
            Self::Price => "Stock Price",
            Self::Dividends => "Dividends",
            Self::IncomeStatement => "Income Statement",
            Self::CashFlow => "Cash Flow",
            Self::News => "News",
            Self::Recommendations => "Analyst Recommendations",
            Self::Earnings => "Earnings",
        }
    }

    /// Price and recommendations pass through analysis untouched
    pub fn is_synthesized(self) -> bool {
        !matches!(self, Self::Price | Self::Recommendations)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Defines a fixed-shape record with one text field per [`Series`]
macro_rules! series_bundle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub ticker: String,
            pub stock_price: String,
            pub dividends: String,
            pub income_statement: String,
            pub cash_flow: String,
            pub news: String,
            pub recommendations: String,
            pub earnings: String,
        }

        impl $name {
            /// Every series set to [`NOT_AVAILABLE`]
            pub fn new(ticker: impl Into<String>) -> Self {
                Self {
                    ticker: ticker.into(),
                    stock_price: NOT_AVAILABLE.to_string(),
                    dividends: NOT_AVAILABLE.to_string(),
                    income_statement: NOT_AVAILABLE.to_string(),
                    cash_flow: NOT_AVAILABLE.to_string(),
                    news: NOT_AVAILABLE.to_string(),
                    recommendations: NOT_AVAILABLE.to_string(),
                    earnings: NOT_AVAILABLE.to_string(),
                }
            }

            pub fn get(&self, series: Series) -> &str {
                match series {
                    Series::Price => &self.stock_price,
                    Series::Dividends => &self.dividends,
                    Series::IncomeStatement => &self.income_statement,
                    Series::CashFlow => &self.cash_flow,
                    Series::News => &self.news,
                    Series::Recommendations => &self.recommendations,
                    Series::Earnings => &self.earnings,
                }
            }

            pub fn set(&mut self, series: Series, value: impl Into<String>) {
                let slot = match series {
                    Series::Price => &mut self.stock_price,
                    Series::Dividends => &mut self.dividends,
                    Series::IncomeStatement => &mut self.income_statement,
                    Series::CashFlow => &mut self.cash_flow,
                    Series::News => &mut self.news,
                    Series::Recommendations => &mut self.recommendations,
                    Series::Earnings => &mut self.earnings,
                };
                *slot = value.into();
            }

            /// `(series, value)` pairs in collection order
            pub fn iter(&self) -> impl Iterator<Item = (Series, &str)> {
                Series::ALL.into_iter().map(move |s| (s, self.get(s)))
            }
        }
    };
}

series_bundle!(
    /// Verbatim provider payloads, one per series
    RawFinancialBundle
);

series_bundle!(
    /// Syntheses for the five analyzed series; price and recommendations
    /// carried over from the raw bundle
    AnalyzedFinancialBundle
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_trimmed() {
        assert_eq!(TickerQuery::new("  Apple Inc ").unwrap().as_str(), "Apple Inc");
        assert!(matches!(TickerQuery::new("   "), Err(FinanceError::InvalidInput(_))));
        assert!("".parse::<TickerQuery>().is_err());
    }

    #[test]
    fn test_series_tables() {
        assert_eq!(Series::ALL.len(), 7);
        assert_eq!(Series::SYNTHESIZED.len(), 5);
        assert!(Series::SYNTHESIZED.iter().all(|s| s.is_synthesized()));
        assert!(!Series::Price.is_synthesized());
        assert!(!Series::Recommendations.is_synthesized());
        assert_eq!(Series::Earnings.operation(), "get_earning_dates");
        assert_eq!(Series::CashFlow.to_string(), "cash_flow");
    }

    #[test]
    fn test_new_bundle_uses_sentinel() {
        let bundle = RawFinancialBundle::new("MSFT");
        assert!(bundle.iter().all(|(_, value)| value == NOT_AVAILABLE));
        assert_eq!(bundle.iter().count(), 7);
    }

    #[test]
    fn test_bundle_json_keys() {
        let mut bundle = AnalyzedFinancialBundle::new("AAPL");
        bundle.set(Series::IncomeStatement, "Revenue grew 8%.");
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["incomeStatement"], "Revenue grew 8%.");
        assert_eq!(json["stockPrice"], NOT_AVAILABLE);
        assert_eq!(json["cashFlow"], NOT_AVAILABLE);
        assert_eq!(json.as_object().unwrap().len(), 8);
    }

    #[test]
    fn test_absent_values() {
        assert!(is_absent(""));
        assert!(is_absent(NOT_AVAILABLE));
        assert!(!is_absent(ANALYSIS_UNAVAILABLE));
    }
}

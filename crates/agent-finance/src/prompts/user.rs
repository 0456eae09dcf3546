//! User message templates

/// Disambiguation prompt sent to the ticker resolver
pub const RESOLVE_TICKER: &str = "Find the stock ticker symbol for: {{ query }}";

/// Prompt embedding one raw series for its analyst
pub const ANALYZE_SERIES: &str = r"Analyze the following {{ title | lower }} data for {{ ticker }}:

{{ data }}";

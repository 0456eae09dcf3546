//! Removal of `<think>…</think>` reasoning spans from model output

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::unwrap_used)]
static THINK_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Remove every `<think>…</think>` span (non-greedy) and trim the rest
///
/// An unpaired marker is left in place.
pub fn strip_reasoning(text: &str) -> String {
    THINK_SPAN.replace_all(text, "").trim().to_string()
}

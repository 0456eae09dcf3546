//! Incremental decoder for chat-completion `text/event-stream` bodies

use serde::Deserialize;

use crate::{LLMError, Result};

/// Splits a byte stream into `data:` events and extracts assistant text.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl SseDecoder {
    /// Whether the `[DONE]` terminator has been seen
    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes, returning text deltas completed by them
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);
        let mut deltas = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(text) = self.decode_line(&line)? {
                deltas.push(text);
            }
        }
        Ok(deltas)
    }

    /// Flush a trailing line that had no newline
    pub(crate) fn finish(&mut self) -> Result<Vec<String>> {
        let line = std::mem::take(&mut self.buffer);
        Ok(self.decode_line(&line)?.into_iter().collect())
    }

    fn decode_line(&mut self, line: &[u8]) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(line);
        let Some(data) = line.trim().strip_prefix("data:") else {
            // blank separators, comments and `event:` lines
            return Ok(None);
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let event: StreamEvent = serde_json::from_str(data).map_err(|e| {
            LLMError::UnexpectedResponse(format!("malformed stream event: {e}"))
        })?;
        if let Some(error) = event.error {
            return Err(LLMError::ProviderError(error.to_string()));
        }

        let text: String = event
            .choices
            .into_iter()
            .filter_map(|choice| choice.delta.content)
            .collect();
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"index": 0, "delta": {"content": content}}]})
        )
    }

    #[test]
    fn test_decodes_deltas_in_order() {
        let mut decoder = SseDecoder::default();
        let body = format!("{}{}data: [DONE]\n\n", event("The ticker "), event("is AAPL."));
        let deltas = decoder.feed(body.as_bytes()).unwrap();
        assert_eq!(deltas, vec!["The ticker ", "is AAPL."]);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let body = event("Caf\u{e9} ");
        let bytes = body.as_bytes();
        // split inside the two-byte 'é'
        let cut = body.find('\u{e9}').unwrap() + 1;
        assert!(decoder.feed(&bytes[..cut]).unwrap().is_empty());
        assert_eq!(decoder.feed(&bytes[cut..]).unwrap(), vec!["Caf\u{e9} "]);
    }

    #[test]
    fn test_ignores_comments_and_role_only_deltas() {
        let mut decoder = SseDecoder::default();
        let body = ": keep-alive\n\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n";
        assert!(decoder.feed(body.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_error_event() {
        let mut decoder = SseDecoder::default();
        let body = "data: {\"error\":{\"message\":\"overloaded\"}}\n";
        let err = decoder.feed(body.as_bytes()).unwrap_err();
        assert!(matches!(err, LLMError::ProviderError(msg) if msg.contains("overloaded")));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        let body = event("tail");
        let trimmed = body.trim_end();
        assert!(decoder.feed(trimmed.as_bytes()).unwrap().is_empty());
        assert_eq!(decoder.finish().unwrap(), vec!["tail"]);
    }

    #[test]
    fn test_nothing_after_done() {
        let mut decoder = SseDecoder::default();
        let body = format!("data: [DONE]\n{}", event("late"));
        assert!(decoder.feed(body.as_bytes()).unwrap().is_empty());
    }
}

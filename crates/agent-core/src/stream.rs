//! Text chunk streams and the helpers to consume them

use futures::stream::{self, BoxStream, StreamExt};

use crate::Result;

/// An ordered, fallible sequence of text chunks produced by an agent
pub type TextStream = BoxStream<'static, Result<String>>;

/// Consume `stream` to completion, concatenating chunks in emission order.
///
/// The first failing chunk aborts the drain and is returned as the error.
pub async fn drain(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        text.push_str(&chunk?);
    }
    Ok(text)
}

/// Build a stream replaying a pre-recorded chunk sequence
pub fn from_chunks<I, S>(chunks: I) -> TextStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let chunks: Vec<Result<String>> = chunks.into_iter().map(|c| Ok(c.into())).collect();
    stream::iter(chunks).boxed()
}

/// A stream with exactly one chunk
pub fn once(text: impl Into<String>) -> TextStream {
    stream::once(std::future::ready(Ok(text.into()))).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_drain_concatenates_in_order() {
        let text = tokio_test::block_on(drain(from_chunks(["Based on ", "research, ", "AAPL."])));
        assert_eq!(text.unwrap(), "Based on research, AAPL.");
    }

    #[test]
    fn test_drain_empty_stream() {
        let text = tokio_test::block_on(drain(from_chunks(Vec::<String>::new())));
        assert_eq!(text.unwrap(), "");
    }

    #[test]
    fn test_drain_stops_on_error() {
        let chunks: Vec<Result<String>> = vec![
            Ok("partial".to_string()),
            Err(Error::ProcessingFailed("connection reset".to_string())),
            Ok("never seen".to_string()),
        ];
        let result = tokio_test::block_on(drain(stream::iter(chunks).boxed()));
        assert!(matches!(result, Err(Error::ProcessingFailed(_))));
    }

    #[test]
    fn test_once() {
        let text = tokio_test::block_on(drain(once("MSFT")));
        assert_eq!(text.unwrap(), "MSFT");
    }
}

//! LLM provider trait definition

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::{CompletionRequest, CompletionResponse, Result};

/// Incremental assistant text, in emission order
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to different LLM services.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Stream the assistant's text as it is generated.
    ///
    /// The default implementation waits for [`complete`](Self::complete) and
    /// yields the whole text as a single chunk.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        let response = self.complete(request).await?;
        let text = response.message.text_content();
        Ok(stream::once(std::future::ready(Ok(text))).boxed())
    }

    /// Get the provider name (e.g., "openai")
    fn name(&self) -> &str;
}

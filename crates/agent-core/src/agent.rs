//! Core Agent trait definition

use async_trait::async_trait;

use crate::{Result, TextStream, drain};

/// A language-model backed agent.
///
/// Every invocation submits exactly one user-role message and answers with a
/// stream of text chunks. Implementations are shared behind `Arc` and may be
/// invoked concurrently.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Get the agent's name
    fn name(&self) -> &str;

    /// Submit `prompt` and return the response as a chunk stream
    async fn stream(&self, prompt: String) -> Result<TextStream>;

    /// Submit `prompt` and drain the response into one string
    async fn generate(&self, prompt: String) -> Result<String> {
        let chunks = self.stream(prompt).await?;
        drain(chunks).await
    }
}

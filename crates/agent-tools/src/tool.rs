//! Tool trait definition

use agent_core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text payload
    Text { text: String },
    /// Base64 image
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Reference to an external resource
    Resource { uri: String },
}

/// Structured result of a tool call: `{content: [{text}, ...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ToolContent>,
}

impl ToolOutput {
    /// Output with a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }

    /// Output with no content at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// The first content block, when it is text
    pub fn first_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ToolContent::Text { text }) => Some(text),
            _ => None,
        }
    }

    /// Every text block joined by newlines
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Trait for tools that agents and pipelines can execute
///
/// Each tool provides a name, description, and JSON schema for its input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    async fn execute(&self, params: Value) -> Result<ToolOutput>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry
    fn name(&self) -> &str;

    /// Get the tool's description
    fn description(&self) -> &str;

    /// Get the tool's input schema (JSON Schema format)
    fn input_schema(&self) -> Value;
}

//! MCPTool wrapper that implements the Tool trait

use std::sync::Arc;

use agent_tools::{Tool, ToolContent, ToolOutput};
use async_trait::async_trait;
use serde_json::Value;

use crate::client::MCPContent;
use crate::client::manager::{MCPClientManager, MCPToolInfo};

/// One tool of one MCP server, exposed to the registry as `<server>_<tool>`
pub struct MCPTool {
    info: MCPToolInfo,
    qualified_name: String,
    client_manager: Arc<MCPClientManager>,
}

impl MCPTool {
    /// Create a new MCPTool
    pub fn new(info: MCPToolInfo, client_manager: Arc<MCPClientManager>) -> Self {
        Self {
            qualified_name: info.qualified_name(),
            info,
            client_manager,
        }
    }

    /// Get the server name this tool belongs to
    pub fn server_name(&self) -> &str {
        &self.info.server_name
    }

    fn convert(content: Vec<MCPContent>) -> ToolOutput {
        let content = content
            .into_iter()
            .filter_map(|block| match block {
                MCPContent::Text { text } => Some(ToolContent::Text { text }),
                MCPContent::Image { data, mime_type } => Some(ToolContent::Image { data, mime_type }),
                MCPContent::Resource { resource } => Some(ToolContent::Resource { uri: resource.uri }),
                MCPContent::Unsupported => None,
            })
            .collect();
        ToolOutput { content }
    }
}

#[async_trait]
impl Tool for MCPTool {
    async fn execute(&self, params: Value) -> agent_core::Result<ToolOutput> {
        let result = self
            .client_manager
            .call_tool(&self.info.server_name, &self.info.definition.name, params)
            .await?;

        if result.is_error() {
            let output = Self::convert(result.content);
            return Err(agent_core::Error::ProcessingFailed(format!(
                "MCP tool '{}' returned error: {}",
                self.qualified_name,
                output.joined_text()
            )));
        }

        Ok(Self::convert(result.content))
    }

    fn name(&self) -> &str {
        &self.qualified_name
    }

    fn description(&self) -> &str {
        self.info
            .definition
            .description
            .as_deref()
            .unwrap_or("MCP tool")
    }

    fn input_schema(&self) -> Value {
        self.info.definition.input_schema.clone()
    }
}

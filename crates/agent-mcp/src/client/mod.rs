//! MCP client abstraction and protocol types

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

pub mod manager;
pub mod stdio;

/// Protocol revision sent in `initialize`
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// A connection to one MCP server
///
/// All methods take `&self` so clients can be shared through `Arc`.
#[async_trait]
pub trait MCPClient: Send + Sync {
    /// Start the server (if needed) and perform the initialize handshake
    async fn connect(&self) -> Result<()>;

    /// Check if client is connected
    fn is_connected(&self) -> bool;

    /// Disconnect from server
    async fn disconnect(&self) -> Result<()>;

    /// List available tools
    async fn list_tools(&self) -> Result<Vec<MCPToolDefinition>>;

    /// Call a tool
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<MCPToolResult>;

    /// Server identity reported during initialize
    async fn server_info(&self) -> Option<MCPServerInfo>;
}

/// Type alias for Arc-wrapped MCP client
pub type ArcMCPClient = Arc<dyn MCPClient>;

/// MCP tool definition (from tools/list)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object"})
}

/// MCP tool result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MCPToolResult {
    #[serde(default)]
    pub content: Vec<MCPContent>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "isError")]
    pub is_error: Option<bool>,
}

impl MCPToolResult {
    /// Whether the server flagged the result as a tool-level error
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// MCP content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MCPContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: EmbeddedResource,
    },
    /// Block types this client does not interpret (audio, links, ...)
    #[serde(other)]
    Unsupported,
}

/// Resource embedded in a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// MCP server info (from initialize)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MCPServerInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
}

impl MCPServerInfo {
    /// Extract server identity from an `initialize` result
    pub fn from_initialize(result: &Value) -> Self {
        let field = |v: &Value| v.as_str().unwrap_or("unknown").to_string();
        Self {
            name: field(&result["serverInfo"]["name"]),
            version: field(&result["serverInfo"]["version"]),
            protocol_version: field(&result["protocolVersion"]),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_decoding() {
        let result: MCPToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Dividends: 0.24"},
                {"type": "audio", "data": "...", "mimeType": "audio/wav"},
                {"type": "resource", "resource": {"uri": "file:///r.csv", "text": "a,b"}}
            ]
        }))
        .unwrap();
        assert_eq!(result.content.len(), 3);
        assert_eq!(result.content[1], MCPContent::Unsupported);
        assert!(!result.is_error());
    }

    #[test]
    fn test_server_info_from_initialize() {
        let info = MCPServerInfo::from_initialize(&json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "mcp-yahoo-finance", "version": "0.1.3"}
        }));
        assert_eq!(info.name, "mcp-yahoo-finance");
        assert_eq!(info.version, "0.1.3");

        let sparse = MCPServerInfo::from_initialize(&json!({}));
        assert_eq!(sparse.name, "unknown");
    }

    #[test]
    fn test_tool_definition_without_schema() {
        let def: MCPToolDefinition =
            serde_json::from_value(json!({"name": "get_news"})).unwrap();
        assert_eq!(def.input_schema["type"], "object");
    }
}

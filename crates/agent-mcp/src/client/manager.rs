//! MCP client manager for coordinating multiple MCP server connections

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::stdio::StdioMCPClient;
use super::{ArcMCPClient, MCPToolDefinition, MCPToolResult};
use crate::Result;
use crate::config::{MCPConfig, MCPServerConfig};
use crate::error::MCPError;
use crate::retry::RetryPolicy;

/// Information about an MCP tool including its source server
#[derive(Debug, Clone)]
pub struct MCPToolInfo {
    pub server_name: String,
    pub definition: MCPToolDefinition,
}

impl MCPToolInfo {
    /// Registry name: `<server>_<tool>`
    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.server_name, self.definition.name)
    }
}

/// Manages the MCP servers named in an [`MCPConfig`]
///
/// The manager handles:
/// - Connection lifecycle for multiple MCP servers
/// - Tool discovery across all connected servers
/// - Tool execution routing, with reconnect and retry on transport failure
/// - Graceful degradation when servers fail to start
pub struct MCPClientManager {
    config: Arc<MCPConfig>,

    /// Active clients (server_name -> client)
    clients: RwLock<BTreeMap<String, ArcMCPClient>>,

    retry: RetryPolicy,
}

impl MCPClientManager {
    /// Create a new MCP client manager
    pub fn new(config: Arc<MCPConfig>) -> Self {
        Self {
            config,
            clients: RwLock::new(BTreeMap::new()),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for connects and tool calls
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Connect every enabled server
    ///
    /// A server that cannot be started is logged and skipped. Returns the
    /// number of servers connected.
    pub async fn initialize(&self) -> Result<usize> {
        let mut connected = 0;

        for (server_name, server_config) in self.config.enabled_servers() {
            match self.connect_server(server_name, server_config).await {
                Ok(client) => {
                    self.clients
                        .write()
                        .await
                        .insert(server_name.to_string(), client);
                    connected += 1;
                }
                Err(e) => {
                    warn!(server = server_name, error = %e, "MCP server unavailable, skipping");
                }
            }
        }

        info!(connected, configured = self.config.mcp_servers.len(), "MCP servers initialized");
        Ok(connected)
    }

    async fn connect_server(
        &self,
        server_name: &str,
        server_config: &MCPServerConfig,
    ) -> Result<ArcMCPClient> {
        let client: ArcMCPClient = Arc::new(StdioMCPClient::new(server_name, server_config.clone()));
        self.retry
            .run("connect", || {
                let client = Arc::clone(&client);
                async move { client.connect().await }
            })
            .await?;
        Ok(client)
    }

    /// Register an already constructed client under `server_name`
    pub async fn attach(&self, server_name: impl Into<String>, client: ArcMCPClient) {
        self.clients.write().await.insert(server_name.into(), client);
    }

    /// List tools of every connected server, applying each server's filter
    ///
    /// A server whose listing fails is skipped.
    pub async fn discover_tools(&self) -> Result<Vec<MCPToolInfo>> {
        let clients = self.clients.read().await;
        let mut tools = Vec::new();

        for (server_name, client) in clients.iter() {
            let definitions = match client.list_tools().await {
                Ok(definitions) => definitions,
                Err(e) => {
                    warn!(server = %server_name, error = %e, "tools/list failed");
                    continue;
                }
            };

            let filter = self
                .config
                .mcp_servers
                .get(server_name)
                .map(|c| &c.tools);
            let before = definitions.len();
            tools.extend(
                definitions
                    .into_iter()
                    .filter(|d| filter.is_none_or(|f| f.allows(&d.name)))
                    .map(|definition| MCPToolInfo {
                        server_name: server_name.clone(),
                        definition,
                    }),
            );
            debug!(server = %server_name, listed = before, "discovered tools");
        }

        Ok(tools)
    }

    /// Call `tool_name` on `server_name`
    ///
    /// Transport failures trigger a reconnect and are retried under the
    /// manager's policy; JSON-RPC errors are returned as-is.
    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<MCPToolResult> {
        let client = self
            .get_client(server_name)
            .await
            .ok_or_else(|| MCPError::ServerNotFound(server_name.to_string()))?;

        self.retry
            .run("tools/call", || {
                let client = Arc::clone(&client);
                let arguments = arguments.clone();
                async move {
                    if !client.is_connected() {
                        debug!(server = server_name, "reconnecting before call");
                        client.connect().await?;
                    }
                    client.call_tool(tool_name, arguments).await
                }
            })
            .await
    }

    /// Get client for a specific server
    pub async fn get_client(&self, server_name: &str) -> Option<ArcMCPClient> {
        self.clients.read().await.get(server_name).cloned()
    }

    /// Names of servers currently holding a live connection
    pub async fn connected_servers(&self) -> Vec<String> {
        self.clients
            .read()
            .await
            .iter()
            .filter(|(_, client)| client.is_connected())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Check if any servers are connected
    pub async fn has_connections(&self) -> bool {
        !self.connected_servers().await.is_empty()
    }

    /// Disconnect and forget all servers
    pub async fn shutdown(&self) -> Result<()> {
        let mut clients = self.clients.write().await;
        for (server_name, client) in clients.iter() {
            if let Err(e) = client.disconnect().await {
                warn!(server = %server_name, error = %e, "error during disconnect");
            }
        }
        clients.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeClient;
    use crate::client::{MCPClient, MCPContent};
    use crate::config::ToolPattern;
    use serde_json::json;

    fn text_result(text: &str) -> MCPToolResult {
        MCPToolResult {
            content: vec![MCPContent::Text {
                text: text.to_string(),
            }],
            is_error: None,
        }
    }

    #[tokio::test]
    async fn test_unstartable_server_degrades_gracefully() {
        let mut config = MCPConfig::default();
        config.mcp_servers.insert(
            "broken".to_string(),
            MCPServerConfig::new("definitely-not-a-real-mcp-server", vec![]),
        );
        let manager =
            MCPClientManager::new(Arc::new(config)).with_retry_policy(RetryPolicy::fast());

        assert_eq!(manager.initialize().await.unwrap(), 0);
        assert!(!manager.has_connections().await);
    }

    #[tokio::test]
    async fn test_discover_applies_filter() {
        let mut server = MCPServerConfig::new("unused", vec![]);
        server.tools.allow = ToolPattern::List(vec!["search".to_string(), "fetch".to_string()]);
        server.tools.deny = vec!["fetch".to_string()];
        let mut config = MCPConfig::default();
        config.mcp_servers.insert("duckduckgo".to_string(), server);

        let manager = MCPClientManager::new(Arc::new(config));
        manager
            .attach("duckduckgo", Arc::new(FakeClient::new(&["search", "fetch", "other"])))
            .await;
        manager
            .attach("yahoo-finance", Arc::new(FakeClient::new(&["get_news"])))
            .await;

        let mut names: Vec<String> = manager
            .discover_tools()
            .await
            .unwrap()
            .iter()
            .map(MCPToolInfo::qualified_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["duckduckgo_search", "yahoo-finance_get_news"]);
    }

    #[tokio::test]
    async fn test_call_routes_to_server() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        let fake = Arc::new(
            FakeClient::new(&["get_dividends"]).with_result("get_dividends", text_result("0.24")),
        );
        manager.attach("yahoo-finance", fake.clone()).await;

        let result = manager
            .call_tool("yahoo-finance", "get_dividends", json!({"symbol": "AAPL"}))
            .await
            .unwrap();
        assert_eq!(result.content, text_result("0.24").content);
        assert_eq!(
            fake.calls.lock().unwrap()[0],
            ("get_dividends".to_string(), json!({"symbol": "AAPL"}))
        );
    }

    #[tokio::test]
    async fn test_call_reconnects_after_transport_failure() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()))
            .with_retry_policy(RetryPolicy::fast());
        let fake = Arc::new(
            FakeClient::new(&["get_news"])
                .with_result("get_news", text_result("headline"))
                .failing_first(1),
        );
        manager.attach("yahoo-finance", fake.clone()).await;

        let result = manager
            .call_tool("yahoo-finance", "get_news", json!({"symbol": "MSFT"}))
            .await
            .unwrap();
        assert_eq!(result.content, text_result("headline").content);
        assert_eq!(fake.calls.lock().unwrap().len(), 2);
        assert!(fake.is_connected());
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        let err = manager
            .call_tool("nowhere", "get_news", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, MCPError::ServerNotFound(name) if name == "nowhere"));
    }

    #[tokio::test]
    async fn test_shutdown_disconnects() {
        let manager = MCPClientManager::new(Arc::new(MCPConfig::default()));
        let fake = Arc::new(FakeClient::new(&[]));
        manager.attach("yahoo-finance", fake.clone()).await;
        assert_eq!(manager.connected_servers().await, vec!["yahoo-finance"]);

        manager.shutdown().await.unwrap();
        assert!(!fake.is_connected());
        assert!(!manager.has_connections().await);
    }
}

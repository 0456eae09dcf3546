//! Tool discovery and registration

use std::sync::Arc;

use agent_tools::ToolRegistry;
use tracing::{debug, info};

use crate::Result;
use crate::client::manager::MCPClientManager;
use crate::tool::MCPTool;

/// Discover tools on every connected server and register them
///
/// Each tool is wrapped as an [`MCPTool`] named `<server>_<tool>`. Returns
/// the registered names in discovery order.
pub async fn register_discovered_tools(
    client_manager: &Arc<MCPClientManager>,
    registry: &mut ToolRegistry,
) -> Result<Vec<String>> {
    let tools = client_manager.discover_tools().await?;
    let mut registered = Vec::with_capacity(tools.len());

    for info in tools {
        let tool = MCPTool::new(info, Arc::clone(client_manager));
        let name = agent_tools::Tool::name(&tool).to_string();
        debug!(tool = %name, "registering MCP tool");
        registry.register(Arc::new(tool));
        registered.push(name);
    }

    info!(count = registered.len(), "registered MCP tools");
    Ok(registered)
}

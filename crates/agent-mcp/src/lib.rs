//! Model Context Protocol (MCP) integration
//!
//! Connects to MCP servers over stdio, lists their tools and exposes each
//! one as an [`agent_tools::Tool`] named `<server>_<tool>`.
//!
//! # Example
//!
//! ```no_run
//! use agent_mcp::{MCPClientManager, MCPConfig, discovery::register_discovered_tools};
//! use agent_tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MCPConfig::from_file(".mcp.json")?;
//! let manager = Arc::new(MCPClientManager::new(Arc::new(config)));
//! manager.initialize().await?;
//!
//! let mut registry = ToolRegistry::new();
//! let names = register_discovered_tools(&manager, &mut registry).await?;
//! println!("registered {names:?}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod retry;
pub mod tool;

// Re-export commonly used types
pub use client::manager::{MCPClientManager, MCPToolInfo};
pub use config::{MCPConfig, MCPServerConfig, ToolFilter, ToolPattern};
pub use error::MCPError;
pub use retry::RetryPolicy;
pub use tool::MCPTool;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, MCPError>;

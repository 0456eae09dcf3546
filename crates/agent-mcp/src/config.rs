//! Configuration types for MCP integration
//!
//! Uses the common `mcpServers` file layout:
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "yahoo-finance": {
//!       "command": "uvx",
//!       "args": ["mcp-yahoo-finance"]
//!     },
//!     "duckduckgo": {
//!       "command": "docker",
//!       "args": ["run", "-i", "--rm", "mcp/duckduckgo"],
//!       "tools": {"allow": ["search"]}
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MCPError;

/// Root MCP configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MCPConfig {
    /// Servers keyed by the name used as tool prefix
    #[serde(default)]
    pub mcp_servers: BTreeMap<String, MCPServerConfig>,
}

/// A stdio MCP server: a subprocess speaking JSON-RPC on stdin/stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MCPServerConfig {
    /// Command to execute
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables for the process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Deadline for each JSON-RPC request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Skip this server without removing it from the file
    #[serde(default)]
    pub disabled: bool,

    /// Which of the server's tools to expose
    #[serde(default)]
    pub tools: ToolFilter,
}

impl MCPServerConfig {
    /// Server launched by `command` with `args` and default settings
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
            cwd: None,
            request_timeout_secs: default_request_timeout_secs(),
            disabled: false,
            tools: ToolFilter::default(),
        }
    }

    /// Request deadline as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Tool filtering configuration
///
/// The deny list wins over the allow list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFilter {
    /// Allowed tools ("*" for all, or list of tool names)
    #[serde(default = "default_allow_all")]
    pub allow: ToolPattern,

    /// Denied tools
    #[serde(default)]
    pub deny: Vec<String>,
}

impl Default for ToolFilter {
    fn default() -> Self {
        Self {
            allow: default_allow_all(),
            deny: Vec::new(),
        }
    }
}

impl ToolFilter {
    /// Whether a tool with this (unprefixed) name passes the filter
    pub fn allows(&self, tool_name: &str) -> bool {
        if self.deny.iter().any(|denied| denied == tool_name) {
            return false;
        }
        match &self.allow {
            ToolPattern::All(pattern) => pattern == "*",
            ToolPattern::List(allowed) => allowed.iter().any(|name| name == tool_name),
        }
    }
}

/// Tool pattern specification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPattern {
    /// Allow all tools; must be "*"
    All(String),

    /// Allow specific tools by name
    List(Vec<String>),
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_allow_all() -> ToolPattern {
    ToolPattern::All("*".to_string())
}

impl MCPConfig {
    /// Load configuration from a file and resolve `${VAR}` references
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MCPError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MCPError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration text and resolve `${VAR}` references
    pub fn from_json(content: &str) -> Result<Self, MCPError> {
        let mut config: MCPConfig = serde_json::from_str(content)
            .map_err(|e| MCPError::ConfigError(format!("Failed to parse config: {e}")))?;
        config.resolve_env_vars()?;
        Ok(config)
    }

    /// Merge another config into this one; `other` wins on name clashes
    pub fn merge(&mut self, other: MCPConfig) {
        self.mcp_servers.extend(other.mcp_servers);
    }

    /// Servers that are not disabled, in name order
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&str, &MCPServerConfig)> {
        self.mcp_servers
            .iter()
            .filter(|(_, server)| !server.disabled)
            .map(|(name, server)| (name.as_str(), server))
    }

    /// Substitute environment variables in commands, args, env values and cwd
    pub fn resolve_env_vars(&mut self) -> Result<(), MCPError> {
        for server in self.mcp_servers.values_mut() {
            server.command = resolve_env_string(&server.command)?;
            for arg in &mut server.args {
                *arg = resolve_env_string(arg)?;
            }
            for value in server.env.values_mut() {
                *value = resolve_env_string(value)?;
            }
            if let Some(cwd) = &mut server.cwd {
                *cwd = PathBuf::from(resolve_env_string(&cwd.to_string_lossy())?);
            }
        }
        Ok(())
    }
}

/// Expand `${VAR}` and `$VAR` references.
///
/// A reference to an unset variable is an error rather than an empty string.
pub fn resolve_env_string(s: &str) -> Result<String, MCPError> {
    let pattern = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .map_err(|e| MCPError::InvalidPattern(e.to_string()))?;

    let mut resolved = String::with_capacity(s.len());
    let mut last = 0;
    for caps in pattern.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let value = std::env::var(name.as_str())
            .map_err(|_| MCPError::EnvVarNotFound(name.as_str().to_string()))?;
        resolved.push_str(&s[last..whole.start()]);
        resolved.push_str(&value);
        last = whole.end();
    }
    resolved.push_str(&s[last..]);
    Ok(resolved)
}

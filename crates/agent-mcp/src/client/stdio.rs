//! Stdio transport MCP client
//!
//! Spawns the server as a child process and speaks newline-delimited
//! JSON-RPC 2.0 over its stdin/stdout. Requests are multiplexed: each one
//! registers a waiter under its id, a reader task routes responses back, and
//! the session lock is held only while a line is written.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{MCPClient, MCPServerInfo, MCPToolDefinition, MCPToolResult, PROTOCOL_VERSION};
use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;

/// Waiters for in-flight requests, keyed by JSON-RPC id
#[derive(Default)]
struct Pending(std::sync::Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>);

impl Pending {
    fn insert(&self, id: u64) -> oneshot::Receiver<Result<Value>> {
        let (tx, rx) = oneshot::channel();
        self.0.lock().unwrap_or_else(PoisonError::into_inner).insert(id, tx);
        rx
    }

    fn take(&self, id: u64) -> Option<oneshot::Sender<Result<Value>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).remove(&id)
    }

    /// Fail every waiter; used when the server output ends
    fn fail_all(&self, reason: &str) {
        let waiters: Vec<_> = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();
        for (_, tx) in waiters {
            let _ = tx.send(Err(MCPError::ConnectionFailed(reason.to_string())));
        }
    }
}

/// A running server process, its input pipe and the task reading its output
struct Session {
    child: Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
}

impl Session {
    async fn send(&mut self, message: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    fn kill(mut self) {
        self.reader.abort();
        let _ = self.child.start_kill();
    }
}

/// Route responses on `stdout` to their waiters until the stream ends
///
/// Notifications, server-initiated requests, responses nobody waits for and
/// non-JSON log output are skipped.
async fn read_responses(
    server: String,
    stdout: ChildStdout,
    pending: Arc<Pending>,
    connected: Arc<AtomicBool>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(server = %server, error = %e, "reading server output failed");
                break;
            }
        };

        let Ok(message) = serde_json::from_str::<Value>(line.trim()) else {
            if !line.trim().is_empty() {
                debug!(server = %server, line = line.trim(), "ignoring non-protocol output");
            }
            continue;
        };
        if message.get("method").is_some() {
            continue;
        }
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            continue;
        };
        let Some(waiter) = pending.take(id) else {
            debug!(server = %server, id, "response without a waiter");
            continue;
        };

        let outcome = match message.get("error") {
            Some(error) => Err(MCPError::RequestFailed(
                error
                    .get("message")
                    .and_then(Value::as_str)
                    .map_or_else(|| error.to_string(), str::to_string),
            )),
            None => message
                .get("result")
                .cloned()
                .ok_or_else(|| MCPError::RequestFailed("response without result".to_string())),
        };
        let _ = waiter.send(outcome);
    }

    connected.store(false, Ordering::SeqCst);
    pending.fail_all("server closed its output");
}

/// MCP client using stdio transport
pub struct StdioMCPClient {
    server_name: String,
    config: MCPServerConfig,
    request_timeout: Duration,
    session: Mutex<Option<Session>>,
    connecting: Mutex<()>,
    pending: Arc<Pending>,
    server_info: RwLock<Option<MCPServerInfo>>,
    connected: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl StdioMCPClient {
    /// Create a client for `server_name`; nothing is spawned until `connect`
    pub fn new(server_name: impl Into<String>, config: MCPServerConfig) -> Self {
        Self {
            server_name: server_name.into(),
            request_timeout: config.request_timeout(),
            config,
            session: Mutex::new(None),
            connecting: Mutex::new(()),
            pending: Arc::new(Pending::default()),
            server_info: RwLock::new(None),
            connected: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    /// Override the per-request deadline from the config
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Name of the server this client talks to
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn envelope(id: u64, method: &str, params: Value) -> Value {
        json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
    }

    fn timeout_error(&self, method: &str) -> MCPError {
        MCPError::Timeout {
            method: method.to_string(),
            after: self.request_timeout,
        }
    }

    fn spawn(&self) -> Result<Session> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| {
            MCPError::ConnectionFailed(format!("failed to spawn '{}': {e}", self.config.command))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MCPError::ConnectionFailed("child stdout unavailable".to_string()))?;

        let reader = tokio::spawn(read_responses(
            self.server_name.clone(),
            stdout,
            Arc::clone(&self.pending),
            Arc::clone(&self.connected),
        ));
        Ok(Session {
            child,
            stdin,
            reader,
        })
    }

    async fn send(&self, message: &Value) -> Result<()> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(MCPError::NotConnected)?;
        session.send(message).await
    }

    /// Kill the server and fail whatever is still waiting on it
    async fn teardown(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(session) = self.session.lock().await.take() {
            session.kill();
        }
        self.pending.fail_all("session closed");
    }

    /// Send one request and wait for its response under the deadline.
    ///
    /// Other requests proceed while this one waits. A timeout abandons only
    /// this request; a broken pipe or closed output tears the session down.
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id();
        let message = Self::envelope(id, method, params);
        let response = self.pending.insert(id);
        debug!(server = %self.server_name, method, id, "sending request");

        let exchange = async {
            self.send(&message).await?;
            response
                .await
                .map_err(|_| MCPError::ConnectionFailed("session closed".to_string()))?
        };
        let outcome = match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.timeout_error(method)),
        };
        self.pending.take(id);

        if let Err(e @ (MCPError::ConnectionFailed(_) | MCPError::IoError(_))) = &outcome {
            warn!(server = %self.server_name, method, error = %e, "dropping session");
            self.teardown().await;
        }
        outcome
    }

    async fn handshake(&self) -> Result<MCPServerInfo> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "fin-analyst", "version": env!("CARGO_PKG_VERSION")}
                }),
            )
            .await
            .map_err(|e| match e {
                MCPError::RequestFailed(msg) => MCPError::InitializationFailed(msg),
                other => other,
            })?;
        self.send(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await?;
        Ok(MCPServerInfo::from_initialize(&result))
    }
}

#[async_trait]
impl MCPClient for StdioMCPClient {
    async fn connect(&self) -> Result<()> {
        let _connecting = self.connecting.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        debug!(server = %self.server_name, command = %self.config.command, args = ?self.config.args, "starting MCP server");
        let session = self.spawn()?;
        if let Some(stale) = self.session.lock().await.replace(session) {
            stale.kill();
        }

        let info = match self.handshake().await {
            Ok(info) => info,
            Err(e) => {
                self.teardown().await;
                return Err(e);
            }
        };
        info!(
            server = %self.server_name,
            name = %info.name,
            version = %info.version,
            "connected to MCP server"
        );

        *self.server_info.write().await = Some(info);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut session) = self.session.lock().await.take() {
            debug!(server = %self.server_name, "stopping MCP server");
            session.reader.abort();
            drop(session.stdin);
            if let Err(e) = session.child.kill().await {
                debug!(server = %self.server_name, error = %e, "kill failed");
            }
        }
        self.pending.fail_all("client disconnected");
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<MCPToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => json!({"cursor": c}),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: Vec<MCPToolDefinition> =
                serde_json::from_value(result["tools"].clone()).map_err(|e| {
                    MCPError::RequestFailed(format!("malformed tools/list result: {e}"))
                })?;
            tools.extend(page);

            match result.get("nextCursor").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => cursor = Some(next.to_string()),
                _ => return Ok(tools),
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<MCPToolResult> {
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| MCPError::ToolCallFailed(format!("malformed result from '{name}': {e}")))
    }

    async fn server_info(&self) -> Option<MCPServerInfo> {
        self.server_info.read().await.clone()
    }
}

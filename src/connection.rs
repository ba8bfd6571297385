//! Tool connection: owns the tool host subprocess.
//!
//! `ToolConnection::open` spawns the host, performs the `list_tools`
//! handshake, and keeps the discovered schema catalog for the life of
//! the connection. Requests are sent one at a time (the bridge
//! dispatches tool calls sequentially), each awaited under a timeout.
//!
//! Lifecycle: `close()` terminates the subprocess explicitly;
//! `kill_on_drop` covers every other exit path, including cancellation
//! of an in-flight `process_message` and panics, so the child never
//! outlives the connection handle.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::ToolHostConfig;
use crate::error::ToolError;
use crate::protocol::{HostOp, HostReply, HostRequest, HostResponse};
use crate::types::{ToolCall, ToolDefinition, ToolResult};

/// The seam the bridge depends on for tool dispatch.
///
/// `invoke` returns `Err` only for [`ToolError::UnknownTool`]; per-call
/// transport problems come back as failure-flagged results so the turn
/// loop always receives one result per request.
#[async_trait]
pub trait ToolExecutor: Send {
    fn schemas(&self) -> &[ToolDefinition];

    async fn invoke(&mut self, call: &ToolCall) -> Result<ToolResult, ToolError>;

    /// Release any owned resources. Default is a no-op.
    async fn shutdown(self: Box<Self>) {}
}

#[derive(Debug)]
pub struct ToolConnection {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    schemas: Vec<ToolDefinition>,
    next_id: u64,
    timeout: Duration,
}

impl ToolConnection {
    /// Spawn the tool host and discover its tool catalog.
    pub async fn open(config: &ToolHostConfig) -> Result<Self, ToolError> {
        let command = match &config.command {
            Some(command) => command.clone(),
            None => std::env::current_exe()
                .map_err(|e| ToolError::Transport(format!("cannot locate own executable: {}", e)))?
                .display()
                .to_string(),
        };

        let mut child = Command::new(&command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::Transport(format!("failed to spawn tool host '{}': {}", command, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Transport("tool host stdin not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Transport("tool host stdout not piped".to_string()))?;

        let mut connection = Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            schemas: Vec::new(),
            next_id: 1,
            timeout: Duration::from_secs(config.timeout_secs),
        };

        match connection.round_trip(HostOp::ListTools).await? {
            HostReply::Tools { tools } => {
                info!(command = %command, tools = tools.len(), "tool host ready");
                connection.schemas = tools;
            }
            HostReply::Result { .. } => {
                return Err(ToolError::Transport(
                    "unexpected reply to list_tools".to_string(),
                ));
            }
        }

        Ok(connection)
    }

    /// Send one request and wait for the correlated response.
    /// Uncorrelated frames are discarded with a warning.
    async fn round_trip(&mut self, op: HostOp) -> Result<HostReply, ToolError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut frame = serde_json::to_string(&HostRequest { id, op })
            .map_err(|e| ToolError::Transport(format!("cannot encode request: {}", e)))?;
        frame.push('\n');

        self.stdin
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| ToolError::Transport(format!("write to tool host failed: {}", e)))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| ToolError::Transport(format!("flush to tool host failed: {}", e)))?;

        let lines = &mut self.lines;
        let receive = async {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match serde_json::from_str::<HostResponse>(&line) {
                        Ok(response) if response.id == id => return Ok(response.reply),
                        Ok(response) => {
                            warn!(got = response.id, want = id, "discarding uncorrelated frame");
                        }
                        Err(e) => {
                            return Err(ToolError::Transport(format!("malformed frame: {}", e)));
                        }
                    },
                    Ok(None) => {
                        return Err(ToolError::Transport(
                            "tool host closed its stdout".to_string(),
                        ));
                    }
                    Err(e) => {
                        return Err(ToolError::Transport(format!(
                            "read from tool host failed: {}",
                            e
                        )));
                    }
                }
            }
        };

        tokio::time::timeout(self.timeout, receive)
            .await
            .map_err(|_| ToolError::Timeout(self.timeout.as_secs()))?
    }

    /// Terminate the subprocess and release its streams.
    pub async fn close(mut self) {
        debug!("closing tool connection");
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}

#[async_trait]
impl ToolExecutor for ToolConnection {
    fn schemas(&self) -> &[ToolDefinition] {
        &self.schemas
    }

    async fn invoke(&mut self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        if !self.schemas.iter().any(|t| t.name == call.name) {
            return Err(ToolError::UnknownTool(call.name.clone()));
        }

        // The model occasionally emits arguments that are not valid JSON;
        // feed that back as a failed result it can correct.
        let arguments: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                return Ok(ToolResult::failure(
                    call,
                    format!("invalid tool arguments: {}", e),
                ));
            }
        };

        let op = HostOp::CallTool {
            name: call.name.clone(),
            arguments,
        };

        match self.round_trip(op).await {
            Ok(HostReply::Result { content, is_error }) => Ok(ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content,
                is_error,
            }),
            Ok(HostReply::Tools { .. }) => Ok(ToolResult::failure(
                call,
                "tool host sent an unexpected reply kind",
            )),
            Err(e) => {
                // Keep the turn structure valid: the model must receive one
                // result per request even when the pipe is gone.
                warn!(tool = %call.name, error = %e, "tool round trip failed");
                Ok(ToolResult::failure(call, e.to_string()))
            }
        }
    }

    async fn shutdown(self: Box<Self>) {
        (*self).close().await;
    }
}

//! Tool protocol wire types.
//!
//! The bridge and the tool host exchange newline-delimited JSON frames
//! over the subprocess's standard streams: one request line in, one
//! correlated response line out. Correlation is by the caller-assigned
//! numeric `id`.

use serde::{Deserialize, Serialize};

use crate::types::ToolDefinition;

/// A request frame sent by the bridge to the tool host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    pub id: u64,
    #[serde(flatten)]
    pub op: HostOp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    /// Discover the tool catalog.
    ListTools,
    /// Invoke a named tool with JSON arguments.
    CallTool {
        name: String,
        arguments: serde_json::Value,
    },
}

/// A response frame sent by the tool host to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostResponse {
    pub id: u64,
    #[serde(flatten)]
    pub reply: HostReply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostReply {
    Tools { tools: Vec<ToolDefinition> },
    /// Outcome of a tool call. Tool failures travel as `is_error`
    /// results, never as dropped frames.
    Result { content: String, is_error: bool },
}

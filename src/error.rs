//! Error taxonomy.
//!
//! Tool-level failures are converted to data (a failure-flagged
//! [`crate::types::ToolResult`] or a diagnostic string) and fed back into
//! the conversation so the model can react to them. Only model-endpoint
//! failures and connection-level transport failures surface to the caller
//! of `process_message`; neither is retried internally.

use thiserror::Error;

/// Terminal failures of the conversation bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The completion endpoint was unreachable or returned an
    /// unparseable payload.
    #[error("model endpoint unavailable: {0}")]
    ModelUnavailable(String),

    /// The tool connection broke at a level the turn loop cannot paper
    /// over (failed spawn, lost handshake).
    #[error("tool transport failure: {0}")]
    Transport(String),

    /// The model kept requesting tools without converging to a text
    /// reply within the configured turn cap.
    #[error("conversation did not converge after {0} model turns")]
    DidNotConverge(u32),
}

/// Failures of the tool connection.
///
/// `invoke` itself only ever returns `UnknownTool`: per-call transport
/// problems are translated into failure-flagged results so the turn
/// loop always receives one result per request. `Transport` and
/// `Timeout` are surfaced by `open` and the internal round trip.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model requested a tool not present in the discovered catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Broken pipe, subprocess exit, or a malformed frame.
    #[error("tool transport failure: {0}")]
    Transport(String),

    /// No correlated response arrived within the configured window.
    #[error("no tool response within {0}s")]
    Timeout(u64),
}

impl From<ToolError> for BridgeError {
    fn from(err: ToolError) -> Self {
        BridgeError::Transport(err.to_string())
    }
}

/// Failures of an outbound tool-provider HTTP call.
///
/// Typed so callers can distinguish "no landmarks found" from "network
/// unreachable" from "malformed upstream response" programmatically;
/// the tool adapters still flatten these into formatted text for the
/// model.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// The provider answered but reported a failure in its status/info
    /// fields.
    #[error("provider reported failure: {0}")]
    Api(String),
}

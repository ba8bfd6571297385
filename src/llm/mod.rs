//! Model client module.
//!
//! Defines the `LlmProvider` trait that abstracts over completion
//! endpoints, plus the OpenAI-compatible implementation the bridge
//! uses by default. Each provider owns its own request/response wire
//! format; the rest of the code only sees [`ChatRequest`] and
//! [`ChatResponse`].

pub mod openai_compatible;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::{ChatRequest, ChatResponse};

/// Trait that all model clients must implement.
///
/// `complete` sends the full ordered conversation plus the tool schema
/// catalog and returns either assistant text or tool call requests.
/// Any HTTP or malformed-payload failure is reported as
/// [`BridgeError::ModelUnavailable`]; the bridge does not retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BridgeError>;

    /// The provider's display name (for logging).
    fn name(&self) -> &str;
}

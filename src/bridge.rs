//! Conversation bridge - the core of the assistant.
//!
//! The bridge drives the turn-taking loop between the user, the model
//! endpoint, and the tool host subprocess:
//!
//! ```text
//! User Input
//!     |
//!     v
//! +--------+     +--------+     +-----------+
//! | Model  |<--->| Bridge |<--->| Tool Host |
//! +--------+     +--------+     +-----------+
//!     |               |
//!     v               v
//! Text Reply    Tool Results
//! ```
//!
//! The loop continues until the model returns a plain-text response (no
//! more tool calls) or the turn cap is hit, which is a
//! [`BridgeError::DidNotConverge`] failure rather than a silent cutoff.

use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::connection::ToolExecutor;
use crate::error::{BridgeError, ToolError};
use crate::llm::LlmProvider;
use crate::types::{ChatRequest, Message, ToolResult};

/// Owns the model client, the tool connection, and the conversation.
///
/// Only one `process_message` call may be in flight per bridge; the
/// `&mut self` receiver enforces that for a single owner, and callers
/// sharing a bridge across tasks must serialize access externally.
pub struct Bridge {
    llm: Box<dyn LlmProvider>,
    tools: Box<dyn ToolExecutor>,
    /// Conversation history, seeded with the system prompt
    messages: Vec<Message>,
    model: String,
    max_tokens: u32,
    max_turns: u32,
}

impl Bridge {
    pub fn new(llm: Box<dyn LlmProvider>, tools: Box<dyn ToolExecutor>, config: &AppConfig) -> Self {
        let messages = vec![Message::system(&config.agent.system_prompt)];
        Self {
            llm,
            tools,
            messages,
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            max_turns: config.agent.max_turns,
        }
    }

    /// Process a user message through the turn loop.
    ///
    /// 1. Append the user message to history
    /// 2. Call the model with the conversation and the tool catalog
    /// 3. Tool calls in the reply -> dispatch them in order, append one
    ///    result message per call, go to 2
    /// 4. Plain text reply -> append it and return it
    pub async fn process_message(&mut self, user_input: &str) -> Result<String, BridgeError> {
        self.messages.push(Message::user(user_input));

        for turn in 0..self.max_turns {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: self.messages.clone(),
                tools: self.tools.schemas().to_vec(),
                max_tokens: self.max_tokens,
            };

            debug!(turn, provider = self.llm.name(), "requesting completion");
            let response = self.llm.complete(&request).await?;

            if !response.has_tool_calls() {
                self.messages.push(Message::assistant(&response.content));
                return Ok(response.content);
            }

            // Keep the call list in history so the model sees its own
            // requests alongside the results on the next turn.
            self.messages.push(Message::assistant_with_tool_calls(
                &response.content,
                response.tool_calls.clone(),
            ));

            // Dispatch sequentially, in the order the model emitted the
            // calls; each request gets exactly one correlated result.
            for call in &response.tool_calls {
                debug!(tool = %call.name, id = %call.id, "dispatching tool call");
                let result = match self.tools.invoke(call).await {
                    Ok(result) => result,
                    Err(ToolError::UnknownTool(name)) => {
                        warn!(tool = %name, "model requested an unknown tool");
                        ToolResult::failure(call, format!("Unknown tool: {}", name))
                    }
                    Err(e) => return Err(e.into()),
                };
                if result.is_error {
                    warn!(tool = %result.name, "tool call failed: {}", result.content);
                }
                self.messages.push(Message::tool_result(&result));
            }
        }

        Err(BridgeError::DidNotConverge(self.max_turns))
    }

    /// The conversation history.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Clear the conversation history (keeps the system prompt).
    pub fn clear_history(&mut self) {
        self.messages.truncate(1);
    }

    /// Tear down the tool connection. `kill_on_drop` on the subprocess
    /// covers abnormal exits; this is the orderly path.
    pub async fn shutdown(self) {
        self.tools.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatResponse, Role, ToolCall, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Model client that replays a fixed sequence of responses.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<ChatResponse>>,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<ChatResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, BridgeError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| BridgeError::ModelUnavailable("script exhausted".to_string()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Tool executor that records invocations and answers with canned text.
    struct RecordingExecutor {
        schemas: Vec<ToolDefinition>,
        invoked: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingExecutor {
        fn new(names: &[&str]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let invoked = Arc::new(Mutex::new(Vec::new()));
            let schemas = names
                .iter()
                .map(|name| ToolDefinition {
                    name: name.to_string(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                })
                .collect();
            (
                Self {
                    schemas,
                    invoked: invoked.clone(),
                },
                invoked,
            )
        }
    }

    #[async_trait]
    impl ToolExecutor for RecordingExecutor {
        fn schemas(&self) -> &[ToolDefinition] {
            &self.schemas
        }

        async fn invoke(&mut self, call: &ToolCall) -> Result<ToolResult, ToolError> {
            if !self.schemas.iter().any(|t| t.name == call.name) {
                return Err(ToolError::UnknownTool(call.name.clone()));
            }
            self.invoked.lock().unwrap().push(call.name.clone());
            Ok(ToolResult::success(call, format!("{} ok", call.name)))
        }
    }

    fn tool_call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: r#"{"city":"Beijing"}"#.to_string(),
        }
    }

    fn text(content: &str) -> ChatResponse {
        ChatResponse {
            content: content.to_string(),
            tool_calls: vec![],
        }
    }

    fn calls(calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            content: String::new(),
            tool_calls: calls,
        }
    }

    fn bridge(provider: ScriptedProvider, executor: RecordingExecutor) -> Bridge {
        let mut config = AppConfig::default();
        config.agent.max_turns = 3;
        Bridge::new(Box::new(provider), Box::new(executor), &config)
    }

    #[tokio::test]
    async fn test_two_tool_calls_then_text() {
        let provider = ScriptedProvider::new(vec![
            calls(vec![
                tool_call("call_1", "weather_search"),
                tool_call("call_2", "generate_static_map"),
            ]),
            text("Here is your Beijing itinerary."),
        ]);
        let (executor, invoked) =
            RecordingExecutor::new(&["weather_search", "generate_static_map"]);

        let mut bridge = bridge(provider, executor);
        let reply = bridge.process_message("trip to Beijing").await.unwrap();

        assert_eq!(reply, "Here is your Beijing itinerary.");
        assert_eq!(
            *invoked.lock().unwrap(),
            vec!["weather_search", "generate_static_map"]
        );

        // One result message per request, correlated by id, in order.
        let results: Vec<&Message> = bridge
            .history()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(results[1].tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn test_turn_cap_fails_with_did_not_converge() {
        // Three turns allowed; the model asks for a tool every time.
        let provider = ScriptedProvider::new(vec![
            calls(vec![tool_call("c1", "weather_search")]),
            calls(vec![tool_call("c2", "weather_search")]),
            calls(vec![tool_call("c3", "weather_search")]),
            calls(vec![tool_call("c4", "weather_search")]),
        ]);
        let (executor, invoked) = RecordingExecutor::new(&["weather_search"]);

        let mut bridge = bridge(provider, executor);
        let err = bridge.process_message("trip to Beijing").await.unwrap_err();

        assert!(matches!(err, BridgeError::DidNotConverge(3)));
        assert_eq!(invoked.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_failed_result() {
        let provider = ScriptedProvider::new(vec![
            calls(vec![tool_call("c1", "no_such_tool")]),
            text("done"),
        ]);
        let (executor, invoked) = RecordingExecutor::new(&["weather_search"]);

        let mut bridge = bridge(provider, executor);
        let reply = bridge.process_message("hi").await.unwrap();

        assert_eq!(reply, "done");
        assert!(invoked.lock().unwrap().is_empty());
        let result = bridge
            .history()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(result.content.contains("Unknown tool"));
        assert_eq!(result.tool_call_id.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_model_unavailable_propagates() {
        let provider = ScriptedProvider::new(vec![]);
        let (executor, _) = RecordingExecutor::new(&["weather_search"]);

        let mut bridge = bridge(provider, executor);
        let err = bridge.process_message("hi").await.unwrap_err();
        assert!(matches!(err, BridgeError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch() {
        // The model call never settles within the caller's deadline;
        // abandoning the future must leave zero tool invocations behind.
        let mut provider = ScriptedProvider::new(vec![calls(vec![tool_call(
            "c1",
            "weather_search",
        )])]);
        provider.delay = Some(Duration::from_secs(30));
        let (executor, invoked) = RecordingExecutor::new(&["weather_search"]);

        let mut bridge = bridge(provider, executor);
        let outcome =
            tokio::time::timeout(Duration::from_millis(20), bridge.process_message("hi")).await;

        assert!(outcome.is_err());
        assert!(invoked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_system_prompt() {
        let provider = ScriptedProvider::new(vec![text("hello")]);
        let (executor, _) = RecordingExecutor::new(&[]);

        let mut bridge = bridge(provider, executor);
        bridge.process_message("hi").await.unwrap();
        assert!(bridge.history().len() > 1);

        bridge.clear_history();
        assert_eq!(bridge.history().len(), 1);
        assert_eq!(bridge.history()[0].role, Role::System);
    }
}

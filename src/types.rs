//! Core data types used throughout tripmate.
//!
//! This module defines the message types, tool call structures,
//! and the landmark/location types that flow between all components.

use serde::{Deserialize, Serialize};

// --- Message Roles ---

/// The role of a message in the conversation.
///
/// - `System`: instructions to the model (invisible to the user)
/// - `User`: the human's input
/// - `Assistant`: the model's response
/// - `Tool`: the result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

// --- Tool Call ---

/// A tool call request issued by the model.
///
/// The `id` is assigned by the model and is unique within one assistant
/// turn; the correlated [`ToolResult`] carries the same id back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Name of the tool to invoke (e.g. "weather_search")
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

// --- Tool Result ---

/// The outcome of executing a [`ToolCall`].
///
/// Exactly one result is produced per request, including on failure:
/// a failed call yields a result with `is_error` set and a diagnostic
/// in `content`, never a dropped message. The turn structure the model
/// endpoint expects requires one result per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The id of the originating tool call
    pub call_id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn failure(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: content.into(),
            is_error: true,
        }
    }
}

// --- Tool Definition ---

/// Describes a tool's interface to the model via JSON Schema.
///
/// The catalog of definitions is fetched once from the tool host when
/// the connection opens and is treated as immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters
    pub input_schema: serde_json::Value,
}

// --- Messages ---

/// A single message in the conversation history.
///
/// The conversation is a `Vec<Message>`, append-only while a
/// `process_message` call is in flight, and sent to the model verbatim
/// in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// If the assistant wants to call tools, this will be non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For tool result messages, links back to the tool call id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
        }
    }

    /// Assistant message that carries tool call requests. The call list
    /// is preserved so the model sees its own requests on later turns.
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(result: &ToolResult) -> Self {
        Self {
            role: Role::Tool,
            content: result.content.clone(),
            tool_calls: vec![],
            tool_call_id: Some(result.call_id.clone()),
        }
    }
}

// --- Chat Request / Response ---

/// A request to send to the model endpoint.
///
/// This is the internal representation; the model client converts it
/// into the provider-specific API format.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Available tools for the model to call
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

/// The response from a model call: either a text reply, tool calls, or both.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The text content (may be empty if the reply is only tool calls)
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// --- Landmarks ---

/// A longitude/latitude pair. Serialized as the `"lon,lat"` string the
/// mapping collaborator uses on the wire and in the cache file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    pub fn parse(s: &str) -> Option<Self> {
        let (lon, lat) = s.split_once(',')?;
        Some(Self {
            lon: lon.trim().parse().ok()?,
            lat: lat.trim().parse().ok()?,
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

impl Serialize for Location {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Location::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid location '{}'", s)))
    }
}

/// A named point of interest returned by the landmark search tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub location: Location,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse_and_display() {
        let loc = Location::parse("116.397128,39.916527").unwrap();
        assert_eq!(loc.lon, 116.397128);
        assert_eq!(loc.lat, 39.916527);
        assert_eq!(loc.to_string(), "116.397128,39.916527");

        assert!(Location::parse("not-a-location").is_none());
        assert!(Location::parse("116.0").is_none());
    }

    #[test]
    fn test_landmark_serde_uses_location_string() {
        let lm = Landmark {
            name: "Palace Museum".to_string(),
            address: "4 Jingshan Front St".to_string(),
            location: Location { lon: 116.397128, lat: 39.916527 },
        };
        let json = serde_json::to_value(&lm).unwrap();
        assert_eq!(json["location"], "116.397128,39.916527");

        let back: Landmark = serde_json::from_value(json).unwrap();
        assert_eq!(back.location, lm.location);
    }

    #[test]
    fn test_tool_result_correlates_call() {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "weather_search".to_string(),
            arguments: "{}".to_string(),
        };
        let result = ToolResult::failure(&call, "upstream unreachable");
        assert_eq!(result.call_id, "call_1");
        assert!(result.is_error);

        let msg = Message::tool_result(&result);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }
}

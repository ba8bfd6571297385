//! OpenAI-compatible model client implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LlmProvider;
use crate::error::BridgeError;
use crate::types::{ChatRequest, ChatResponse, Role, ToolCall};

pub struct OpenAiCompatibleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

// --- API Request Types (OpenAI format) ---

#[derive(Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ApiTool {
    r#type: String,
    function: ApiFunction,
}

#[derive(Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    r#type: String,
    function: ApiToolCallFunction,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ApiToolCallFunction {
    name: String,
    arguments: String,
}

// --- API Response Types ---

#[derive(Deserialize, Debug)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize, Debug)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ApiResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

// --- Implementation ---

impl OpenAiCompatibleProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn build_api_request(&self, request: &ChatRequest) -> ApiRequest {
        let mut api_messages: Vec<ApiMessage> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => {
                    api_messages.push(ApiMessage {
                        role: "system".to_string(),
                        content: Some(msg.content.clone()),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
                Role::User => {
                    api_messages.push(ApiMessage {
                        role: "user".to_string(),
                        content: Some(msg.content.clone()),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
                Role::Assistant => {
                    let tool_calls = if msg.tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            msg.tool_calls
                                .iter()
                                .map(|tc| ApiToolCall {
                                    id: tc.id.clone(),
                                    r#type: "function".to_string(),
                                    function: ApiToolCallFunction {
                                        name: tc.name.clone(),
                                        arguments: tc.arguments.clone(),
                                    },
                                })
                                .collect(),
                        )
                    };
                    api_messages.push(ApiMessage {
                        role: "assistant".to_string(),
                        content: if msg.content.is_empty() {
                            None
                        } else {
                            Some(msg.content.clone())
                        },
                        tool_calls,
                        tool_call_id: None,
                    });
                }
                Role::Tool => {
                    api_messages.push(ApiMessage {
                        role: "tool".to_string(),
                        content: Some(msg.content.clone()),
                        tool_calls: None,
                        tool_call_id: msg.tool_call_id.clone(),
                    });
                }
            }
        }

        let tools: Vec<ApiTool> = request
            .tools
            .iter()
            .map(|t| ApiTool {
                r#type: "function".to_string(),
                function: ApiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect();

        ApiRequest {
            model: request.model.clone(),
            messages: api_messages,
            max_tokens: request.max_tokens,
            tools,
        }
    }

    fn parse_response(&self, api_response: ApiResponse) -> Result<ChatResponse, BridgeError> {
        let choice = api_response.choices.into_iter().next().ok_or_else(|| {
            BridgeError::ModelUnavailable("empty response: no choices returned".to_string())
        })?;

        let content = choice.message.content.unwrap_or_default();
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                // Some endpoints omit ids; results still need correlation.
                id: if tc.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    tc.id
                },
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ChatResponse { content, tool_calls })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, BridgeError> {
        let api_request = self.build_api_request(request);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(url = %url, messages = api_request.messages.len(), "calling model endpoint");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| {
                BridgeError::ModelUnavailable(format!("request to {} failed: {}", url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BridgeError::ModelUnavailable(format!(
                "endpoint returned {}: {}",
                status, error_body
            )));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            BridgeError::ModelUnavailable(format!("unparseable response payload: {}", e))
        })?;

        self.parse_response(api_response)
    }

    fn name(&self) -> &str {
        "OpenAI-Compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use serde_json::json;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![Message::system("sys"), Message::user("trip to Beijing")],
            tools: vec![],
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{
                        "message": {
                            "content": null,
                            "tool_calls": [{
                                "id": "call_w1",
                                "type": "function",
                                "function": {
                                    "name": "weather_search",
                                    "arguments": "{\"city\":\"Beijing\"}"
                                }
                            }]
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = OpenAiCompatibleProvider::new("test-key".to_string(), server.url());
        let response = provider.complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls[0].id, "call_w1");
        assert_eq!(response.tool_calls[0].name, "weather_search");
    }

    #[tokio::test]
    async fn test_complete_maps_http_error_to_model_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let provider = OpenAiCompatibleProvider::new("test-key".to_string(), server.url());
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, BridgeError::ModelUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_complete_maps_garbage_payload_to_model_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let provider = OpenAiCompatibleProvider::new("test-key".to_string(), server.url());
        let err = provider.complete(&request()).await.unwrap_err();
        assert!(matches!(err, BridgeError::ModelUnavailable(_)));
    }

    #[test]
    fn test_missing_tool_call_id_gets_generated() {
        let provider =
            OpenAiCompatibleProvider::new("k".to_string(), "http://localhost".to_string());
        let api_response: ApiResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "type": "function",
                        "function": {"name": "weather_search", "arguments": "{}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let response = provider.parse_response(api_response).unwrap();
        assert!(!response.tool_calls[0].id.is_empty());
    }
}

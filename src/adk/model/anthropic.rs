//! Anthropic Model - Messages API implementation

use super::provider::ProviderConfig;
use super::{extract_system_message, preview, GenerationConfig, Model};
use crate::adk::error::{ModelConfigurationError, ModelInvocationError};
use crate::adk::message::{Message, ToolCallRequest};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const PROVIDER: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude model implementation
pub struct AnthropicModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
    config: GenerationConfig,
}

impl AnthropicModel {
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: GenerationConfig::default(),
        }
    }

    /// Create from a provider mapping.
    ///
    /// Requires `api_key`; honours `base_url`, `temperature`, `max_tokens`,
    /// `top_p` and `top_k`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ModelConfigurationError> {
        let model_name = config.require_str(PROVIDER, "model_id")?;
        let api_key = config.require_str(PROVIDER, "api_key")?;

        let mut model = Self::new(model_name, api_key).with_generation_config(config.generation_config());
        if let Some(base_url) = config.get_str("base_url") {
            model = model.with_base_url(base_url);
        }
        Ok(model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Convert history to Anthropic messages (system handled separately).
    ///
    /// Consecutive tool results are grouped into a single user turn.
    fn history_to_anthropic_messages(history: &[Message]) -> Vec<Value> {
        let mut messages: Vec<Value> = Vec::new();
        let mut pending_results: Vec<Value> = Vec::new();

        for message in history {
            if let Message::ToolResult {
                tool_call_id,
                content,
                ..
            } = message
            {
                pending_results.push(json!({
                    "type": "tool_result",
                    "tool_use_id": tool_call_id,
                    "content": content
                }));
                continue;
            }

            if !pending_results.is_empty() {
                messages.push(json!({
                    "role": "user",
                    "content": std::mem::take(&mut pending_results)
                }));
            }

            match message {
                Message::System { .. } | Message::ToolResult { .. } => {}
                Message::User { content } => {
                    messages.push(json!({
                        "role": "user",
                        "content": [{"type": "text", "text": content}]
                    }));
                }
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                    if !content.is_empty() {
                        blocks.push(json!({"type": "text", "text": content}));
                    }
                    for call in tool_calls {
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.tool_name,
                            "input": call.arguments
                        }));
                    }
                    if !blocks.is_empty() {
                        messages.push(json!({"role": "assistant", "content": blocks}));
                    }
                }
            }
        }

        if !pending_results.is_empty() {
            messages.push(json!({"role": "user", "content": pending_results}));
        }
        messages
    }

    /// Convert tools to Anthropic tool format
    fn tools_to_anthropic_format(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.schema()
                })
            })
            .collect()
    }

    /// Parse Anthropic response into an assistant message
    fn parse_anthropic_response(response: &Value) -> Result<Message, ModelInvocationError> {
        let content_blocks = response["content"].as_array().ok_or_else(|| {
            ModelInvocationError::invalid_response(PROVIDER, "no content in response")
        })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in content_blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(t) = block["text"].as_str() {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().ok_or_else(|| {
                        ModelInvocationError::invalid_response(PROVIDER, "tool_use block without id")
                    })?;
                    let name = block["name"].as_str().ok_or_else(|| {
                        ModelInvocationError::invalid_response(PROVIDER, "tool_use block without name")
                    })?;
                    tool_calls.push(ToolCallRequest::new(id, name, block["input"].clone()));
                }
                _ => {}
            }
        }

        if let Some(stop_reason) = response["stop_reason"].as_str() {
            log::debug!("Anthropic stop reason: {}", stop_reason);
        }

        Ok(Message::assistant_with_calls(text, tool_calls))
    }

    fn request_body(&self, history: &[Message], tools: Option<&[Arc<dyn Tool>]>) -> Value {
        let mut body = json!({
            "model": self.model_name,
            "messages": Self::history_to_anthropic_messages(history),
            "max_tokens": self.config.max_output_tokens.unwrap_or(4096)
        });

        if let Some(sys) = extract_system_message(history) {
            body["system"] = json!(sys);
        }
        if let Some(temp) = self.config.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(top_p) = self.config.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(top_k) = self.config.top_k {
            body["top_k"] = json!(top_k);
        }
        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = json!(Self::tools_to_anthropic_format(tools));
        }
        body
    }
}

#[async_trait]
impl Model for AnthropicModel {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate_content(
        &self,
        history: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, ModelInvocationError> {
        let url = format!("{}/messages", self.base_url);
        let body = self.request_body(history, tools);

        log::debug!(
            "Anthropic request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelInvocationError::transport(PROVIDER, e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ModelInvocationError::api(PROVIDER, status.as_u16(), text));
        }

        let resp_json: Value = resp
            .json()
            .await
            .map_err(|e| ModelInvocationError::invalid_response(PROVIDER, e.to_string()))?;
        log::info!(
            "Anthropic response: {}",
            preview(&resp_json.to_string(), 200)
        );

        Self::parse_anthropic_response(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_user_and_assistant_messages() {
        let history = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("I can help"),
        ];

        let msgs = AnthropicModel::history_to_anthropic_messages(&history);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "user");
        assert_eq!(msgs[0]["content"][0]["type"], "text");
        assert_eq!(msgs[0]["content"][0]["text"], "Hello");
        assert_eq!(msgs[1]["role"], "assistant");
        assert_eq!(msgs[1]["content"][0]["text"], "I can help");
    }

    #[test]
    fn test_tool_use_and_grouped_results() {
        let history = vec![
            Message::user("check git"),
            Message::assistant_with_calls(
                "",
                vec![
                    ToolCallRequest::new("toolu_1", "command_help", json!({"command": "git"})),
                    ToolCallRequest::new("toolu_2", "command_help", json!({"command": "gh"})),
                ],
            ),
            Message::tool_result("toolu_1", "command_help", "usage: git"),
            Message::tool_result("toolu_2", "command_help", "usage: gh"),
        ];

        let msgs = AnthropicModel::history_to_anthropic_messages(&history);
        assert_eq!(msgs.len(), 3);

        let assistant = &msgs[1]["content"];
        assert_eq!(assistant.as_array().unwrap().len(), 2);
        assert_eq!(assistant[0]["type"], "tool_use");
        assert_eq!(assistant[0]["id"], "toolu_1");
        assert_eq!(assistant[0]["input"]["command"], "git");

        let results = &msgs[2];
        assert_eq!(results["role"], "user");
        assert_eq!(results["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(results["content"][1]["tool_use_id"], "toolu_2");
        assert_eq!(results["content"][1]["content"], "usage: gh");
    }

    #[test]
    fn test_parse_text_response() {
        let response = json!({
            "content": [{"type": "text", "text": "git status"}],
            "stop_reason": "end_turn"
        });

        let msg = AnthropicModel::parse_anthropic_response(&response).unwrap();
        assert_eq!(msg, Message::assistant("git status"));
    }

    #[test]
    fn test_parse_tool_use_response() {
        let response = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {
                    "type": "tool_use",
                    "id": "toolu_123",
                    "name": "command_help",
                    "input": {"command": "git"}
                }
            ],
            "stop_reason": "tool_use"
        });

        let msg = AnthropicModel::parse_anthropic_response(&response).unwrap();
        assert_eq!(msg.content(), "Let me check.");
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_123");
        assert_eq!(calls[0].tool_name, "command_help");
        assert_eq!(calls[0].arguments["command"], "git");
    }

    #[test]
    fn test_parse_response_without_content_is_invalid() {
        let err = AnthropicModel::parse_anthropic_response(&json!({"error": "x"})).unwrap_err();
        assert!(matches!(err, ModelInvocationError::InvalidResponse { .. }));
    }

    #[test]
    fn test_request_body_includes_system_and_config() {
        let model = AnthropicModel::new("claude-test", "key").with_generation_config(GenerationConfig {
            temperature: Some(0.0),
            max_output_tokens: Some(512),
            ..Default::default()
        });
        let body = model.request_body(&[Message::system("sys"), Message::user("hi")], None);
        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["temperature"], 0.0);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let config = ProviderConfig::new()
            .with("provider", "anthropic")
            .with("model_id", "claude");
        assert!(AnthropicModel::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_generate_content_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "ls -la"}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let model = AnthropicModel::new("claude-test", "sk-test").with_base_url(server.uri());
        let msg = model
            .generate_content(&[Message::user("list files")], None)
            .await
            .unwrap();
        assert_eq!(msg.content(), "ls -la");
    }

    #[tokio::test]
    async fn test_generate_content_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let model = AnthropicModel::new("claude-test", "bad").with_base_url(server.uri());
        let err = model
            .generate_content(&[Message::user("hi")], None)
            .await
            .unwrap_err();
        match err {
            ModelInvocationError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }
}

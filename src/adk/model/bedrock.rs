// SPDX-License-Identifier: MIT

//! Bedrock Model - AWS Bedrock Converse API implementation

use super::provider::ProviderConfig;
use super::sigv4::{self, Credentials, SigningRequest};
use super::{extract_system_message, preview, GenerationConfig, Model};
use crate::adk::error::{ModelConfigurationError, ModelInvocationError};
use crate::adk::message::{Message, ToolCallRequest};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

const PROVIDER: &str = "aws_bedrock";
const SERVICE: &str = "bedrock";
const DEFAULT_REGION: &str = "us-east-1";
const CONTENT_TYPE: &str = "application/json";

/// AWS Bedrock model implementation using the Converse API
pub struct BedrockModel {
    client: Client,
    credentials: Credentials,
    model_id: String,
    region: String,
    endpoint: String,
    /// Extra system text sent ahead of the conversation's own instructions
    system: Option<String>,
    config: GenerationConfig,
}

impl BedrockModel {
    /// Create from a provider mapping.
    ///
    /// Requires `aws_access_key_id` and `aws_secret_access_key`; honours
    /// `aws_session_token`, `region_name` (default `us-east-1`),
    /// `endpoint_url`, `system`, `temperature`, `max_tokens` and `top_p`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ModelConfigurationError> {
        let model_id = config.require_str(PROVIDER, "model_id")?;
        let access_key_id = config.require_str(PROVIDER, "aws_access_key_id")?;
        let secret_access_key = config.require_str(PROVIDER, "aws_secret_access_key")?;
        let region = config.get_str("region_name").unwrap_or(DEFAULT_REGION);

        let endpoint = config
            .get_str("endpoint_url")
            .map(|e| e.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", region));

        Ok(Self {
            client: Client::new(),
            credentials: Credentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: config.get_str("aws_session_token").map(str::to_string),
            },
            model_id: model_id.to_string(),
            region: region.to_string(),
            endpoint,
            system: config.get_str("system").map(str::to_string),
            config: config.generation_config(),
        })
    }

    /// Path of the Converse endpoint; the model id is percent-encoded
    fn converse_path(&self) -> String {
        format!("/model/{}/converse", urlencoding::encode(&self.model_id))
    }

    /// Convert history to Converse messages (system handled separately).
    ///
    /// Consecutive tool results are grouped into a single user turn.
    fn history_to_converse_messages(history: &[Message]) -> Vec<Value> {
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
                    "toolResult": {
                        "toolUseId": tool_call_id,
                        "content": [{"text": content}]
                    }
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
                    messages.push(json!({"role": "user", "content": [{"text": content}]}));
                }
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                    if !content.is_empty() {
                        blocks.push(json!({"text": content}));
                    }
                    for call in tool_calls {
                        blocks.push(json!({
                            "toolUse": {
                                "toolUseId": call.id,
                                "name": call.tool_name,
                                "input": call.arguments
                            }
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

    fn tools_to_converse_format(tools: &[Arc<dyn Tool>]) -> Value {
        let specs: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "toolSpec": {
                        "name": t.name(),
                        "description": t.description(),
                        "inputSchema": {"json": t.schema()}
                    }
                })
            })
            .collect();
        json!({ "tools": specs })
    }

    fn request_body(&self, history: &[Message], tools: Option<&[Arc<dyn Tool>]>) -> Value {
        let mut body = json!({
            "messages": Self::history_to_converse_messages(history),
        });

        let system: Vec<Value> = self
            .system
            .as_deref()
            .into_iter()
            .chain(extract_system_message(history))
            .map(|text| json!({"text": text}))
            .collect();
        if !system.is_empty() {
            body["system"] = json!(system);
        }

        let mut inference = serde_json::Map::new();
        if let Some(max_tokens) = self.config.max_output_tokens {
            inference.insert("maxTokens".to_string(), json!(max_tokens));
        }
        if let Some(temp) = self.config.temperature {
            inference.insert("temperature".to_string(), json!(temp));
        }
        if let Some(top_p) = self.config.top_p {
            inference.insert("topP".to_string(), json!(top_p));
        }
        if !inference.is_empty() {
            body["inferenceConfig"] = Value::Object(inference);
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["toolConfig"] = Self::tools_to_converse_format(tools);
        }
        body
    }

    /// Parse a Converse response into an assistant message
    fn parse_converse_response(response: &Value) -> Result<Message, ModelInvocationError> {
        let blocks = response["output"]["message"]["content"]
            .as_array()
            .ok_or_else(|| {
                ModelInvocationError::invalid_response(PROVIDER, "no output.message.content in response")
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in blocks {
            if let Some(t) = block["text"].as_str() {
                text.push_str(t);
            } else if let Some(tool_use) = block.get("toolUse") {
                let id = tool_use["toolUseId"].as_str().ok_or_else(|| {
                    ModelInvocationError::invalid_response(PROVIDER, "toolUse block without toolUseId")
                })?;
                let name = tool_use["name"].as_str().ok_or_else(|| {
                    ModelInvocationError::invalid_response(PROVIDER, "toolUse block without name")
                })?;
                tool_calls.push(ToolCallRequest::new(id, name, tool_use["input"].clone()));
            }
        }

        if let Some(stop_reason) = response["stopReason"].as_str() {
            log::debug!("Bedrock stop reason: {}", stop_reason);
        }

        Ok(Message::assistant_with_calls(text, tool_calls))
    }
}

#[async_trait]
impl Model for BedrockModel {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate_content(
        &self,
        history: &[Message],
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, ModelInvocationError> {
        let body = self.request_body(history, tools);
        let payload = serde_json::to_vec(&body)
            .map_err(|e| ModelInvocationError::Runtime(e.to_string()))?;

        log::debug!(
            "Bedrock request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let path = self.converse_path();
        let url = format!("{}{}", self.endpoint, path);
        let host = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| {
                u.host_str().map(|h| match u.port() {
                    Some(port) => format!("{}:{}", h, port),
                    None => h.to_string(),
                })
            })
            .ok_or_else(|| ModelInvocationError::Runtime(format!("invalid endpoint url: {}", url)))?;

        let signed = sigv4::sign(
            &self.credentials,
            &SigningRequest {
                method: "POST",
                host: &host,
                path: &path,
                content_type: CONTENT_TYPE,
                payload: &payload,
                region: &self.region,
                service: SERVICE,
            },
            chrono::Utc::now(),
        );

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", CONTENT_TYPE)
            .body(payload);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        let resp = request
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
        log::info!("Bedrock response: {}", preview(&resp_json.to_string(), 200));

        Self::parse_converse_response(&resp_json)
    }
}

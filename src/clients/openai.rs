// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible client.
//!
//! Speaks the Chat Completions API over reqwest in both call kinds. Works
//! against OpenAI and any compatible endpoint — the API key is optional for
//! servers that do not require one, in which case no authorization header is
//! sent.
//!
//! # API Reference
//!
//! See [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::surface::{CallSurface, MessagesApi};
use crate::types::{
    ChatRequest, ChatResponse, ContentBlockType, InputSchema, MessageContent, Role, StopReason,
    TokenUsage, ToolCall,
};

use super::ClientConfig;

/// Default API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default max tokens if neither request nor config sets one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI-compatible client with a chat completions surface.
pub struct OpenAiClient {
    pub(crate) chat: Option<Arc<dyn MessagesApi>>,
}

impl OpenAiClient {
    /// Create a client with a reqwest-backed surface.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let transport = Arc::new(OpenAiHttp::new(config)?);
        Ok(Self {
            chat: Some(transport),
        })
    }

    /// Create a client from `OPENAI_API_KEY` / `OPENAI_BASE_URL`.
    ///
    /// The key is optional; a compatible server reachable through
    /// `OPENAI_BASE_URL` may not require one.
    pub fn from_env() -> Result<Self, ProviderError> {
        let mut config = ClientConfig {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..Default::default()
        };
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config = config.with_base_url(base_url);
        }

        Self::new(config)
    }

    /// Create a client from an explicit surface handle.
    ///
    /// Useful for tests and for alternative transports.
    pub fn with_surfaces(chat: Option<Arc<dyn MessagesApi>>) -> Self {
        Self { chat }
    }

    /// Send a chat completion request.
    pub async fn create_chat_completion(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        self.chat_surface()?.create(request).await
    }

    /// Send a chat completion request, blocking the calling thread.
    pub fn create_chat_completion_blocking(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        self.chat_surface()?.create_blocking(request)
    }

    fn chat_surface(&self) -> Result<&Arc<dyn MessagesApi>, ProviderError> {
        self.chat.as_ref().ok_or_else(|| {
            ProviderError::UnsupportedOperation(
                "chat completions surface not present in this client build".to_string(),
            )
        })
    }
}

/// reqwest-backed transport implementing the chat surface.
struct OpenAiHttp {
    http: reqwest::Client,
    blocking: OnceCell<reqwest::blocking::Client>,
    api_key: Option<String>,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    timeout: Duration,
}

impl OpenAiHttp {
    fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        Ok(Self {
            http,
            blocking: OnceCell::new(),
            api_key: config.api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
            timeout,
        })
    }

    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, ProviderError> {
        self.blocking.get_or_try_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| ProviderError::NetworkError(e.to_string()))
        })
    }

    fn chat_body(&self, request: &ChatRequest) -> ChatBody {
        let tools = request.tools.as_ref().map(|tools| {
            tools
                .iter()
                .map(|tool| WireTool {
                    tool_type: "function".to_string(),
                    function: WireFunction {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.input_schema.clone(),
                    },
                })
                .collect()
        });

        ChatBody {
            model: request.model.clone(),
            messages: build_wire_messages(request),
            tools,
            max_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            temperature: request.temperature.or(self.temperature),
        }
    }

    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiErrorBody>(body) {
            match status_code {
                401 | 403 => ProviderError::AuthError(error.error.message),
                404 => ProviderError::ModelNotFound(error.error.message),
                429 => ProviderError::RateLimited(error.error.message),
                _ => ProviderError::api(error.error.message, status_code),
            }
        } else {
            ProviderError::api(body.to_string(), status_code)
        }
    }
}

impl CallSurface for OpenAiHttp {}

#[async_trait]
impl MessagesApi for OpenAiHttp {
    async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.chat_body(&request);

        let mut req = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.header("authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        reply.try_into()
    }

    fn create_blocking(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.chat_body(&request);

        let mut req = self
            .blocking_client()?
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.header("authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .json(&body)
            .send()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: ChatReply = response
            .json()
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        reply.try_into()
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

impl WireMessage {
    fn plain(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: InputSchema,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireCallArguments,
}

#[derive(Debug, Serialize)]
struct WireCallArguments {
    name: String,
    arguments: String,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Flatten the conversation into chat-completions wire messages.
///
/// Tool results embedded in user content become separate `tool` role
/// messages; tool uses in assistant content become `tool_calls` entries.
fn build_wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
    let mut wire = Vec::new();

    if let Some(ref system) = request.system {
        wire.push(WireMessage::plain("system", system.clone()));
    }

    for message in &request.messages {
        match &message.content {
            MessageContent::Text(text) => {
                wire.push(WireMessage::plain(role_name(message.role), text.clone()));
            }
            MessageContent::Blocks(blocks) => {
                let mut text = String::new();
                let mut tool_calls = Vec::new();

                for block in blocks {
                    match block.block_type {
                        ContentBlockType::Text => {
                            if let Some(ref t) = block.text {
                                text.push_str(t);
                            }
                        }
                        ContentBlockType::ToolResult => {
                            wire.push(WireMessage {
                                role: "tool".to_string(),
                                content: block.content.clone(),
                                tool_call_id: block.tool_use_id.clone(),
                                tool_calls: None,
                            });
                        }
                        ContentBlockType::ToolUse => {
                            tool_calls.push(WireToolCall {
                                id: block.id.clone().unwrap_or_default(),
                                call_type: "function".to_string(),
                                function: WireCallArguments {
                                    name: block.name.clone().unwrap_or_default(),
                                    arguments: block
                                        .input
                                        .as_ref()
                                        .map(|v| v.to_string())
                                        .unwrap_or_else(|| "{}".to_string()),
                                },
                            });
                        }
                    }
                }

                if !text.is_empty() || !tool_calls.is_empty() {
                    wire.push(WireMessage {
                        role: role_name(message.role).to_string(),
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_call_id: None,
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                    });
                }
            }
        }
    }

    wire
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ReplyToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ReplyToolCall {
    id: String,
    function: ReplyCallArguments,
}

#[derive(Debug, Deserialize)]
struct ReplyCallArguments {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl TryFrom<ChatReply> for ChatResponse {
    type Error = ProviderError;

    fn try_from(reply: ChatReply) -> Result<Self, Self::Error> {
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ParseError("response carried no choices".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                input: serde_json::from_str(&call.function.arguments)
                    .unwrap_or(serde_json::Value::String(call.function.arguments)),
            })
            .collect();

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => {
                if tool_calls.is_empty() {
                    StopReason::EndTurn
                } else {
                    StopReason::ToolUse
                }
            }
        };

        Ok(ChatResponse {
            id: reply.id,
            model: reply.model,
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason,
            usage: reply.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

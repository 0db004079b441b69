// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Anthropic-style client.
//!
//! Speaks the Messages API and the legacy Text Completions API over reqwest,
//! in both call kinds. The two surfaces live in separate slots on
//! [`AnthropicClient`]; older deployments without the legacy surface are
//! modeled with [`AnthropicClient::without_completions`], and the adapter
//! skips the empty slot instead of failing.
//!
//! # API Reference
//!
//! See [Anthropic Messages API](https://docs.anthropic.com/en/api/messages)
//! for details.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::surface::{CallSurface, CompletionsApi, MessagesApi};
use crate::types::{
    ChatRequest, ChatResponse, CompletionRequest, CompletionResponse, Message, StopReason,
    TokenUsage, ToolCall, ToolDefinition,
};

use super::ClientConfig;

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default API base URL.
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default max tokens if neither request nor config sets one.
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Anthropic-style client with messages and legacy completions surfaces.
pub struct AnthropicClient {
    pub(crate) messages: Option<Arc<dyn MessagesApi>>,
    pub(crate) completions: Option<Arc<dyn CompletionsApi>>,
}

impl AnthropicClient {
    /// Create a client with reqwest-backed surfaces.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let transport = Arc::new(AnthropicHttp::new(config)?);
        Ok(Self {
            messages: Some(transport.clone()),
            completions: Some(transport),
        })
    }

    /// Create a client from `ANTHROPIC_API_KEY` / `ANTHROPIC_BASE_URL`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ProviderError::NotConfigured("ANTHROPIC_API_KEY not set".to_string())
        })?;

        let mut config = ClientConfig::with_api_key(api_key);
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            config = config.with_base_url(base_url);
        }

        Self::new(config)
    }

    /// Create a client from explicit surface handles.
    ///
    /// Useful for tests and for alternative transports.
    pub fn with_surfaces(
        messages: Option<Arc<dyn MessagesApi>>,
        completions: Option<Arc<dyn CompletionsApi>>,
    ) -> Self {
        Self {
            messages,
            completions,
        }
    }

    /// Drop the legacy completions surface, as in builds that never had one.
    pub fn without_completions(mut self) -> Self {
        self.completions = None;
        self
    }

    /// Check whether the legacy completions surface is present.
    pub fn has_completions(&self) -> bool {
        self.completions.is_some()
    }

    /// Send a messages request.
    pub async fn create_message(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.messages_surface()?.create(request).await
    }

    /// Send a messages request, blocking the calling thread.
    pub fn create_message_blocking(
        &self,
        request: ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        self.messages_surface()?.create_blocking(request)
    }

    /// Send a legacy completion request.
    pub async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.completions_surface()?.create(request).await
    }

    /// Send a legacy completion request, blocking the calling thread.
    pub fn create_completion_blocking(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.completions_surface()?.create_blocking(request)
    }

    fn messages_surface(&self) -> Result<&Arc<dyn MessagesApi>, ProviderError> {
        self.messages.as_ref().ok_or_else(|| {
            ProviderError::UnsupportedOperation(
                "messages surface not present in this client build".to_string(),
            )
        })
    }

    fn completions_surface(&self) -> Result<&Arc<dyn CompletionsApi>, ProviderError> {
        self.completions.as_ref().ok_or_else(|| {
            ProviderError::UnsupportedOperation(
                "completions surface not present in this client build".to_string(),
            )
        })
    }
}

/// reqwest-backed transport implementing both surfaces.
struct AnthropicHttp {
    http: reqwest::Client,
    blocking: OnceCell<reqwest::blocking::Client>,
    api_key: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    timeout: Duration,
}

impl AnthropicHttp {
    fn new(config: ClientConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured("API key required for Anthropic".to_string())
        })?;

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
            api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
            timeout,
        })
    }

    // The blocking transport is built lazily so clients constructed inside an
    // async runtime pay nothing for the call kind they never use.
    fn blocking_client(&self) -> Result<&reqwest::blocking::Client, ProviderError> {
        self.blocking.get_or_try_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| ProviderError::NetworkError(e.to_string()))
        })
    }

    fn messages_body<'a>(&'a self, request: &'a ChatRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: &request.model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            messages: &request.messages,
            system: request.system.as_deref(),
            tools: request.tools.as_deref(),
            temperature: request.temperature.or(self.temperature),
        }
    }

    fn completions_body<'a>(&'a self, request: &'a CompletionRequest) -> CompletionsBody<'a> {
        CompletionsBody {
            model: &request.model,
            prompt: &request.prompt,
            max_tokens_to_sample: request.max_tokens.unwrap_or(self.max_tokens),
            stop_sequences: request.stop_sequences.as_deref(),
            temperature: request.temperature.or(self.temperature),
        }
    }

    /// Map an error response body to the provider error taxonomy.
    fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
        if let Ok(error) = serde_json::from_str::<ApiErrorBody>(body) {
            match error.error.error_type.as_str() {
                "authentication_error" => ProviderError::AuthError(error.error.message),
                "rate_limit_error" => ProviderError::RateLimited(error.error.message),
                "invalid_request_error" => {
                    if error.error.message.contains("model") {
                        ProviderError::ModelNotFound(error.error.message)
                    } else {
                        ProviderError::api(error.error.message, status_code)
                    }
                }
                "overloaded_error" => ProviderError::RateLimited("API overloaded".to_string()),
                _ => ProviderError::api(error.error.message, status_code),
            }
        } else {
            ProviderError::api(body.to_string(), status_code)
        }
    }
}

impl CallSurface for AnthropicHttp {}

#[async_trait]
impl MessagesApi for AnthropicHttp {
    async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.messages_body(&request);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: MessagesReply = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(reply.into())
    }

    fn create_blocking(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.messages_body(&request);

        let response = self
            .blocking_client()?
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: MessagesReply = response
            .json()
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(reply.into())
    }
}

#[async_trait]
impl CompletionsApi for AnthropicHttp {
    async fn create(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = self.completions_body(&request);

        let response = self
            .http
            .post(format!("{}/v1/complete", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: CompletionsReply = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(reply.into())
    }

    fn create_blocking(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = self.completions_body(&request);

        let response = self
            .blocking_client()?
            .post(format!("{}/v1/complete", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(Self::handle_error_response(status.as_u16(), &error_text));
        }

        let reply: CompletionsReply = response
            .json()
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(reply.into())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct CompletionsBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens_to_sample: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct MessagesReply {
    id: Option<String>,
    model: Option<String>,
    #[serde(default)]
    content: Vec<ReplyBlock>,
    stop_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
    id: Option<String>,
    name: Option<String>,
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CompletionsReply {
    id: Option<String>,
    model: Option<String>,
    completion: String,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn map_stop_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

impl From<MessagesReply> for ChatResponse {
    fn from(reply: MessagesReply) -> Self {
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in reply.content {
            match block.block_type.as_str() {
                "text" => {
                    if let Some(text) = block.text {
                        content.push_str(&text);
                    }
                }
                "tool_use" => {
                    tool_calls.push(ToolCall {
                        id: block.id.unwrap_or_default(),
                        name: block.name.unwrap_or_default(),
                        input: block.input.unwrap_or(serde_json::Value::Null),
                    });
                }
                _ => {}
            }
        }

        ChatResponse {
            id: reply.id,
            model: reply.model,
            content,
            tool_calls,
            stop_reason: map_stop_reason(reply.stop_reason.as_deref()),
            usage: reply.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

impl From<CompletionsReply> for CompletionResponse {
    fn from(reply: CompletionsReply) -> Self {
        CompletionResponse {
            id: reply.id,
            model: reply.model,
            text: reply.completion,
            stop_reason: map_stop_reason(reply.stop_reason.as_deref()),
            usage: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_requires_api_key() {
        let result = AnthropicClient::new(ClientConfig::default());
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_new_with_key_has_both_surfaces() {
        let client = AnthropicClient::new(ClientConfig::with_api_key("test-key")).unwrap();
        assert!(client.messages.is_some());
        assert!(client.has_completions());
    }

    #[test]
    fn test_without_completions_drops_surface() {
        let client = AnthropicClient::new(ClientConfig::with_api_key("test-key"))
            .unwrap()
            .without_completions();
        assert!(!client.has_completions());
        assert!(client.messages.is_some());
    }

    #[test]
    fn test_messages_body_shape() {
        let transport = AnthropicHttp::new(ClientConfig::with_api_key("k")).unwrap();
        let request = ChatRequest::new("model-x", vec![Message::user("hi")])
            .with_system("be brief")
            .with_max_tokens(64);

        let body = serde_json::to_value(transport.messages_body(&request)).unwrap();
        assert_eq!(body["model"], "model-x");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["system"], "be brief");
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_messages_body_defaults_max_tokens() {
        let transport = AnthropicHttp::new(ClientConfig::with_api_key("k")).unwrap();
        let request = ChatRequest::new("model-x", vec![]);
        let body = serde_json::to_value(transport.messages_body(&request)).unwrap();
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_completions_body_shape() {
        let transport = AnthropicHttp::new(ClientConfig::with_api_key("k")).unwrap();
        let request = CompletionRequest::new("model-x", "Once upon a time").with_max_tokens(32);

        let body = serde_json::to_value(transport.completions_body(&request)).unwrap();
        assert_eq!(body["prompt"], "Once upon a time");
        assert_eq!(body["max_tokens_to_sample"], 32);
        assert!(body.get("stop_sequences").is_none());
    }

    #[test]
    fn test_messages_reply_mapping() {
        let reply: MessagesReply = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "model-x",
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "world"},
                {"type": "tool_use", "id": "t1", "name": "bash", "input": {"command": "ls"}},
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5},
        }))
        .unwrap();

        let response: ChatResponse = reply.into();
        assert_eq!(response.content, "Hello world");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "bash");
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert_eq!(response.usage.unwrap().total(), 15);
    }

    #[test]
    fn test_completions_reply_mapping() {
        let reply: CompletionsReply = serde_json::from_value(json!({
            "id": "cmpl_1",
            "completion": " there was a crab",
            "stop_reason": "max_tokens",
        }))
        .unwrap();

        let response: CompletionResponse = reply.into();
        assert_eq!(response.text, " there was a crab");
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
    }

    #[test]
    fn test_error_body_mapping() {
        let body = json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "bad key"},
        })
        .to_string();
        let err = AnthropicHttp::handle_error_response(401, &body);
        assert!(matches!(err, ProviderError::AuthError(_)));

        let body = json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "slow down"},
        })
        .to_string();
        let err = AnthropicHttp::handle_error_response(429, &body);
        assert!(err.is_rate_limited());

        let err = AnthropicHttp::handle_error_response(500, "not json");
        assert!(matches!(
            err,
            ProviderError::ApiError {
                status_code: Some(500),
                ..
            }
        ));
    }
}

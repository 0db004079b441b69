// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tapline - transparent request/response telemetry for LLM client surfaces.
//!
//! Tapline intercepts calls made through LLM client surfaces and forwards a
//! copy of each request/response pair to a telemetry sink, without altering
//! what the caller sees. Wrapped calls return the original value and raise
//! the original failure; telemetry is a pure side channel.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (Message, ToolDefinition, ChatRequest, etc.)
//! - [`error`] - Error types and result aliases
//! - [`surface`] - Call-surface traits the interceptor wraps
//! - [`intercept`] - The method interceptor: wrapper installation and the wrappers
//! - [`classify`] - Call classification for telemetry enrichment
//! - [`sink`] - Call records, the sink trait, concrete sinks, enablement
//! - [`adapters`] - Per-library adapters enumerating instrumentable call sites
//! - [`clients`] - reqwest-backed client implementations (Anthropic, OpenAI)
//! - [`config`] - Process-level settings (enablement, destination)
//! - [`telemetry`] - Diagnostics (`tracing`) and per-site metrics
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tapline::{adapters, AnthropicClient, ChatRequest, Message, Settings};
//!
//! // Resolve settings (env over files over defaults) and initialize.
//! let sink = tapline::init(&Settings::from_env()?)?;
//!
//! // Construct a client and instrument it once, before traffic.
//! let mut client = AnthropicClient::from_env()?;
//! let report = adapters::anthropic::instrument(&mut client, sink);
//! eprintln!("{report}");
//!
//! // Use the client exactly as before; every call is now recorded.
//! let request = ChatRequest::new("claude-sonnet-4-20250514", vec![Message::user("Hello!")]);
//! let response = client.create_message(request).await?;
//! ```

pub mod adapters;
pub mod classify;
pub mod clients;
pub mod config;
pub mod error;
pub mod intercept;
pub mod sink;
pub mod surface;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use classify::{classify, CallTraits};
pub use clients::{AnthropicClient, ClientConfig, OpenAiClient};
pub use config::{Destination, Settings, SettingsOverlay};
pub use error::{ConfigError, ProviderError, Result, SinkError};
pub use intercept::{install, CallKind, CallSite, InstallOutcome, REGISTRY};
pub use sink::{
    enabled, set_enabled, CallRecord, ConsoleSink, FileSink, MemorySink, Sink, STATUS_ERROR,
    STATUS_OK,
};
pub use surface::{CallSurface, CompletionsApi, MessagesApi};
pub use types::{
    ChatRequest, ChatResponse, CompletionRequest, CompletionResponse, ContentBlock, Message,
    MessageContent, Role, StopReason, TokenUsage, ToolCall, ToolDefinition,
};

use std::sync::Arc;

/// Tapline version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Apply settings and build the process-wide default sink.
///
/// Sets the enablement flag, constructs the sink the settings describe, and
/// installs it as the default. Returns the sink so adapters can share it.
/// Safe to call more than once; the last call wins.
pub fn init(settings: &Settings) -> std::result::Result<Arc<dyn Sink>, ConfigError> {
    sink::set_enabled(settings.enabled);
    let built = settings.build_sink()?;
    sink::set_default_sink(built.clone());
    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let _msg = Message::user("test");
        let _record = CallRecord::success(serde_json::json!({}), serde_json::json!({}));
    }

    #[test]
    fn test_init_applies_enablement_and_sink() {
        let _guard = sink::TEST_FLAG_LOCK.lock().unwrap();

        let settings = Settings {
            enabled: false,
            destination: Destination::Memory,
            log_file: None,
        };
        let built = init(&settings).unwrap();
        assert!(!sink::enabled());

        sink::set_enabled(true);
        assert!(sink::default_sink()
            .emit(&CallRecord::success(
                serde_json::json!({}),
                serde_json::json!({})
            ))
            .is_ok());
        drop(built);
    }
}

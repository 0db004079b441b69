// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Wrapper types installed over client surfaces.
//!
//! A wrapper runs the original call, then records exactly one telemetry
//! record for it — success-shaped or error-shaped — without touching the
//! call's outcome. Classification and emission sit behind a result boundary:
//! whatever goes wrong there is logged and discarded, never surfaced to the
//! caller. The caller sees precisely what the unwrapped surface would have
//! produced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::classify;
use crate::error::ProviderError;
use crate::sink::{self, CallRecord, Sink};
use crate::surface::{CallSurface, CompletionsApi, MessagesApi};
use crate::telemetry::metrics::GLOBAL_METRICS;
use crate::types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse};

use super::{CallKind, CallSite};

/// Normalize a value to its structured form.
///
/// Values that cannot serialize are carried as their debug rendering rather
/// than dropped.
fn dump_value<T: Serialize + std::fmt::Debug>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|_| serde_json::json!({ "debug": format!("{value:?}") }))
}

/// Classify the query and log what was found. Cannot affect the call.
fn observe(site: &CallSite, kind: CallKind, query: &Value) {
    let traits = classify(query);
    if let Some(count) = traits.tool_count {
        debug!(site = %site, kind = %kind, tools = count, "tool definitions present");
    }
    if traits.has_tool_result {
        debug!(site = %site, kind = %kind, "tool result content in conversation");
    }
}

/// Record metrics and emit exactly one telemetry record for a finished call.
///
/// Emission is gated on the enablement flag, read here, per call. Sink
/// failures are logged and discarded.
fn finish_call<R: Serialize + std::fmt::Debug>(
    sink: &dyn Sink,
    site: &CallSite,
    kind: CallKind,
    query: Value,
    result: &Result<R, ProviderError>,
    elapsed: Duration,
) {
    GLOBAL_METRICS.record_call(&site.key(), elapsed, result.is_ok());

    if !sink::enabled() {
        return;
    }

    let record = match result {
        Ok(response) => CallRecord::success(query, dump_value(response)),
        Err(error) => CallRecord::failure(query, error),
    };

    if let Err(error) = sink.emit(&record) {
        warn!(site = %site, kind = %kind, error = %error, "telemetry emission failed");
    }
}

/// Telemetry wrapper over a messages surface.
pub struct InstrumentedMessages {
    inner: Arc<dyn MessagesApi>,
    site: CallSite,
    sink: Arc<dyn Sink>,
}

impl InstrumentedMessages {
    /// Wrap a messages surface.
    pub fn new(inner: Arc<dyn MessagesApi>, site: CallSite, sink: Arc<dyn Sink>) -> Self {
        Self { inner, site, sink }
    }
}

impl CallSurface for InstrumentedMessages {
    fn is_instrumented(&self) -> bool {
        true
    }
}

#[async_trait]
impl MessagesApi for InstrumentedMessages {
    async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let query = dump_value(&request);
        observe(&self.site, CallKind::Async, &query);

        let start = Instant::now();
        let result = self.inner.create(request).await;

        finish_call(
            self.sink.as_ref(),
            &self.site,
            CallKind::Async,
            query,
            &result,
            start.elapsed(),
        );
        result
    }

    fn create_blocking(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let query = dump_value(&request);
        observe(&self.site, CallKind::Blocking, &query);

        let start = Instant::now();
        let result = self.inner.create_blocking(request);

        finish_call(
            self.sink.as_ref(),
            &self.site,
            CallKind::Blocking,
            query,
            &result,
            start.elapsed(),
        );
        result
    }
}

/// Telemetry wrapper over a legacy completions surface.
pub struct InstrumentedCompletions {
    inner: Arc<dyn CompletionsApi>,
    site: CallSite,
    sink: Arc<dyn Sink>,
}

impl InstrumentedCompletions {
    /// Wrap a completions surface.
    pub fn new(inner: Arc<dyn CompletionsApi>, site: CallSite, sink: Arc<dyn Sink>) -> Self {
        Self { inner, site, sink }
    }
}

impl CallSurface for InstrumentedCompletions {
    fn is_instrumented(&self) -> bool {
        true
    }
}

#[async_trait]
impl CompletionsApi for InstrumentedCompletions {
    async fn create(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let query = dump_value(&request);
        observe(&self.site, CallKind::Async, &query);

        let start = Instant::now();
        let result = self.inner.create(request).await;

        finish_call(
            self.sink.as_ref(),
            &self.site,
            CallKind::Async,
            query,
            &result,
            start.elapsed(),
        );
        result
    }

    fn create_blocking(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let query = dump_value(&request);
        observe(&self.site, CallKind::Blocking, &query);

        let start = Instant::now();
        let result = self.inner.create_blocking(request);

        finish_call(
            self.sink.as_ref(),
            &self.site,
            CallKind::Blocking,
            query,
            &result,
            start.elapsed(),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, MockSink, TEST_FLAG_LOCK};
    use crate::types::Message;
    use serde_json::json;

    const SITE: CallSite = CallSite::new("stub", "messages", "create");

    /// Stub surface returning a canned response or a canned failure.
    struct StubMessages {
        fail: bool,
    }

    impl CallSurface for StubMessages {}

    #[async_trait]
    impl MessagesApi for StubMessages {
        async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.create_blocking(request)
        }

        fn create_blocking(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            if self.fail {
                Err(ProviderError::api("bad request", 400))
            } else {
                Ok(ChatResponse::text("ok"))
            }
        }
    }

    fn wrapped(fail: bool, sink: Arc<dyn Sink>) -> InstrumentedMessages {
        InstrumentedMessages::new(Arc::new(StubMessages { fail }), SITE, sink)
    }

    fn request() -> ChatRequest {
        ChatRequest::new("model-x", vec![Message::user("hi")])
    }

    #[tokio::test]
    async fn test_success_returns_value_and_emits_once() {
        let _guard = TEST_FLAG_LOCK.lock().unwrap();
        let memory = Arc::new(MemorySink::new());
        let surface = wrapped(false, memory.clone());

        let response = surface.create(request()).await.unwrap();
        assert_eq!(response.content, "ok");

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 200);
        assert_eq!(records[0].query["model"], "model-x");
        assert_eq!(records[0].response["content"], "ok");
    }

    #[tokio::test]
    async fn test_failure_reraises_and_emits_error_record() {
        let _guard = TEST_FLAG_LOCK.lock().unwrap();
        let memory = Arc::new(MemorySink::new());
        let surface = wrapped(true, memory.clone());

        let err = surface.create(request()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ApiError {
                status_code: Some(400),
                ..
            }
        ));
        assert_eq!(err.to_string(), "API error: bad request");

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, 400);
        assert_eq!(
            records[0].response,
            json!({"error": "API error: bad request"})
        );
    }

    #[test]
    fn test_blocking_kind_matches_async_contract() {
        let _guard = TEST_FLAG_LOCK.lock().unwrap();
        let memory = Arc::new(MemorySink::new());
        let surface = wrapped(false, memory.clone());

        let response = surface.create_blocking(request()).unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_flag_suppresses_emission() {
        let _guard = TEST_FLAG_LOCK.lock().unwrap();
        let memory = Arc::new(MemorySink::new());
        let surface = wrapped(false, memory.clone());

        sink::set_enabled(false);
        let result = surface.create(request()).await;
        sink::set_enabled(true);

        assert!(result.is_ok());
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_never_reaches_caller() {
        let _guard = TEST_FLAG_LOCK.lock().unwrap();
        let mut mock = MockSink::new();
        mock.expect_emit()
            .times(1)
            .returning(|_| Err(crate::error::SinkError::Unavailable("down".to_string())));

        let surface = wrapped(false, Arc::new(mock));
        let response = surface.create(request()).await.unwrap();
        assert_eq!(response.content, "ok");
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Enablement flag behavior.
//!
//! The flag is process-wide, so every test here serializes on one lock and
//! restores the enabled state before releasing it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tapline::adapters;
use tapline::sink::MemorySink;
use tapline::{
    AnthropicClient, CallSurface, ChatRequest, ChatResponse, Message, MessagesApi, ProviderError,
};

static FLAG_LOCK: Mutex<()> = Mutex::new(());

struct StubMessages;

impl CallSurface for StubMessages {}

#[async_trait]
impl MessagesApi for StubMessages {
    async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.create_blocking(request)
    }

    fn create_blocking(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse::text("ok"))
    }
}

fn instrumented_client(sink: Arc<MemorySink>) -> AnthropicClient {
    let mut client = AnthropicClient::with_surfaces(Some(Arc::new(StubMessages)), None);
    adapters::anthropic::instrument(&mut client, sink);
    client
}

fn request() -> ChatRequest {
    ChatRequest::new("model-x", vec![Message::user("hi")])
}

#[tokio::test]
async fn disabled_flag_emits_nothing_but_calls_succeed() {
    let _guard = FLAG_LOCK.lock().unwrap();
    let memory = Arc::new(MemorySink::new());
    let client = instrumented_client(memory.clone());

    tapline::set_enabled(false);
    let result = client.create_message(request()).await;
    tapline::set_enabled(true);

    assert_eq!(result.unwrap().content, "ok");
    assert!(memory.is_empty());
}

#[tokio::test]
async fn toggling_takes_effect_per_call() {
    let _guard = FLAG_LOCK.lock().unwrap();
    let memory = Arc::new(MemorySink::new());
    let client = instrumented_client(memory.clone());

    client.create_message(request()).await.unwrap();

    tapline::set_enabled(false);
    client.create_message(request()).await.unwrap();

    tapline::set_enabled(true);
    client.create_message(request()).await.unwrap();

    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn n_calls_emit_n_records_when_enabled() {
    let _guard = FLAG_LOCK.lock().unwrap();
    let memory = Arc::new(MemorySink::new());
    let client = instrumented_client(memory.clone());

    for _ in 0..5 {
        client.create_message(request()).await.unwrap();
    }

    assert_eq!(memory.len(), 5);
}

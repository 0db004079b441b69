// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Call-surface traits for instrumentable client methods.
//!
//! A *surface* is one user-facing call family of a client library — for
//! example the messages endpoint, or a legacy text-completion endpoint. Each
//! surface trait carries an asynchronous method and its blocking twin; a
//! surface implementation must provide both, so the two call kinds can never
//! drift apart at the type level.
//!
//! Clients hold surfaces as `Option<Arc<dyn …>>` slots. An empty slot means
//! the surface is not present in this client build (version drift), which the
//! adapters tolerate. The interceptor replaces a populated slot with a
//! wrapper implementing the same trait — see [`crate::intercept`].

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse};

/// Base trait shared by all call surfaces.
pub trait CallSurface: Send + Sync {
    /// Marker distinguishing an instrumented surface from a pristine one.
    ///
    /// Wrapper types override this to return `true`; it is the idempotency
    /// guard that keeps repeated installation from stacking wrappers.
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// A messages-style chat surface ("messages create" and its async twin).
#[async_trait]
pub trait MessagesApi: CallSurface {
    /// Send a chat request, suspending until the backend responds.
    async fn create(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;

    /// Send a chat request, blocking the calling thread.
    fn create_blocking(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// A legacy text-completion surface.
#[async_trait]
pub trait CompletionsApi: CallSurface {
    /// Send a completion request, suspending until the backend responds.
    async fn create(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Send a completion request, blocking the calling thread.
    fn create_blocking(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare;

    impl CallSurface for Bare {}

    #[test]
    fn test_marker_defaults_to_pristine() {
        assert!(!Bare.is_instrumented());
    }
}

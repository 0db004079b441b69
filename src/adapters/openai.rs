// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Adapter for the OpenAI-compatible client.
//!
//! Instruments the chat completions surface.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::OpenAiClient;
use crate::intercept::{install, CallSite, InstallOutcome, InstrumentedMessages};
use crate::sink::Sink;
use crate::surface::MessagesApi;

use super::AdapterReport;

/// The chat completions call site.
pub const CHAT_COMPLETIONS_CREATE: CallSite =
    CallSite::new("openai", "chat.completions", "create");

/// Instrument every resolvable call site of an OpenAI-compatible client.
///
/// Safe to invoke multiple times; a missing surface is skipped with a
/// diagnostic.
pub fn instrument(client: &mut OpenAiClient, sink: Arc<dyn Sink>) -> AdapterReport {
    let mut report = AdapterReport::new("openai");

    let outcome = install(&mut client.chat, &CHAT_COMPLETIONS_CREATE, |original| {
        Arc::new(InstrumentedMessages::new(
            original,
            CHAT_COMPLETIONS_CREATE,
            sink,
        )) as Arc<dyn MessagesApi>
    });

    match outcome {
        InstallOutcome::Installed => info!(site = %CHAT_COMPLETIONS_CREATE, "wrapped call site"),
        InstallOutcome::AlreadyInstrumented => {
            info!(site = %CHAT_COMPLETIONS_CREATE, "already instrumented")
        }
        InstallOutcome::NotApplicable => {
            warn!(site = %CHAT_COMPLETIONS_CREATE, "surface not present in this client build")
        }
    }
    report.push(CHAT_COMPLETIONS_CREATE, outcome);

    report
}

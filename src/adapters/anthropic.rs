// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Adapter for the Anthropic-style client.
//!
//! Instruments the messages surface and, when present, the legacy text
//! completions surface. Call this once at process start, before traffic:
//!
//! ```rust,ignore
//! let mut client = AnthropicClient::from_env()?;
//! let report = tapline::adapters::anthropic::instrument(&mut client, sink);
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::AnthropicClient;
use crate::intercept::{
    install, CallSite, InstallOutcome, InstrumentedCompletions, InstrumentedMessages,
};
use crate::sink::Sink;
use crate::surface::{CompletionsApi, MessagesApi};

use super::AdapterReport;

/// The messages call site.
pub const MESSAGES_CREATE: CallSite = CallSite::new("anthropic", "messages", "create");

/// The legacy text completions call site.
pub const COMPLETIONS_CREATE: CallSite = CallSite::new("anthropic", "completions", "create");

/// Instrument every resolvable call site of an Anthropic-style client.
///
/// Safe to invoke multiple times; missing surfaces are skipped with a
/// diagnostic.
pub fn instrument(client: &mut AnthropicClient, sink: Arc<dyn Sink>) -> AdapterReport {
    let mut report = AdapterReport::new("anthropic");

    let messages_sink = sink.clone();
    let outcome = install(&mut client.messages, &MESSAGES_CREATE, |original| {
        Arc::new(InstrumentedMessages::new(
            original,
            MESSAGES_CREATE,
            messages_sink,
        )) as Arc<dyn MessagesApi>
    });
    log_outcome(&MESSAGES_CREATE, outcome);
    report.push(MESSAGES_CREATE, outcome);

    let outcome = install(&mut client.completions, &COMPLETIONS_CREATE, |original| {
        Arc::new(InstrumentedCompletions::new(
            original,
            COMPLETIONS_CREATE,
            sink,
        )) as Arc<dyn CompletionsApi>
    });
    log_outcome(&COMPLETIONS_CREATE, outcome);
    report.push(COMPLETIONS_CREATE, outcome);

    report
}

fn log_outcome(site: &CallSite, outcome: InstallOutcome) {
    match outcome {
        InstallOutcome::Installed => info!(site = %site, "wrapped call site"),
        InstallOutcome::AlreadyInstrumented => info!(site = %site, "already instrumented"),
        InstallOutcome::NotApplicable => {
            warn!(site = %site, "surface not present in this client build")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ClientConfig;
    use crate::sink::MemorySink;
    use crate::surface::CallSurface;

    fn client() -> AnthropicClient {
        AnthropicClient::new(ClientConfig::with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_instruments_both_sites() {
        let mut client = client();
        let report = instrument(&mut client, Arc::new(MemorySink::new()));

        assert_eq!(report.installed_count(), 2);
        assert!(client.messages.as_ref().unwrap().is_instrumented());
        assert!(client.completions.as_ref().unwrap().is_instrumented());
    }

    #[test]
    fn test_second_run_is_noop() {
        let mut client = client();
        let sink: Arc<MemorySink> = Arc::new(MemorySink::new());

        let first = instrument(&mut client, sink.clone());
        assert_eq!(first.installed_count(), 2);

        let second = instrument(&mut client, sink);
        assert!(second.is_noop());
        assert!(second
            .outcomes()
            .iter()
            .all(|(_, outcome)| *outcome == InstallOutcome::AlreadyInstrumented));
    }

    #[test]
    fn test_missing_completions_surface_is_skipped() {
        let mut client = client().without_completions();
        let report = instrument(&mut client, Arc::new(MemorySink::new()));

        assert_eq!(report.installed_count(), 1);
        assert_eq!(report.outcomes()[1].1, InstallOutcome::NotApplicable);
        assert!(client.messages.as_ref().unwrap().is_instrumented());
        assert!(!client.has_completions());
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry sink: the collector boundary.
//!
//! The interceptor hands every intercepted call to a [`Sink`] as a
//! [`CallRecord`]. Sinks are opaque collaborators — transport, buffering and
//! storage are entirely theirs; the interceptor does no retries and never
//! lets a sink failure cross back into the wrapped call's result path.
//!
//! Emission is gated by a process-wide enablement flag, read at emission
//! time on every call so that toggling takes effect immediately:
//!
//! ```rust,ignore
//! tapline::sink::set_enabled(false);   // subsequent calls emit nothing
//! tapline::sink::set_enabled(true);    // and back on again
//! ```

mod console;
mod file;
mod memory;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use memory::MemorySink;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SinkError;

/// Status code recorded for a call that returned normally.
pub const STATUS_OK: u16 = 200;

/// Status code recorded for a call whose original method failed.
pub const STATUS_ERROR: u16 = 400;

/// One intercepted request/response pair.
///
/// Ephemeral — built per invocation, handed to the sink, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// The caller's full request payload, serialized to a structured mapping.
    pub query: Value,

    /// The normalized response on success, or `{"error": …}` on failure.
    pub response: Value,

    /// 200 on success, 400 on failure.
    pub status: u16,
}

impl CallRecord {
    /// Build a success-shaped record.
    pub fn success(query: Value, response: Value) -> Self {
        Self {
            query,
            response,
            status: STATUS_OK,
        }
    }

    /// Build an error-shaped record carrying the stringified failure.
    pub fn failure(query: Value, error: impl std::fmt::Display) -> Self {
        Self {
            query,
            response: serde_json::json!({ "error": error.to_string() }),
            status: STATUS_ERROR,
        }
    }

    /// Check if this record is success-shaped.
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// A telemetry collector accepting call records.
#[cfg_attr(test, mockall::automock)]
pub trait Sink: Send + Sync {
    /// Accept one record. Best-effort: failures are reported, never retried.
    fn emit(&self, record: &CallRecord) -> Result<(), SinkError>;
}

/// Process-wide enablement flag, read at emission time.
static ENABLED: AtomicBool = AtomicBool::new(true);

/// Process-wide default sink, used when no explicit sink is supplied.
static DEFAULT_SINK: Lazy<RwLock<Arc<dyn Sink>>> =
    Lazy::new(|| RwLock::new(Arc::new(ConsoleSink::stderr())));

/// Enable or disable telemetry emission for the whole process.
pub fn set_enabled(on: bool) {
    ENABLED.store(on, Ordering::Relaxed);
}

/// Check whether telemetry emission is currently enabled.
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Replace the process-wide default sink.
pub fn set_default_sink(sink: Arc<dyn Sink>) {
    let mut guard = DEFAULT_SINK.write().unwrap();
    *guard = sink;
}

/// Get the process-wide default sink.
pub fn default_sink() -> Arc<dyn Sink> {
    DEFAULT_SINK.read().unwrap().clone()
}

#[cfg(test)]
pub(crate) static TEST_FLAG_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

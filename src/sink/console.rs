// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Console sink writing one line per record to stdout or stderr.

use std::io::Write;

use chrono::{SecondsFormat, Utc};

use crate::error::SinkError;

use super::{CallRecord, Sink};

/// Which standard stream the console sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Sink that renders records as timestamped JSON lines on a standard stream.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    stream: Stream,
}

impl ConsoleSink {
    /// Create a sink writing to stdout.
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    /// Create a sink writing to stderr.
    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }

    fn format_line(record: &CallRecord) -> Result<String, SinkError> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let body = serde_json::to_string(record)?;
        Ok(format!("{timestamp} tapline {} {body}", record.status))
    }
}

impl Sink for ConsoleSink {
    fn emit(&self, record: &CallRecord) -> Result<(), SinkError> {
        let line = Self::format_line(record)?;
        match self.stream {
            Stream::Stdout => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                writeln!(handle, "{line}")?;
            }
            Stream::Stderr => {
                let stderr = std::io::stderr();
                let mut handle = stderr.lock();
                writeln!(handle, "{line}")?;
            }
        }
        Ok(())
    }
}

// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Diagnostics and metrics infrastructure.
//!
//! This module provides the observability side of tapline that is *not* the
//! record stream itself:
//!
//! - **Diagnostics**: structured `tracing` output describing what was
//!   resolved, wrapped, skipped, and whether emissions failed. Advisory,
//!   never required for correctness.
//! - **Metrics**: lightweight per-call-site counters and timings, collected
//!   globally, suitable for a library where a full observability stack is
//!   overkill.
//!
//! Initialize diagnostics once at application startup:
//!
//! ```rust,ignore
//! use tapline::telemetry::{init_diagnostics, DiagnosticsConfig};
//!
//! let _guard = init_diagnostics(&DiagnosticsConfig::default())?;
//! ```

mod init;
pub mod metrics;

pub use init::{init_diagnostics, DiagnosticsConfig, DiagnosticsGuard};
pub use metrics::{CallMetrics, Metrics, MetricsSnapshot, GLOBAL_METRICS};

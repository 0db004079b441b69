// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-call-site metrics collection.
//!
//! Counts and times every intercepted call by site key. Kept deliberately
//! small: a `RwLock`ed map off the emission decision path, no histogram
//! machinery, no external collector.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    /// Call metrics by site key.
    calls: RwLock<HashMap<String, CallMetrics>>,

    /// Start time for calculating uptime.
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one intercepted call.
    pub fn record_call(&self, site: &str, duration: Duration, success: bool) {
        let mut calls = self.calls.write().unwrap();
        let metrics = calls.entry(site.to_string()).or_default();
        metrics.record(duration, success);
    }

    /// Get metrics for a specific site.
    pub fn call_metrics(&self, site: &str) -> Option<CallMetrics> {
        self.calls.read().unwrap().get(site).cloned()
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.read().unwrap().clone(),
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.calls.write().unwrap().clear();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for a single call site.
#[derive(Debug, Clone)]
pub struct CallMetrics {
    /// Total number of invocations.
    pub invocations: u64,

    /// Number of invocations that returned normally.
    pub successes: u64,

    /// Number of invocations whose original call failed.
    pub failures: u64,

    /// Total time spent in calls through this site.
    pub total_duration: Duration,

    /// Minimum call duration.
    pub min_duration: Duration,

    /// Maximum call duration.
    pub max_duration: Duration,
}

impl CallMetrics {
    /// Create new empty call metrics.
    pub fn new() -> Self {
        Self {
            invocations: 0,
            successes: 0,
            failures: 0,
            total_duration: Duration::ZERO,
            min_duration: Duration::MAX,
            max_duration: Duration::ZERO,
        }
    }

    /// Record one call.
    pub fn record(&mut self, duration: Duration, success: bool) {
        self.invocations += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.total_duration += duration;
        self.min_duration = self.min_duration.min(duration);
        self.max_duration = self.max_duration.max(duration);
    }

    /// Calculate average call duration.
    pub fn avg_duration(&self) -> Duration {
        if self.invocations == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.invocations as u32
        }
    }

    /// Calculate success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.invocations == 0 {
            1.0
        } else {
            self.successes as f64 / self.invocations as f64
        }
    }
}

impl Default for CallMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of all metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Call metrics by site key.
    pub calls: HashMap<String, CallMetrics>,

    /// Uptime when snapshot was taken.
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Format as a human-readable report.
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Call Metrics ===\n");
        report.push_str(&format!("Uptime: {:.2?}\n", self.uptime));

        let mut sites: Vec<_> = self.calls.iter().collect();
        sites.sort_by_key(|(site, _)| site.as_str());

        for (site, metrics) in sites {
            report.push_str(&format!(
                "  {}: {} calls, {:.1}% success, avg {:.2?}\n",
                site,
                metrics.invocations,
                metrics.success_rate() * 100.0,
                metrics.avg_duration()
            ));
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_metrics() {
        let mut metrics = CallMetrics::new();
        metrics.record(Duration::from_millis(100), true);
        metrics.record(Duration::from_millis(200), true);
        metrics.record(Duration::from_millis(50), false);

        assert_eq!(metrics.invocations, 3);
        assert_eq!(metrics.successes, 2);
        assert_eq!(metrics.failures, 1);
        assert!((metrics.success_rate() - 0.666).abs() < 0.01);
        assert_eq!(metrics.max_duration, Duration::from_millis(200));
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = CallMetrics::new();
        assert_eq!(metrics.avg_duration(), Duration::ZERO);
        assert_eq!(metrics.success_rate(), 1.0);
    }

    #[test]
    fn test_collector_snapshot() {
        let metrics = Metrics::new();
        metrics.record_call("stub.messages.create", Duration::from_millis(10), true);
        metrics.record_call("stub.messages.create", Duration::from_millis(30), false);

        let snapshot = metrics.snapshot();
        let call = snapshot.calls.get("stub.messages.create").unwrap();
        assert_eq!(call.invocations, 2);
        assert_eq!(call.avg_duration(), Duration::from_millis(20));

        let report = snapshot.format_report();
        assert!(report.contains("stub.messages.create"));
        assert!(report.contains("2 calls"));
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_call("site", Duration::from_millis(1), true);
        metrics.reset();
        assert!(metrics.call_metrics("site").is_none());
    }
}

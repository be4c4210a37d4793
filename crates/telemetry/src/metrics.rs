//! In-process run counters.
//!
//! Counters are process-wide atomics; a snapshot is logged when a batch run
//! finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Collected counters for the metrics engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Extraction
    pub events_fetched: Counter,
    pub events_malformed: Counter,
    pub fetch_errors: Counter,

    // Publication
    pub tables_published: Counter,
    pub rows_published: Counter,
    pub rows_suppressed: Counter,
    pub publish_errors: Counter,

    // Runs
    pub families_succeeded: Counter,
    pub families_failed: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_fetched: self.events_fetched.get(),
            events_malformed: self.events_malformed.get(),
            fetch_errors: self.fetch_errors.get(),
            tables_published: self.tables_published.get(),
            rows_published: self.rows_published.get(),
            rows_suppressed: self.rows_suppressed.get(),
            publish_errors: self.publish_errors.get(),
            families_succeeded: self.families_succeeded.get(),
            families_failed: self.families_failed.get(),
        }
    }
}

/// A snapshot of counters at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_fetched: u64,
    pub events_malformed: u64,
    pub fetch_errors: u64,
    pub tables_published: u64,
    pub rows_published: u64,
    pub rows_suppressed: u64,
    pub publish_errors: u64,
    pub families_succeeded: u64,
    pub families_failed: u64,
}

impl MetricsSnapshot {
    /// Share of fetched events excluded as malformed.
    pub fn malformed_ratio(&self) -> f64 {
        if self.events_fetched == 0 {
            0.0
        } else {
            self.events_malformed as f64 / self.events_fetched as f64
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

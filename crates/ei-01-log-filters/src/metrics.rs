//! Counters for log query execution
//!
//! Tracks how effective the bloom pre-filter is: how many heights were
//! probed, how many probes passed, and how many block reads followed.
//!
//! ## Usage
//!
//! ```ignore
//! use ei_01_log_filters::metrics::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.record_probe(true);
//! metrics.record_query(Duration::from_millis(3), 12);
//! let snapshot = metrics.snapshot();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe query counters.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Queries that produced a result
    pub queries_completed: AtomicU64,
    /// Queries rejected by a limit or an unknown block hash
    pub queries_rejected: AtomicU64,
    /// Bloom probes performed
    pub blooms_probed: AtomicU64,
    /// Probes that marked the block as a candidate
    pub bloom_hits: AtomicU64,
    /// Candidate blocks whose logs were read
    pub blocks_read: AtomicU64,
    /// Logs returned to callers
    pub logs_returned: AtomicU64,
    /// Cumulative query time in nanoseconds
    pub query_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one bloom probe.
    pub fn record_probe(&self, hit: bool) {
        self.blooms_probed.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.bloom_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_block_read(&self) {
        self.blocks_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed query.
    pub fn record_query(&self, duration: Duration, logs: usize) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
        self.logs_returned.fetch_add(logs as u64, Ordering::Relaxed);
        self.query_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.queries_completed.load(Ordering::Relaxed);
        let total_ns = self.query_time_ns.load(Ordering::Relaxed);
        MetricsSnapshot {
            queries_completed: completed,
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            blooms_probed: self.blooms_probed.load(Ordering::Relaxed),
            bloom_hits: self.bloom_hits.load(Ordering::Relaxed),
            blocks_read: self.blocks_read.load(Ordering::Relaxed),
            logs_returned: self.logs_returned.load(Ordering::Relaxed),
            avg_query_ns: if completed > 0 { total_ns / completed } else { 0 },
        }
    }

    /// Fraction of probes that passed the bloom.
    pub fn observed_hit_rate(&self) -> f64 {
        let probed = self.blooms_probed.load(Ordering::Relaxed);
        if probed == 0 {
            return 0.0;
        }
        self.bloom_hits.load(Ordering::Relaxed) as f64 / probed as f64
    }

    pub fn reset(&self) {
        self.queries_completed.store(0, Ordering::Relaxed);
        self.queries_rejected.store(0, Ordering::Relaxed);
        self.blooms_probed.store(0, Ordering::Relaxed);
        self.bloom_hits.store(0, Ordering::Relaxed);
        self.blocks_read.store(0, Ordering::Relaxed);
        self.logs_returned.store(0, Ordering::Relaxed);
        self.query_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_completed: u64,
    pub queries_rejected: u64,
    pub blooms_probed: u64,
    pub bloom_hits: u64,
    pub blocks_read: u64,
    pub logs_returned: u64,
    pub avg_query_ns: u64,
}

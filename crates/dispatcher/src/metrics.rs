//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Delivery counters of one sink, shared between its handle and worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    presented: AtomicU64,
    failed: AtomicU64,
    /// Rejected because the sink queue was full
    dropped: AtomicU64,
    /// Skipped because a newer snapshot was already queued behind it
    superseded: AtomicU64,
    last_generation: AtomicU64,
    queue_len: AtomicUsize,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_presented(&self, generation: u64) {
        self.presented.fetch_add(1, Ordering::Relaxed);
        self.last_generation.fetch_max(generation, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_superseded(&self, count: u64) {
        if count > 0 {
            self.superseded.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            presented: self.presented.load(Ordering::Relaxed),
            failed: self.failed(),
            dropped: self.dropped(),
            superseded: self.superseded.load(Ordering::Relaxed),
            last_generation: self.last_generation.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub presented: u64,
    pub failed: u64,
    pub dropped: u64,
    pub superseded: u64,
    /// Highest aggregator generation the sink presented
    pub last_generation: u64,
    pub queue_len: usize,
}

impl MetricsSnapshot {
    /// Snapshots that reached the worker (presented, failed or superseded)
    pub fn received(&self) -> u64 {
        self.presented + self.failed + self.superseded
    }
}

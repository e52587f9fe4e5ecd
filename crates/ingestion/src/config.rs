//! Queue configuration and ingestion metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::{OverflowPolicy, QueueConfig};

/// Ingestion metrics
///
/// Owned by one hub instance; nothing here is process-global.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Records accepted into the queue
    pub records_submitted: AtomicU64,

    /// Records lost to a full bounded queue
    pub overflow_dropped: AtomicU64,

    /// Records rejected because the queue was stopped
    pub rejected_after_stop: AtomicU64,

    /// Malformed wire payloads discarded
    pub decode_errors: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record accepted push
    pub fn record_submitted(&self) {
        self.records_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record overflow loss
    pub fn record_overflow(&self) {
        self.overflow_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record push after stop
    pub fn record_rejected(&self) {
        self.rejected_after_stop.fetch_add(1, Ordering::Relaxed);
    }

    /// Record decode error
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_submitted: self.records_submitted.load(Ordering::Relaxed),
            overflow_dropped: self.overflow_dropped.load(Ordering::Relaxed),
            rejected_after_stop: self.rejected_after_stop.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_submitted: u64,
    pub overflow_dropped: u64,
    pub rejected_after_stop: u64,
    pub decode_errors: u64,
    pub queue_len: usize,
}

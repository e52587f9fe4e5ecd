//! HandoffQueue - producer → aggregator FIFO
//!
//! Thin policy layer over `async-channel`: many producers push without
//! blocking, the single aggregator pops (async or blocking), and `stop()`
//! closes the channel while still letting already-queued records drain.

use std::sync::Arc;

use async_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use contracts::SensorRecord;
use tracing::{debug, info, trace, warn};

use crate::config::{IngestionMetrics, OverflowPolicy, QueueConfig};
use crate::error::{IngestionError, Result};

/// Thread-safe FIFO hand-off between producers and the aggregator
///
/// Cloning is cheap and every clone refers to the same queue.
#[derive(Debug, Clone)]
pub struct HandoffQueue {
    tx: Sender<SensorRecord>,
    /// Consumer end; also used to evict under `DropOldest`
    rx: Receiver<SensorRecord>,
    overflow: OverflowPolicy,
    metrics: Arc<IngestionMetrics>,
}

impl HandoffQueue {
    /// Create a queue from configuration
    pub fn new(config: QueueConfig) -> Self {
        Self::with_metrics(config, Arc::new(IngestionMetrics::new()))
    }

    /// Create a queue reporting into shared metrics
    pub fn with_metrics(config: QueueConfig, metrics: Arc<IngestionMetrics>) -> Self {
        let (tx, rx) = match config.capacity {
            Some(capacity) => bounded(capacity),
            None => unbounded(),
        };

        Self {
            tx,
            rx,
            overflow: config.overflow_policy,
            metrics,
        }
    }

    /// Unbounded queue: `push` never fails while running
    pub fn unbounded() -> Self {
        Self::new(QueueConfig::default())
    }

    /// Bounded queue with an explicit overflow policy
    pub fn bounded(capacity: usize, overflow_policy: OverflowPolicy) -> Self {
        Self::new(QueueConfig {
            capacity: Some(capacity),
            overflow_policy,
        })
    }

    /// Insert a record without blocking
    ///
    /// # Errors
    /// - `QueueStopped` after `stop()`
    /// - `QueueFull` when bounded, full, and the policy is `DropNewest`
    pub fn push(&self, record: SensorRecord) -> Result<()> {
        let mut pending = record;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    self.metrics.record_submitted();
                    self.metrics.update_queue_len(self.tx.len());
                    return Ok(());
                }
                Err(TrySendError::Closed(rejected)) => {
                    self.metrics.record_rejected();
                    debug!(
                        source_id = %rejected.source_id,
                        sequence = rejected.sequence,
                        "push after stop rejected"
                    );
                    return Err(IngestionError::QueueStopped {
                        source_id: rejected.source_id,
                        sequence: rejected.sequence,
                    });
                }
                Err(TrySendError::Full(rejected)) => match self.overflow {
                    OverflowPolicy::DropNewest => {
                        self.metrics.record_overflow();
                        warn!(
                            source_id = %rejected.source_id,
                            sequence = rejected.sequence,
                            "handoff queue full, record dropped (newest)"
                        );
                        return Err(IngestionError::QueueFull {
                            source_id: rejected.source_id,
                            sequence: rejected.sequence,
                        });
                    }
                    OverflowPolicy::DropOldest => {
                        if let Ok(evicted) = self.rx.try_recv() {
                            self.metrics.record_overflow();
                            warn!(
                                source_id = %evicted.source_id,
                                sequence = evicted.sequence,
                                "handoff queue full, record dropped (oldest)"
                            );
                        }
                        pending = rejected;
                    }
                },
            }
        }
    }

    /// Wait for the next record
    ///
    /// Returns `None` once the queue is stopped and fully drained.
    pub async fn pop(&self) -> Option<SensorRecord> {
        let record = self.rx.recv().await.ok();
        self.metrics.update_queue_len(self.rx.len());
        record
    }

    /// Blocking variant of [`pop`](Self::pop) for non-async consumers
    pub fn pop_blocking(&self) -> Option<SensorRecord> {
        let record = self.rx.recv_blocking().ok();
        self.metrics.update_queue_len(self.rx.len());
        record
    }

    /// Close the queue and wake every blocked consumer
    ///
    /// Idempotent. Returns true only for the call that actually closed it.
    pub fn stop(&self) -> bool {
        let closed = self.tx.close();
        if closed {
            info!(pending = self.rx.len(), "handoff queue stopped");
        } else {
            trace!("handoff queue already stopped");
        }
        closed
    }

    /// True once `stop()` has been called
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Records currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Capacity (None = unbounded)
    pub fn capacity(&self) -> Option<usize> {
        self.tx.capacity()
    }

    /// Shared metrics
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;
    use std::time::Duration;

    fn record(source: i64, sequence: u64) -> SensorRecord {
        SensorRecord::new(source, sequence as f64, 0, sequence)
    }

    #[test]
    fn test_basic_push_pop() {
        let queue = HandoffQueue::unbounded();
        queue.push(record(0, 42)).unwrap();

        let popped = queue.pop_blocking().unwrap();
        assert_eq!(popped.sequence, 42);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let queue = HandoffQueue::unbounded();
        for seq in 0..5 {
            queue.push(record(seq as i64 % 2, seq)).unwrap();
        }
        queue.stop();

        let order: Vec<u64> = std::iter::from_fn(|| queue.pop_blocking())
            .map(|r| r.sequence)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stop_drains_before_reporting_stopped() {
        let queue = HandoffQueue::unbounded();
        queue.push(record(1, 0)).unwrap();
        queue.push(record(1, 1)).unwrap();
        assert!(queue.stop());

        assert_eq!(queue.pop_blocking().map(|r| r.sequence), Some(0));
        assert_eq!(queue.pop_blocking().map(|r| r.sequence), Some(1));
        assert!(queue.pop_blocking().is_none());
        // Deterministic after full drain
        assert!(queue.pop_blocking().is_none());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let queue = HandoffQueue::unbounded();
        assert!(queue.stop());
        assert!(!queue.stop());
        assert!(queue.is_stopped());
    }

    #[test]
    fn test_push_after_stop_rejected() {
        let queue = HandoffQueue::unbounded();
        queue.stop();

        let result = queue.push(record(3, 9));
        assert!(matches!(
            result,
            Err(IngestionError::QueueStopped { sequence: 9, .. })
        ));
        assert_eq!(queue.metrics().snapshot().rejected_after_stop, 1);
    }

    #[test]
    fn test_stop_wakes_blocked_consumer() {
        let queue = HandoffQueue::unbounded();
        let consumer_queue = queue.clone();
        let consumer = thread::spawn(move || consumer_queue.pop_blocking());

        thread::sleep(Duration::from_millis(50));
        queue.stop();

        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn test_multi_threaded_push() {
        let queue = HandoffQueue::unbounded();
        let count = Arc::new(AtomicU64::new(0));

        let consumer_queue = queue.clone();
        let consumer_count = count.clone();
        let consumer = thread::spawn(move || {
            while consumer_queue.pop_blocking().is_some() {
                consumer_count.fetch_add(1, Ordering::Relaxed);
            }
        });

        let producers: Vec<_> = (0..10)
            .map(|p| {
                let q = queue.clone();
                thread::spawn(move || {
                    for seq in 0..10 {
                        q.push(record(p, seq)).unwrap();
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        queue.stop();
        consumer.join().unwrap();

        assert_eq!(count.load(Ordering::Relaxed), 100);
        assert_eq!(queue.metrics().snapshot().records_submitted, 100);
    }

    #[test]
    fn test_bounded_drop_newest() {
        let queue = HandoffQueue::bounded(2, OverflowPolicy::DropNewest);
        queue.push(record(0, 0)).unwrap();
        queue.push(record(0, 1)).unwrap();

        let result = queue.push(record(0, 2));
        assert!(matches!(
            result,
            Err(IngestionError::QueueFull { sequence: 2, .. })
        ));

        queue.stop();
        let kept: Vec<u64> = std::iter::from_fn(|| queue.pop_blocking())
            .map(|r| r.sequence)
            .collect();
        assert_eq!(kept, vec![0, 1]);
        assert_eq!(queue.metrics().snapshot().overflow_dropped, 1);
    }

    #[test]
    fn test_bounded_drop_oldest() {
        let queue = HandoffQueue::bounded(2, OverflowPolicy::DropOldest);
        for seq in 0..4 {
            queue.push(record(0, seq)).unwrap();
        }

        queue.stop();
        let kept: Vec<u64> = std::iter::from_fn(|| queue.pop_blocking())
            .map(|r| r.sequence)
            .collect();
        assert_eq!(kept, vec![2, 3]);
        assert_eq!(queue.metrics().snapshot().overflow_dropped, 2);
        assert_eq!(queue.capacity(), Some(2));
    }

    #[tokio::test]
    async fn test_async_pop_drains_then_stops() {
        let queue = HandoffQueue::unbounded();
        queue.push(record(5, 10)).unwrap();
        queue.stop();

        assert_eq!(queue.pop().await.map(|r| r.sequence), Some(10));
        assert!(queue.pop().await.is_none());
    }
}

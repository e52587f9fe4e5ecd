//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! Snapshots are full aggregate state, so a worker that falls behind skips
//! straight to the newest queued snapshot instead of replaying stale ones.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace, warn};

use contracts::{AggregateSnapshot, PresentationSink};

use crate::metrics::{MetricsSnapshot, SinkMetrics};

pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<AggregateSnapshot>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink` with a queue of `queue_capacity` (at least 1)
    pub fn spawn<S: PresentationSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker = tokio::spawn(sink_worker(sink, rx, metrics.clone()));

        Self {
            name,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a snapshot without waiting
    ///
    /// Returns false when the queue is full (the snapshot is counted as
    /// dropped) or the worker is gone.
    pub fn offer(&self, snapshot: AggregateSnapshot) -> bool {
        match self.tx.try_send(snapshot) {
            Ok(()) => {
                self.metrics
                    .set_queue_len(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(TrySendError::Full(rejected)) => {
                self.metrics.record_dropped();
                warn!(
                    sink = %self.name,
                    generation = rejected.generation,
                    "sink queue full, snapshot dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!(sink = %self.name, "sink worker exited unexpectedly");
                false
            }
        }
    }

    /// Close the queue, let the worker present what is left, flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) -> MetricsSnapshot {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = %e, "sink worker panicked");
        }
        self.metrics.snapshot()
    }
}

/// Take the newest snapshot currently queued, counting the ones it replaces
fn latest(
    mut snapshot: AggregateSnapshot,
    rx: &mut mpsc::Receiver<AggregateSnapshot>,
) -> (AggregateSnapshot, u64) {
    let mut skipped = 0;
    while let Ok(newer) = rx.try_recv() {
        snapshot = newer;
        skipped += 1;
    }
    (snapshot, skipped)
}

async fn sink_worker<S: PresentationSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<AggregateSnapshot>,
    metrics: Arc<SinkMetrics>,
) {
    let name = sink.name().to_string();
    debug!(sink = %name, "sink worker started");

    while let Some(queued) = rx.recv().await {
        let (snapshot, skipped) = latest(queued, &mut rx);
        metrics.record_superseded(skipped);
        metrics.set_queue_len(0);
        if skipped > 0 {
            trace!(sink = %name, skipped, "stale snapshots superseded");
        }

        match sink.present(&snapshot).await {
            Ok(()) => {
                metrics.record_presented(snapshot.generation);
                observability::record_snapshot_dispatched(&name, true);
            }
            Err(e) => {
                // A failing sink keeps receiving later snapshots
                metrics.record_failure();
                observability::record_snapshot_dispatched(&name, false);
                error!(sink = %name, generation = snapshot.generation, error = %e, "present failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "close failed on shutdown");
    }
    debug!(sink = %name, "sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct Recorder {
        generations: Mutex<Vec<u64>>,
        flushed: Mutex<bool>,
    }

    struct MockSink {
        recorder: Arc<Recorder>,
        fail: bool,
        delay: Duration,
    }

    impl MockSink {
        fn new(recorder: Arc<Recorder>) -> Self {
            Self {
                recorder,
                fail: false,
                delay: Duration::ZERO,
            }
        }
    }

    impl PresentationSink for MockSink {
        fn name(&self) -> &str {
            "mock"
        }

        async fn present(&mut self, snapshot: &AggregateSnapshot) -> Result<(), ContractError> {
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.fail {
                return Err(ContractError::sink_write("mock", "mock failure"));
            }
            self.recorder.generations.lock().unwrap().push(snapshot.generation);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            *self.recorder.flushed.lock().unwrap() = true;
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    fn snapshot(generation: u64) -> AggregateSnapshot {
        AggregateSnapshot {
            generation,
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_skips_to_newest() {
        let (tx, mut rx) = mpsc::channel(8);
        for generation in [2, 3, 4] {
            tx.try_send(snapshot(generation)).unwrap();
        }

        let (newest, skipped) = latest(snapshot(1), &mut rx);
        assert_eq!(newest.generation, 4);
        assert_eq!(skipped, 3);
    }

    #[tokio::test]
    async fn test_every_offered_snapshot_is_accounted_for() {
        let recorder = Arc::new(Recorder::default());
        let handle = SinkHandle::spawn(MockSink::new(recorder.clone()), 10);

        for generation in 1..=5 {
            assert!(handle.offer(snapshot(generation)));
        }

        let metrics = handle.shutdown().await;
        assert_eq!(metrics.received(), 5);
        assert_eq!(metrics.last_generation, 5);
        assert!(*recorder.flushed.lock().unwrap());

        // Newest snapshot is always presented, in increasing order
        let generations = recorder.generations.lock().unwrap();
        assert_eq!(generations.last(), Some(&5));
        assert!(generations.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let sink = MockSink {
            delay: Duration::from_millis(100),
            ..MockSink::new(Arc::new(Recorder::default()))
        };
        let handle = SinkHandle::spawn(sink, 2);

        let accepted = (1..=10).filter(|g| handle.offer(snapshot(*g))).count() as u64;

        assert!(handle.metrics().dropped() > 0);
        let metrics = handle.shutdown().await;
        assert_eq!(metrics.dropped + accepted, 10);
    }

    #[tokio::test]
    async fn test_failing_sink_keeps_running() {
        let sink = MockSink {
            fail: true,
            ..MockSink::new(Arc::new(Recorder::default()))
        };
        let handle = SinkHandle::spawn(sink, 10);

        for generation in 1..=3 {
            assert!(handle.offer(snapshot(generation)));
            sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(handle.metrics().failed(), 3);
        let metrics = handle.shutdown().await;
        assert_eq!(metrics.presented, 0);
    }
}

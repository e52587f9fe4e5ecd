//! TelemetryHub - lifecycle-owning context
//!
//! Ties one handoff queue to one aggregator and runs two background tasks:
//! the ingest loop and an optional throttled presenter that forwards
//! snapshots to a channel (usually a `dispatcher::Dispatcher`). The ingest
//! loop can also copy each record to a tap channel for per-record logging.

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    AggregateSnapshot, DedupPolicy, HubBlueprint, QueueConfig, ReceivedRecord, SensorRecord,
};
use ingestion::{HandoffQueue, IngestionMetrics, TransportAdapter};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

use crate::engine::Aggregator;
use crate::error::{HubError, Result};
use crate::summary::FinalSummary;
use crate::throttle::{Throttle, DEFAULT_REFRESH_INTERVAL};

enum Lifecycle {
    Idle,
    Running {
        ingest: JoinHandle<u64>,
        presenter: Option<JoinHandle<u64>>,
    },
    Stopped,
}

/// Telemetry hub
///
/// # Example
///
/// ```ignore
/// let hub = TelemetryHub::from_blueprint(&blueprint);
/// hub.start_with_presenter(snapshot_tx).await?;
///
/// hub.submit(SensorRecord::new(0, 21.5, unix_millis_now(), 0))?;
///
/// hub.shutdown().await?;
/// println!("{}", hub.summary());
/// ```
pub struct TelemetryHub {
    queue: HandoffQueue,
    aggregator: Arc<Aggregator>,
    refresh_interval: Duration,
    lifecycle: Mutex<Lifecycle>,
    shutdown_tx: watch::Sender<bool>,
}

impl TelemetryHub {
    /// Create a hub
    pub fn new(queue: QueueConfig, dedup: DedupPolicy, refresh_interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            queue: HandoffQueue::new(queue),
            aggregator: Arc::new(Aggregator::new(dedup)),
            refresh_interval,
            lifecycle: Mutex::new(Lifecycle::Idle),
            shutdown_tx,
        }
    }

    /// Create a hub from blueprint settings
    pub fn from_blueprint(blueprint: &HubBlueprint) -> Self {
        Self::new(
            blueprint.queue,
            blueprint.aggregator.dedup_policy(),
            blueprint.presentation.refresh_interval(),
        )
    }

    /// Start ingestion without presentation
    pub async fn start(&self) -> Result<()> {
        self.start_with(HubOutputs::default()).await
    }

    /// Start ingestion and forward throttled snapshots to `snapshot_tx`
    pub async fn start_with_presenter(
        &self,
        snapshot_tx: mpsc::Sender<AggregateSnapshot>,
    ) -> Result<()> {
        self.start_with(HubOutputs::default().snapshots(snapshot_tx))
            .await
    }

    /// Start ingestion with the given output channels
    #[instrument(name = "hub_start", skip_all)]
    pub async fn start_with(&self, outputs: HubOutputs) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match *lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running { .. } => return Err(HubError::AlreadyStarted),
            Lifecycle::Stopped => return Err(HubError::AlreadyShutDown),
        }

        let HubOutputs { snapshots, records } = outputs;
        let record_tap = records.is_some();

        let ingest = {
            let aggregator = self.aggregator.clone();
            let queue = self.queue.clone();
            // The tap sender drops with the task, closing the record channel
            tokio::spawn(async move { aggregator.ingest_with_tap(&queue, records.as_ref()).await })
        };

        let presenter = snapshots.map(|tx| {
            let aggregator = self.aggregator.clone();
            let interval = self.refresh_interval;
            let shutdown_rx = self.shutdown_tx.subscribe();
            tokio::spawn(present_loop(aggregator, interval, tx, shutdown_rx))
        });

        info!(
            presenter = presenter.is_some(),
            record_tap,
            refresh_ms = self.refresh_interval.as_millis() as u64,
            "telemetry hub started"
        );

        *lifecycle = Lifecycle::Running { ingest, presenter };
        Ok(())
    }

    /// Hand one record to the aggregator; never blocks
    #[inline]
    pub fn submit(&self, record: SensorRecord) -> ingestion::Result<()> {
        self.queue.push(record)
    }

    /// Queue handle for producers living outside the hub
    pub fn submitter(&self) -> HandoffQueue {
        self.queue.clone()
    }

    /// Wire-format entry point for transport integrations
    pub fn transport(&self) -> TransportAdapter {
        TransportAdapter::new(self.queue.clone())
    }

    /// Drain and stop
    ///
    /// Stops the queue, waits until every queued record has been aggregated,
    /// then stops the presenter after one last snapshot. Idempotent;
    /// concurrent callers all return only after ingestion has finished.
    /// Producers should be stopped first, their later records are rejected.
    ///
    /// Cancel safe: the background tasks stay owned by the hub until they
    /// have been joined, so a dropped call leaves the next one to finish.
    #[instrument(name = "hub_shutdown", skip_all)]
    pub async fn shutdown(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.queue.stop();

        let joined = match &mut *lifecycle {
            Lifecycle::Stopped => {
                trace!("telemetry hub already shut down");
                return Ok(());
            }
            // Never started: drain inline so queued records still count
            Lifecycle::Idle => Ok(self.aggregator.ingest(&self.queue).await),
            Lifecycle::Running { ingest, .. } => ingest.await,
        };

        // Ingest is done; leave Running before the next await point
        let presenter = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running { presenter, .. } => presenter,
            _ => None,
        };

        let _ = self.shutdown_tx.send(true);
        let consumed = joined.map_err(|e| HubError::TaskFailed {
            task: "ingest",
            message: e.to_string(),
        })?;

        let presented = match presenter {
            Some(handle) => handle.await.map_err(|e| HubError::TaskFailed {
                task: "presenter",
                message: e.to_string(),
            })?,
            None => 0,
        };

        info!(consumed, presented, "telemetry hub shut down");
        Ok(())
    }

    /// Current aggregate state
    pub fn snapshot(&self) -> AggregateSnapshot {
        self.aggregator.snapshot()
    }

    /// Summary of the current aggregate state
    pub fn summary(&self) -> FinalSummary {
        self.aggregator.summary()
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    pub fn queue(&self) -> &HandoffQueue {
        &self.queue
    }

    pub fn ingestion_metrics(&self) -> Arc<IngestionMetrics> {
        self.queue.metrics()
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(
            QueueConfig::default(),
            DedupPolicy::default(),
            DEFAULT_REFRESH_INTERVAL,
        )
    }
}

impl Drop for TelemetryHub {
    fn drop(&mut self) {
        // Lets detached tasks finish if shutdown() was never awaited
        self.queue.stop();
        let _ = self.shutdown_tx.send(true);
    }
}

/// Output channels wired at start
#[derive(Debug, Default)]
pub struct HubOutputs {
    snapshots: Option<mpsc::Sender<AggregateSnapshot>>,
    records: Option<mpsc::Sender<ReceivedRecord>>,
}

impl HubOutputs {
    /// Throttled snapshots, usually consumed by a `dispatcher::Dispatcher`
    pub fn snapshots(mut self, tx: mpsc::Sender<AggregateSnapshot>) -> Self {
        self.snapshots = Some(tx);
        self
    }

    /// A copy of every consumed record, closed once ingestion finishes
    pub fn records(mut self, tx: mpsc::Sender<ReceivedRecord>) -> Self {
        self.records = Some(tx);
        self
    }
}

/// Periodically offer a snapshot to the presentation channel
///
/// On shutdown a last snapshot goes out if anything arrived since the
/// previous one.
async fn present_loop(
    aggregator: Arc<Aggregator>,
    interval: Duration,
    tx: mpsc::Sender<AggregateSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    let mut throttle = Throttle::new(interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut presented = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !throttle.should_emit(Instant::now(), aggregator.generation()) {
                    continue;
                }
                match offer(&aggregator, &tx) {
                    Ok(true) => presented += 1,
                    Ok(false) => {}
                    Err(()) => break,
                }
            }
            _ = shutdown_rx.changed() => {
                if throttle.flush(Instant::now(), aggregator.generation())
                    && offer(&aggregator, &tx) == Ok(true)
                {
                    presented += 1;
                }
                break;
            }
        }
    }

    debug!(presented, "presenter stopped");
    presented
}

/// Send the current snapshot without waiting; `Err` once the receiver is gone
fn offer(
    aggregator: &Aggregator,
    tx: &mpsc::Sender<AggregateSnapshot>,
) -> std::result::Result<bool, ()> {
    let snapshot = aggregator.snapshot();
    observability::record_snapshot_metrics(&snapshot);

    match tx.try_send(snapshot) {
        Ok(()) => Ok(true),
        Err(TrySendError::Full(_)) => {
            warn!("presentation channel full, snapshot skipped");
            Ok(false)
        }
        Err(TrySendError::Closed(_)) => {
            debug!("presentation channel closed");
            Err(())
        }
    }
}

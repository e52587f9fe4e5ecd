//! Pipeline orchestrator - coordinates all components.
//!
//! Simulated sources → handoff queue → aggregator → presenter → dispatcher,
//! with an optional record log fed straight from the aggregator.

use std::future::Future;
use std::time::{Duration, Instant};

use aggregator::{HubOutputs, TelemetryHub};
use anyhow::{Context, Result};
use contracts::{AggregateSnapshot, HubBlueprint, ReceivedRecord};
use dispatcher::{RecordLog, RecordLogStats};
use ingestion::IngestionPipeline;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// How long to wait for sinks to flush after the hub stopped
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The hub blueprint configuration
    pub blueprint: HubBlueprint,

    /// Run duration (None = until shutdown signal)
    pub duration: Option<Duration>,

    /// Presenter → dispatcher channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves or the configured duration elapses
    ///
    /// Shutdown order: stop producers, drain the hub, then let the
    /// dispatcher flush its sinks.
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Hub
        let hub = TelemetryHub::from_blueprint(blueprint);
        info!(
            queue_capacity = ?blueprint.queue.capacity,
            dedup = ?blueprint.aggregator.dedup_policy(),
            "Telemetry hub configured"
        );

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (snapshot_tx, snapshot_rx) =
            mpsc::channel::<AggregateSnapshot>(self.config.buffer_size.max(1));

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - snapshots will be dropped");
        }

        let dispatcher = dispatcher::create_dispatcher(&blueprint.sinks, snapshot_rx)
            .context("Failed to create dispatcher")?;
        let active_sinks = dispatcher.sink_count();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        let mut outputs = HubOutputs::default().snapshots(snapshot_tx);
        let record_log_handle = match &blueprint.record_log {
            Some(log_config) => {
                let log = RecordLog::open(log_config.clone()).with_context(|| {
                    format!("Failed to open record log {}", log_config.path.display())
                })?;
                let (record_tx, record_rx) =
                    mpsc::channel::<ReceivedRecord>(log_config.queue_capacity.max(1));
                outputs = outputs.records(record_tx);
                info!(path = %log_config.path.display(), "Record log started");
                Some(log.spawn(record_rx))
            }
            None => None,
        };

        hub.start_with(outputs)
            .await
            .map_err(CliError::HubStart)?;

        // Setup Ingestion Pipeline
        let ingestion = IngestionPipeline::with_mock_sources(hub.submitter(), &blueprint.sources);
        let active_sources = ingestion.source_count();
        ingestion.start_all();

        info!(
            active_sources,
            duration = ?self.config.duration,
            "Pipeline running"
        );

        match self.config.duration {
            Some(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {
                        info!(duration_secs = duration.as_secs(), "Run duration reached");
                    }
                    _ = shutdown => {}
                }
            }
            None => shutdown.await,
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        hub.shutdown()
            .await
            .map_err(CliError::HubShutdown)?;

        // Presenter dropped its sender; wait for sinks to flush
        let sink_metrics =
            match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
                Ok(Ok(metrics)) => metrics,
                Ok(Err(e)) => {
                    warn!(error = %e, "Dispatcher task failed");
                    Vec::new()
                }
                Err(_) => {
                    warn!("Timed out waiting for dispatcher to flush");
                    Vec::new()
                }
            };

        // Ingest task dropped the record sender; wait for the last rows
        let record_log = match record_log_handle {
            Some(handle) => drain_record_log(handle).await,
            None => None,
        };

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            active_sources,
            active_sinks,
            summary: hub.summary(),
            counters: hub.aggregator().counters(),
            ingestion: hub.ingestion_metrics().snapshot(),
            sink_metrics,
            record_log,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.records_per_second()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

async fn drain_record_log(handle: JoinHandle<RecordLogStats>) -> Option<RecordLogStats> {
    match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(e)) => {
            warn!(error = %e, "Record log task failed");
            None
        }
        Err(_) => {
            warn!("Timed out waiting for record log to flush");
            None
        }
    }
}

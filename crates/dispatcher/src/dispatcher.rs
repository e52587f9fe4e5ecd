//! Dispatcher - fans aggregate snapshots out to every configured sink

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace};

use contracts::{AggregateSnapshot, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{CsvSink, LogSink};

/// Open the sink described by `config` and start its worker
#[instrument(
    name = "dispatcher_open_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::Csv => {
            let sink = CsvSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, config.sink_type, e))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };
    debug!(capacity = config.queue_capacity, "sink opened");
    Ok(handle)
}

/// Snapshot fan-out
///
/// Every sink gets its own bounded queue, so a slow or failing sink only
/// loses its own snapshots. Runs until the input channel closes.
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<AggregateSnapshot>,
}

impl Dispatcher {
    /// Open every configured sink
    ///
    /// Must be called inside a tokio runtime (sink workers are spawned).
    pub fn from_configs(
        configs: &[SinkConfig],
        input_rx: mpsc::Receiver<AggregateSnapshot>,
    ) -> Result<Self, DispatcherError> {
        let mut names = HashSet::with_capacity(configs.len());
        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            if !names.insert(config.name.as_str()) {
                return Err(DispatcherError::DuplicateSink(config.name.clone()));
            }
            handles.push(open_sink(config)?);
        }
        Ok(Self::with_handles(handles, input_rx))
    }

    pub fn with_handles(handles: Vec<SinkHandle>, input_rx: mpsc::Receiver<AggregateSnapshot>) -> Self {
        Self { handles, input_rx }
    }

    pub fn sink_count(&self) -> usize {
        self.handles.len()
    }

    /// Live metrics of every sink
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Forward snapshots until the input closes, then shut every sink down
    ///
    /// Snapshots whose generation does not advance past the last forwarded
    /// one carry no new data and are not forwarded. Returns the final
    /// per-sink metrics.
    #[instrument(name = "dispatcher_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> Vec<(String, MetricsSnapshot)> {
        info!("dispatcher started");

        let mut forwarded = 0u64;
        let mut last_generation = None;

        while let Some(snapshot) = self.input_rx.recv().await {
            if last_generation.is_some_and(|last| snapshot.generation <= last) {
                trace!(generation = snapshot.generation, "snapshot without new data skipped");
                continue;
            }
            last_generation = Some(snapshot.generation);
            forwarded += 1;

            if let Some((last, rest)) = self.handles.split_last() {
                for handle in rest {
                    handle.offer(snapshot.clone());
                }
                last.offer(snapshot);
            }
        }

        info!(forwarded, "dispatcher input closed, shutting down sinks");

        let mut metrics = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            let name = handle.name().to_string();
            metrics.push((name, handle.shutdown().await));
        }
        metrics
    }

    pub fn spawn(self) -> JoinHandle<Vec<(String, MetricsSnapshot)>> {
        tokio::spawn(self.run())
    }
}

/// Build a dispatcher from the `[[sinks]]` section of a blueprint
pub fn create_dispatcher(
    sink_configs: &[SinkConfig],
    input_rx: mpsc::Receiver<AggregateSnapshot>,
) -> Result<Dispatcher, DispatcherError> {
    Dispatcher::from_configs(sink_configs, input_rx)
}

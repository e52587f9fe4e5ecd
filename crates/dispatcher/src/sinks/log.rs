//! LogSink - one structured event per changed source

use std::collections::HashMap;

use contracts::{AggregateSnapshot, ContractError, PresentationSink, SourceId};
use tracing::{debug, info, instrument};

/// Sink that renders snapshots as `tracing` events
///
/// Sources whose message count did not move since the previous snapshot are
/// not logged again.
pub struct LogSink {
    name: String,
    last_counts: HashMap<SourceId, u64>,
    events: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_counts: HashMap::new(),
            events: 0,
        }
    }

    /// Sensor update events emitted so far
    pub fn events(&self) -> u64 {
        self.events
    }

    fn log_snapshot(&mut self, snapshot: &AggregateSnapshot) {
        for (source_id, stats) in &snapshot.sources {
            let previous = self.last_counts.insert(*source_id, stats.message_count);
            if previous == Some(stats.message_count) {
                continue;
            }

            info!(
                sink = %self.name,
                source_id = %source_id,
                value = stats.current_value,
                min = stats.min_value,
                max = stats.max_value,
                avg = format!("{:.3}", stats.average()),
                count = stats.message_count,
                dropped = stats.dropped_count,
                "sensor update"
            );
            self.events += 1;
        }
    }
}

impl PresentationSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_present",
        skip(self, snapshot),
        fields(sink = %self.name, generation = snapshot.generation)
    )]
    async fn present(&mut self, snapshot: &AggregateSnapshot) -> Result<(), ContractError> {
        self.log_snapshot(snapshot);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, events = self.events, "LogSink closed");
        Ok(())
    }
}

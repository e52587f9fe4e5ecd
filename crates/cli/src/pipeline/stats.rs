//! Pipeline statistics and metrics.

use std::time::Duration;

use aggregator::{CountersSnapshot, FinalSummary};
use dispatcher::MetricsSnapshot as SinkMetricsSnapshot;
use dispatcher::RecordLogStats;
use ingestion::MetricsSnapshot as IngestionSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of sources that were active
    pub active_sources: usize,

    /// Number of sinks configured
    pub active_sinks: usize,

    /// Final per-source summary
    pub summary: FinalSummary,

    /// Aggregator counters
    pub counters: CountersSnapshot,

    /// Handoff queue counters
    pub ingestion: IngestionSnapshot,

    /// Per-sink delivery counters
    pub sink_metrics: Vec<(String, SinkMetricsSnapshot)>,

    /// Record log totals (None = disabled or the task failed)
    pub record_log: Option<RecordLogStats>,
}

impl PipelineStats {
    /// Accepted records per second
    pub fn records_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.total_messages as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records accepted: {}", self.counters.accepted);
        println!("   ├─ Records/s: {:.2}", self.records_per_second());
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\nSequence Tracking");
        println!("   ├─ Gaps: {}", self.counters.gaps);
        println!("   ├─ Dropped messages: {}", self.counters.dropped);
        println!("   ├─ Late records: {}", self.counters.late);
        println!("   └─ Duplicates discarded: {}", self.counters.duplicates);

        println!("\nHandoff Queue");
        println!("   ├─ Submitted: {}", self.ingestion.records_submitted);
        println!("   ├─ Overflow dropped: {}", self.ingestion.overflow_dropped);
        println!("   ├─ Rejected after stop: {}", self.ingestion.rejected_after_stop);
        println!("   └─ Decode errors: {}", self.ingestion.decode_errors);

        if !self.sink_metrics.is_empty() {
            println!("\nSinks");
            for (name, m) in &self.sink_metrics {
                println!(
                    "   ├─ {}: presented={}, superseded={}, failed={}, dropped={}",
                    name, m.presented, m.superseded, m.failed, m.dropped
                );
            }
        }

        if let Some(log) = &self.record_log {
            println!("\nRecord Log");
            println!("   ├─ Rows written: {}", log.written);
            println!("   ├─ Write errors: {}", log.write_errors);
            println!("   └─ Tap overflow: {}", self.counters.tap_dropped);
        }

        println!("\n{}", self.summary);
    }
}

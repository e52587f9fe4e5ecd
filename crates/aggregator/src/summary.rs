//! Final summary printed at shutdown.

use std::fmt;

use contracts::{AggregateSnapshot, SourceId};

/// Per-source line of the final summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSummary {
    pub source_id: SourceId,
    pub messages: u64,
    pub dropped: u64,
    pub duplicates: u64,
    pub late: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub drop_rate: f64,
}

/// Summary of the final aggregate state
///
/// A pure function of the snapshot it was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalSummary {
    pub generation: u64,
    pub total_messages: u64,
    pub total_dropped: u64,
    pub total_duplicates: u64,
    /// Ordered by source id
    pub sources: Vec<SourceSummary>,
}

impl FinalSummary {
    pub fn get(&self, source_id: impl Into<SourceId>) -> Option<&SourceSummary> {
        let source_id = source_id.into();
        self.sources.iter().find(|s| s.source_id == source_id)
    }

    /// Dropped as a percentage of accepted + dropped
    pub fn drop_rate(&self) -> f64 {
        let total = self.total_messages + self.total_dropped;
        if total > 0 {
            self.total_dropped as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

impl From<&AggregateSnapshot> for FinalSummary {
    fn from(snapshot: &AggregateSnapshot) -> Self {
        let sources: Vec<SourceSummary> = snapshot
            .sources
            .iter()
            .map(|(id, stats)| SourceSummary {
                source_id: *id,
                messages: stats.message_count,
                dropped: stats.dropped_count,
                duplicates: stats.duplicate_count,
                late: stats.late_count,
                min: stats.min_value,
                max: stats.max_value,
                avg: stats.average(),
                drop_rate: stats.drop_rate(),
            })
            .collect();

        Self {
            generation: snapshot.generation,
            total_messages: snapshot.total_messages(),
            total_dropped: snapshot.total_dropped(),
            total_duplicates: sources.iter().map(|s| s.duplicates).sum(),
            sources,
        }
    }
}

impl fmt::Display for FinalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Telemetry Summary ===")?;
        writeln!(f, "Sources: {}", self.sources.len())?;
        writeln!(f, "Messages: {}", self.total_messages)?;
        writeln!(
            f,
            "Dropped messages: {} ({:.2}%)",
            self.total_dropped,
            self.drop_rate()
        )?;
        writeln!(f, "Duplicates discarded: {}", self.total_duplicates)?;

        for s in &self.sources {
            writeln!(
                f,
                "  sensor {}: messages={}, dropped={}, min={:.3}, max={:.3}, avg={:.3}",
                s.source_id, s.messages, s.dropped, s.min, s.max, s.avg
            )?;
        }

        Ok(())
    }
}

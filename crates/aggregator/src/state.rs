//! Per-source aggregate state.

use contracts::{DedupPolicy, SensorRecord, SourceStats};

use crate::tracker::{SequenceTracker, Verdict};

/// State of one source, owned by the aggregator
///
/// Created lazily on the first record of the source.
#[derive(Debug)]
pub struct SourceState {
    tracker: SequenceTracker,
    stats: SourceStats,
}

impl SourceState {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            tracker: SequenceTracker::new(policy),
            stats: SourceStats::default(),
        }
    }

    /// Apply one record; duplicates leave value statistics untouched
    pub fn apply(&mut self, record: &SensorRecord) -> Verdict {
        let verdict = self.tracker.observe(record.sequence);

        match verdict {
            Verdict::Duplicate => {
                self.stats.duplicate_count += 1;
                return verdict;
            }
            Verdict::Gap { missed } => self.stats.dropped_count += missed,
            Verdict::Late { .. } => self.stats.late_count += 1,
            Verdict::First | Verdict::InOrder => {}
        }

        let value = record.value;
        if self.stats.message_count == 0 {
            self.stats.min_value = value;
            self.stats.max_value = value;
        } else {
            self.stats.min_value = self.stats.min_value.min(value);
            self.stats.max_value = self.stats.max_value.max(value);
        }
        self.stats.current_value = value;
        self.stats.sum_value += value;
        self.stats.message_count += 1;
        self.stats.last_timestamp = record.timestamp;

        verdict
    }

    /// Statistics readout
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            expected_sequence: self.tracker.expected_sequence(),
            ..self.stats
        }
    }

    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }
}

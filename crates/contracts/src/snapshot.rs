//! AggregateSnapshot - Aggregator output
//!
//! Point-in-time copy of all per-source statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SourceId;

/// Aggregate statistics of one source
///
/// Average is derived on read (`sum_value / message_count`), never stored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceStats {
    /// Next sequence value anticipated
    pub expected_sequence: u64,

    /// Accepted records
    pub message_count: u64,

    /// Sequence numbers inferred missing
    pub dropped_count: u64,

    /// Records discarded as duplicates
    pub duplicate_count: u64,

    /// Accepted records that arrived behind the expected sequence
    pub late_count: u64,

    /// Most recent accepted value
    pub current_value: f64,

    /// Minimum accepted value
    pub min_value: f64,

    /// Maximum accepted value
    pub max_value: f64,

    /// Sum of accepted values
    pub sum_value: f64,

    /// Producer timestamp of the most recent accepted record
    pub last_timestamp: i64,
}

impl SourceStats {
    /// Average of accepted values (0.0 when nothing was accepted)
    pub fn average(&self) -> f64 {
        if self.message_count == 0 {
            0.0
        } else {
            self.sum_value / self.message_count as f64
        }
    }

    /// Dropped messages as a percentage of accepted + dropped
    pub fn drop_rate(&self) -> f64 {
        let total = self.message_count + self.dropped_count;
        if total > 0 {
            self.dropped_count as f64 / total as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// Immutable point-in-time copy of every source's statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    /// Aggregator generation (accepted records so far) when taken
    pub generation: u64,

    /// Wall-clock time the snapshot was taken (Unix milliseconds)
    pub taken_at_ms: i64,

    /// Per-source statistics, ordered by source id
    pub sources: BTreeMap<SourceId, SourceStats>,
}

impl AggregateSnapshot {
    /// Number of sources seen
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// True if no source has reported yet
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Statistics of one source
    pub fn get(&self, source_id: impl Into<SourceId>) -> Option<&SourceStats> {
        self.sources.get(&source_id.into())
    }

    /// Accepted records across all sources
    pub fn total_messages(&self) -> u64 {
        self.sources.values().map(|s| s.message_count).sum()
    }

    /// Dropped messages across all sources
    pub fn total_dropped(&self) -> u64 {
        self.sources.values().map(|s| s.dropped_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_is_derived() {
        let stats = SourceStats {
            message_count: 4,
            sum_value: 10.0,
            ..Default::default()
        };
        assert_eq!(stats.average(), 10.0 / 4.0);
        assert_eq!(SourceStats::default().average(), 0.0);
    }

    #[test]
    fn test_snapshot_totals() {
        let mut snapshot = AggregateSnapshot::default();
        snapshot.sources.insert(
            SourceId::new(0),
            SourceStats {
                message_count: 3,
                dropped_count: 1,
                ..Default::default()
            },
        );
        snapshot.sources.insert(
            SourceId::new(1),
            SourceStats {
                message_count: 5,
                dropped_count: 2,
                ..Default::default()
            },
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.total_messages(), 8);
        assert_eq!(snapshot.total_dropped(), 3);
        assert!(snapshot.get(1).is_some());
        assert!(snapshot.get(9).is_none());
    }

    #[test]
    fn test_drop_rate() {
        let stats = SourceStats {
            message_count: 3,
            dropped_count: 1,
            ..Default::default()
        };
        assert!((stats.drop_rate() - 25.0).abs() < 1e-10);
    }
}

//! SensorRecord - Ingestion input
//!
//! One timestamped, sequence-numbered observation from a source.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::SourceId;

/// One sensor observation
///
/// Field names on the wire are the external contract:
/// `{"id": 42, "value": 25.5, "timestamp": 1234567890, "sequence": 7}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Source identifier (`id` on the wire)
    #[serde(rename = "id")]
    pub source_id: SourceId,

    /// Reading
    pub value: f64,

    /// Producer capture time (Unix milliseconds), display only
    pub timestamp: i64,

    /// Per-source monotonically increasing counter
    pub sequence: u64,
}

impl SensorRecord {
    /// Create a new record
    pub fn new(source_id: impl Into<SourceId>, value: f64, timestamp: i64, sequence: u64) -> Self {
        Self {
            source_id: source_id.into(),
            value,
            timestamp,
            sequence,
        }
    }
}

/// A record together with the moment the hub took it off the queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceivedRecord {
    pub record: SensorRecord,
    /// Hub wall-clock time (Unix milliseconds)
    pub received_at_ms: i64,
}

impl ReceivedRecord {
    pub fn new(record: SensorRecord, received_at_ms: i64) -> Self {
        Self {
            record,
            received_at_ms,
        }
    }
}

/// Current wall-clock time in Unix milliseconds
///
/// Clamps to 0 if the system clock is before the epoch.
pub fn unix_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

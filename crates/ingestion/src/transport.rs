//! Transport adapter
//!
//! Bridges raw wire payloads from an external bus (or a replay file) into
//! the handoff queue. Malformed payloads are discarded and counted as
//! decode errors; they never reach the sequence tracker.

use contracts::SensorRecord;
use tracing::{trace, warn};

use crate::queue::HandoffQueue;
use crate::wire;

/// Decodes wire payloads and submits them to a [`HandoffQueue`]
#[derive(Debug, Clone)]
pub struct TransportAdapter {
    queue: HandoffQueue,
}

impl TransportAdapter {
    /// Create an adapter feeding `queue`
    pub fn new(queue: HandoffQueue) -> Self {
        Self { queue }
    }

    /// Handle one incoming payload
    ///
    /// Returns true if the record was decoded and queued.
    pub fn on_message(&self, payload: &[u8]) -> bool {
        match wire::decode(payload) {
            Ok(record) => self.submit(record),
            Err(e) => {
                self.queue.metrics().record_decode_error();
                metrics::counter!("telemetry_hub_decode_errors_total").increment(1);
                warn!(error = %e, len = payload.len(), "discarding malformed payload");
                false
            }
        }
    }

    /// Handle one already-decoded record
    pub fn submit(&self, record: SensorRecord) -> bool {
        match self.queue.push(record) {
            Ok(()) => {
                trace!(source_id = %record.source_id, sequence = record.sequence, "record queued");
                true
            }
            Err(e) => {
                trace!(error = %e, "record not queued");
                false
            }
        }
    }

    /// Underlying queue
    pub fn queue(&self) -> &HandoffQueue {
        &self.queue
    }
}

//! Aggregator: sole consumer of the handoff queue.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use contracts::{
    unix_millis_now, AggregateSnapshot, DedupPolicy, ReceivedRecord, SensorRecord, SourceId,
};
use ingestion::HandoffQueue;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, instrument, trace, warn};

use crate::state::SourceState;
use crate::summary::FinalSummary;
use crate::tracker::Verdict;

/// Milliseconds between producer capture and ingestion
///
/// Producer timestamps are arbitrary integers; clock skew reads as zero.
fn ingest_latency_ms(received_at_ms: i64, timestamp: i64) -> f64 {
    received_at_ms.saturating_sub(timestamp).max(0) as f64
}

/// Aggregator-wide counters
#[derive(Debug, Default)]
pub struct AggregatorCounters {
    /// Accepted records; doubles as the snapshot generation
    pub accepted: AtomicU64,
    pub duplicates: AtomicU64,
    /// Gap events (not missed sequences)
    pub gaps: AtomicU64,
    /// Missed sequences across all gaps
    pub dropped: AtomicU64,
    pub late: AtomicU64,
    /// Record copies the tap could not take
    pub tap_dropped: AtomicU64,
}

impl AggregatorCounters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            gaps: self.gaps.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            late: self.late.load(Ordering::Relaxed),
            tap_dropped: self.tap_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub accepted: u64,
    pub duplicates: u64,
    pub gaps: u64,
    pub dropped: u64,
    pub late: u64,
    pub tap_dropped: u64,
}

/// Aggregator
///
/// Owns every `SourceState`. The whole map sits behind one `RwLock` and each
/// record is applied under a single write lock, so a concurrent `snapshot()`
/// never observes a half-applied record.
#[derive(Debug)]
pub struct Aggregator {
    dedup: DedupPolicy,
    states: RwLock<BTreeMap<SourceId, SourceState>>,
    counters: AggregatorCounters,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DedupPolicy::default())
    }
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new(dedup: DedupPolicy) -> Self {
        Self {
            dedup,
            states: RwLock::new(BTreeMap::new()),
            counters: AggregatorCounters::default(),
        }
    }

    /// Apply one record
    #[instrument(
        level = "trace",
        name = "aggregator_apply",
        skip(self, record),
        fields(source_id = %record.source_id, sequence = record.sequence)
    )]
    pub fn apply(&self, record: &SensorRecord) -> Verdict {
        let (verdict, expected) = {
            let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
            let state = states
                .entry(record.source_id)
                .or_insert_with(|| SourceState::new(self.dedup));
            let expected = state.tracker().expected_sequence();
            let verdict = state.apply(record);

            // Bumped under the write lock so snapshots see a matching generation
            if verdict.is_accepted() {
                self.counters.accepted.fetch_add(1, Ordering::Release);
            }
            (verdict, expected)
        };

        self.record_verdict(record, verdict, expected);
        verdict
    }

    fn record_verdict(&self, record: &SensorRecord, verdict: Verdict, expected: u64) {
        let source_id = record.source_id;

        match verdict {
            Verdict::First => {
                debug!(source_id = %source_id, sequence = record.sequence, "new source");
            }
            Verdict::InOrder => {
                trace!(source_id = %source_id, sequence = record.sequence, "in order");
            }
            Verdict::Gap { missed } => {
                self.counters.gaps.fetch_add(1, Ordering::Relaxed);
                self.counters.dropped.fetch_add(missed, Ordering::Relaxed);
                observability::record_gap(source_id, missed);
                warn!(
                    source_id = %source_id,
                    expected,
                    received = record.sequence,
                    missed,
                    "sequence gap detected"
                );
            }
            Verdict::Late { behind } => {
                self.counters.late.fetch_add(1, Ordering::Relaxed);
                observability::record_late(source_id);
                debug!(
                    source_id = %source_id,
                    expected,
                    received = record.sequence,
                    behind,
                    "late record accepted"
                );
            }
            Verdict::Duplicate => {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                observability::record_duplicate(source_id);
                debug!(source_id = %source_id, sequence = record.sequence, "duplicate discarded");
                return;
            }
        }

        observability::record_accepted(source_id);
    }

    /// Consume `queue` until it is stopped and drained
    ///
    /// Returns the number of records consumed (duplicates included).
    pub async fn ingest(&self, queue: &HandoffQueue) -> u64 {
        self.ingest_with_tap(queue, None).await
    }

    /// Like [`ingest`](Self::ingest), also copying every consumed record
    /// (duplicates included) to `tap`
    ///
    /// The tap never blocks ingestion: copies that do not fit are counted in
    /// `tap_dropped`.
    #[instrument(name = "aggregator_ingest", skip_all, fields(tap = tap.is_some()))]
    pub async fn ingest_with_tap(
        &self,
        queue: &HandoffQueue,
        tap: Option<&mpsc::Sender<ReceivedRecord>>,
    ) -> u64 {
        info!("aggregator ingest started");
        let mut consumed = 0u64;

        while let Some(record) = queue.pop().await {
            let received_at_ms = unix_millis_now();
            self.apply(&record);
            consumed += 1;

            if let Some(tap) = tap {
                self.forward(tap, ReceivedRecord::new(record, received_at_ms));
            }

            observability::record_queue_depth(queue.len());
            observability::record_ingest_latency_ms(ingest_latency_ms(
                received_at_ms,
                record.timestamp,
            ));
        }

        info!(consumed, "aggregator ingest finished");
        consumed
    }

    fn forward(&self, tap: &mpsc::Sender<ReceivedRecord>, received: ReceivedRecord) {
        match tap.try_send(received) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                self.counters.tap_dropped.fetch_add(1, Ordering::Relaxed);
                trace!(
                    source_id = %dropped.record.source_id,
                    sequence = dropped.record.sequence,
                    "record tap full, copy dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.tap_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Point-in-time copy of every source
    pub fn snapshot(&self) -> AggregateSnapshot {
        let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
        AggregateSnapshot {
            generation: self.counters.accepted.load(Ordering::Acquire),
            taken_at_ms: unix_millis_now(),
            sources: states.iter().map(|(id, s)| (*id, s.stats())).collect(),
        }
    }

    /// Accepted records so far; advances on every accepted record
    #[inline]
    pub fn generation(&self) -> u64 {
        self.counters.accepted.load(Ordering::Acquire)
    }

    /// Final summary of the current state
    pub fn summary(&self) -> FinalSummary {
        FinalSummary::from(&self.snapshot())
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Number of sources seen
    pub fn source_count(&self) -> usize {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

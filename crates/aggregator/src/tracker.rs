//! Per-source sequence tracking.
//!
//! Classifies every incoming sequence number as first, in order, gap, late,
//! or duplicate. Detection only: out-of-order arrivals are never reordered.

use std::collections::HashSet;
use std::fmt;

use contracts::DedupPolicy;
use ringbuf::{traits::*, HeapRb};

/// Classification of one observed sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// First record of the source; becomes the baseline
    First,
    /// Exactly the expected sequence
    InOrder,
    /// Ahead of the expected sequence; `missed` sequences inferred lost
    Gap { missed: u64 },
    /// Behind the expected sequence but never seen before
    Late { behind: u64 },
    /// Already seen; discarded
    Duplicate,
}

impl Verdict {
    /// True if the record contributes to statistics
    #[inline]
    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Set of sequence numbers already observed
enum SeenSet {
    Unbounded(HashSet<u64>),
    /// Last `k` sequences in arrival order plus a lookup set
    Window {
        order: HeapRb<u64>,
        members: HashSet<u64>,
    },
}

impl SeenSet {
    fn new(policy: DedupPolicy) -> Self {
        match policy {
            DedupPolicy::Unbounded => Self::Unbounded(HashSet::new()),
            DedupPolicy::Window(k) => {
                let k = k.max(1);
                Self::Window {
                    order: HeapRb::new(k),
                    members: HashSet::with_capacity(k),
                }
            }
        }
    }

    #[inline]
    fn contains(&self, sequence: u64) -> bool {
        match self {
            Self::Unbounded(set) => set.contains(&sequence),
            Self::Window { members, .. } => members.contains(&sequence),
        }
    }

    /// Caller guarantees `sequence` is not already present
    fn insert(&mut self, sequence: u64) {
        match self {
            Self::Unbounded(set) => {
                set.insert(sequence);
            }
            Self::Window { order, members } => {
                // Evict the oldest remembered sequence before it falls out of the ring
                if order.is_full() {
                    if let Some(oldest) = order.try_pop() {
                        members.remove(&oldest);
                    }
                }
                let _ = order.try_push(sequence);
                members.insert(sequence);
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Unbounded(set) => set.len(),
            Self::Window { members, .. } => members.len(),
        }
    }
}

/// Sequence tracker of one source
///
/// `Uninitialized` until the first record, `Tracking` afterwards.
pub struct SequenceTracker {
    /// None until the first record
    expected: Option<u64>,
    seen: SeenSet,
}

impl fmt::Debug for SequenceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceTracker")
            .field("expected", &self.expected)
            .field("seen", &self.seen.len())
            .finish()
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new(DedupPolicy::default())
    }
}

impl SequenceTracker {
    /// Create an uninitialized tracker
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            expected: None,
            seen: SeenSet::new(policy),
        }
    }

    /// Classify `sequence` and advance the tracker
    ///
    /// A duplicate leaves the tracker untouched. Anything else sets the
    /// expected sequence to `sequence + 1`, including late arrivals.
    pub fn observe(&mut self, sequence: u64) -> Verdict {
        if self.seen.contains(sequence) {
            return Verdict::Duplicate;
        }

        let verdict = match self.expected {
            None => Verdict::First,
            Some(expected) if sequence == expected => Verdict::InOrder,
            Some(expected) if sequence > expected => Verdict::Gap {
                missed: sequence - expected,
            },
            Some(expected) => Verdict::Late {
                behind: expected - sequence,
            },
        };

        self.expected = Some(sequence.saturating_add(1));
        self.seen.insert(sequence);
        verdict
    }

    /// Next sequence anticipated (0 before the first record)
    #[inline]
    pub fn expected_sequence(&self) -> u64 {
        self.expected.unwrap_or(0)
    }

    /// True once the first record was observed
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.expected.is_some()
    }

    /// Number of sequences currently remembered for dedup
    #[inline]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

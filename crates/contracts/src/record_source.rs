//! RecordSource trait - producer abstraction
//!
//! Defines a unified interface for record producers, decoupling the ingestion
//! pipeline from how records are generated (simulated threads, bus subscribers, replay).

use std::sync::Arc;

use crate::{SensorRecord, SourceId};

/// Record callback type
///
/// When a producer emits a record, it hands the `SensorRecord` to this callback.
/// Uses `Arc` so the callback can be shared with producer threads.
pub type RecordCallback = Arc<dyn Fn(SensorRecord) + Send + Sync>;

/// Record producer trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn RecordSource> = Box::new(MockRecordSource::new(config));
/// source.listen(Arc::new(|record| {
///     println!("record from {}", record.source_id);
/// }));
/// // ... later ...
/// source.stop();
/// ```
pub trait RecordSource: Send + Sync {
    /// Source this producer emits for
    fn source_id(&self) -> SourceId;

    /// Start emitting records into `callback`
    ///
    /// Repeated calls while already listening are no-ops.
    fn listen(&self, callback: RecordCallback);

    /// Stop emitting records
    ///
    /// Must not return before the producer has stopped invoking the callback.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

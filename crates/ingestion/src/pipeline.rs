//! Ingestion Pipeline main entry

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{RecordCallback, RecordSource, SourceConfig, SourceId};
use tracing::{debug, info, instrument, trace};

use crate::config::IngestionMetrics;
use crate::mock::MockRecordSource;
use crate::queue::HandoffQueue;

/// Ingestion Pipeline
///
/// Owns the registered producers and wires every one of them into a shared
/// [`HandoffQueue`].
pub struct IngestionPipeline {
    /// Registered producers, keyed by source
    sources: BTreeMap<SourceId, Box<dyn RecordSource>>,

    /// Queue all producers submit into
    queue: HandoffQueue,
}

impl IngestionPipeline {
    /// Create a pipeline feeding `queue`
    pub fn new(queue: HandoffQueue) -> Self {
        Self {
            sources: BTreeMap::new(),
            queue,
        }
    }

    /// Create a pipeline with one mock producer per source config
    pub fn with_mock_sources(queue: HandoffQueue, sources: &[SourceConfig]) -> Self {
        let mut pipeline = Self::new(queue);
        for config in sources {
            pipeline.register_source(Box::new(MockRecordSource::new(config.clone())));
        }
        pipeline
    }

    /// Register a producer
    ///
    /// A producer registered under an existing source ID replaces (and stops) the old one.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(source_id = %source.source_id())
    )]
    pub fn register_source(&mut self, source: Box<dyn RecordSource>) {
        let source_id = source.source_id();
        if let Some(previous) = self.sources.insert(source_id, source) {
            previous.stop();
            debug!(source_id = %source_id, "replaced record source");
        } else {
            debug!(source_id = %source_id, "registered record source");
        }
    }

    /// Start all registered producers
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all record sources");
        for (source_id, source) in &self.sources {
            if !source.is_listening() {
                debug!(source_id = %source_id, "starting source");
                source.listen(self.callback());
            }
        }
    }

    /// Stop all producers
    ///
    /// Returns once every producer has stopped invoking its callback.
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all record sources");
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                debug!(source_id = %source_id, "stopping source");
                source.stop();
            }
        }
    }

    fn callback(&self) -> RecordCallback {
        let queue = self.queue.clone();
        Arc::new(move |record| {
            if let Err(e) = queue.push(record) {
                trace!(error = %e, "producer record not queued");
            }
        })
    }

    /// Queue the producers feed
    pub fn queue(&self) -> &HandoffQueue {
        &self.queue
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.queue.metrics()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Check if specified source is listening
    pub fn is_source_listening(&self, source_id: impl Into<SourceId>) -> bool {
        self.sources
            .get(&source_id.into())
            .map(|s| s.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorRecord, SourceKind};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Producer that emits a fixed batch synchronously on listen
    struct BatchSource {
        source_id: SourceId,
        batch: Vec<u64>,
        listening: AtomicBool,
        callback: Mutex<Option<RecordCallback>>,
    }

    impl BatchSource {
        fn new(source_id: i64, batch: Vec<u64>) -> Self {
            Self {
                source_id: SourceId::new(source_id),
                batch,
                listening: AtomicBool::new(false),
                callback: Mutex::new(None),
            }
        }
    }

    impl RecordSource for BatchSource {
        fn source_id(&self) -> SourceId {
            self.source_id
        }

        fn listen(&self, callback: RecordCallback) {
            if self.listening.swap(true, Ordering::SeqCst) {
                return;
            }
            for &seq in &self.batch {
                callback(SensorRecord::new(self.source_id, seq as f64, 0, seq));
            }
            *self.callback.lock().unwrap() = Some(callback);
        }

        fn stop(&self) {
            self.listening.store(false, Ordering::SeqCst);
            self.callback.lock().unwrap().take();
        }

        fn is_listening(&self) -> bool {
            self.listening.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(HandoffQueue::unbounded());
        assert_eq!(pipeline.source_count(), 0);
        assert!(!pipeline.is_source_listening(0));
    }

    #[test]
    fn test_start_all_feeds_queue() {
        let queue = HandoffQueue::unbounded();
        let mut pipeline = IngestionPipeline::new(queue.clone());
        pipeline.register_source(Box::new(BatchSource::new(1, vec![0, 1, 2])));
        pipeline.register_source(Box::new(BatchSource::new(2, vec![5, 6])));

        pipeline.start_all();
        assert!(pipeline.is_source_listening(1));
        assert!(pipeline.is_source_listening(2));
        assert_eq!(queue.len(), 5);

        pipeline.stop_all();
        assert!(!pipeline.is_source_listening(1));
    }

    #[test]
    fn test_register_replaces_same_source() {
        let mut pipeline = IngestionPipeline::new(HandoffQueue::unbounded());
        pipeline.register_source(Box::new(BatchSource::new(4, vec![0])));
        pipeline.register_source(Box::new(BatchSource::new(4, vec![1])));

        assert_eq!(pipeline.source_count(), 1);
    }

    #[test]
    fn test_with_mock_sources() {
        let sources = vec![
            SourceConfig::new(0, SourceKind::Temperature),
            SourceConfig::new(1, SourceKind::Pressure),
        ];
        let pipeline = IngestionPipeline::with_mock_sources(HandoffQueue::unbounded(), &sources);

        assert_eq!(pipeline.source_count(), 2);
        assert!(!pipeline.is_source_listening(0));
    }

    #[test]
    fn test_producers_after_queue_stop_are_rejected() {
        let queue = HandoffQueue::unbounded();
        let mut pipeline = IngestionPipeline::new(queue.clone());
        pipeline.register_source(Box::new(BatchSource::new(9, vec![0, 1])));

        queue.stop();
        pipeline.start_all();

        assert!(queue.is_empty());
        assert_eq!(pipeline.metrics().snapshot().rejected_after_stop, 2);
    }
}

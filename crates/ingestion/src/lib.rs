//! # Ingestion
//!
//! Record ingestion for the telemetry hub.
//!
//! Responsibilities:
//! - Hand records from many producers to one aggregator (`HandoffQueue`)
//! - Decode wire payloads (`wire`, `TransportAdapter`)
//! - Register and drive producers (`IngestionPipeline`, `MockRecordSource`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{SourceConfig, SourceKind};
//! use ingestion::{HandoffQueue, IngestionPipeline};
//!
//! let queue = HandoffQueue::unbounded();
//! let pipeline = IngestionPipeline::with_mock_sources(
//!     queue.clone(),
//!     &[SourceConfig::new(0, SourceKind::Temperature)],
//! );
//! pipeline.start_all();
//!
//! while let Some(record) = queue.pop().await {
//!     // aggregate
//! }
//! ```

mod config;
mod error;
mod mock;
mod pipeline;
mod queue;
mod transport;
pub mod wire;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot, OverflowPolicy, QueueConfig};
pub use contracts::SensorRecord;
pub use error::{IngestionError, Result};
pub use mock::MockRecordSource;
pub use pipeline::IngestionPipeline;
pub use queue::HandoffQueue;
pub use transport::TransportAdapter;

//! # Aggregator
//!
//! Per-source sequence tracking and statistics for the telemetry hub.
//!
//! 负责：
//! - 序列号跟踪 (首条基线、缺口、迟到、重复)
//! - 每个数据源的 current/min/max/sum/count 统计
//! - 节流的快照展示
//! - Hub 生命周期 (start / submit / shutdown)
//!
//! ## 使用示例
//!
//! ```ignore
//! use aggregator::TelemetryHub;
//!
//! let hub = TelemetryHub::from_blueprint(&blueprint);
//! hub.start().await?;
//!
//! hub.submit(record)?;
//!
//! hub.shutdown().await?;
//! println!("{}", hub.summary());
//! ```

mod engine;
mod error;
mod hub;
mod state;
mod summary;
mod throttle;
mod tracker;

// Re-exports
pub use engine::{Aggregator, AggregatorCounters, CountersSnapshot};
pub use error::{HubError, Result};
pub use hub::{HubOutputs, TelemetryHub};
pub use state::SourceState;
pub use summary::{FinalSummary, SourceSummary};
pub use throttle::{Throttle, DEFAULT_REFRESH_INTERVAL};
pub use tracker::{SequenceTracker, Verdict};

pub use contracts::{AggregateSnapshot, DedupPolicy, SourceStats};

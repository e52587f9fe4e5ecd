//! # Dispatcher
//!
//! 快照分发模块。
//!
//! 负责：
//! - 消费 `AggregateSnapshot`
//! - Fan-out 到多个 sinks (日志 / CSV)
//! - 隔离慢 sink：每个 sink 独立有界队列，落后时直接跳到最新快照
//! - 逐条记录 CSV 日志 (由 hub 的记录旁路驱动，不经过快照)

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod record_log;
pub mod sinks;

pub use contracts::{AggregateSnapshot, PresentationSink};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use record_log::{RecordLog, RecordLogStats};
pub use sinks::{CsvSink, CsvSinkConfig, LogSink};

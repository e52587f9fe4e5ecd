//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the telemetry hub.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data model
//! - `SensorRecord` is one observation as delivered by a producer
//! - `SourceStats` is the per-source aggregate readout
//! - `AggregateSnapshot` is a point-in-time copy of every `SourceStats`
//!
//! ## Time Model
//! - `timestamp` is producer capture time in Unix milliseconds, display only
//! - ordering and loss accounting use the per-source `sequence` counter

mod blueprint;
mod error;
mod record;
mod record_source;
mod sink;
mod snapshot;
mod source_id;

pub use blueprint::*;
pub use error::*;
pub use record::*;
pub use record_source::{RecordCallback, RecordSource};
pub use sink::*;
pub use snapshot::*;
pub use source_id::SourceId;

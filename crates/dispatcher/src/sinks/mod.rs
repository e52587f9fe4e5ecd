//! Sink implementations
//!
//! Contains LogSink and CsvSink.

mod csv;
mod log;

pub use self::csv::{CsvSink, CsvSinkConfig};
pub use self::log::LogSink;

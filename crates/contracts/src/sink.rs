//! PresentationSink trait - Dispatcher output interface
//!
//! The seam at which the core hands aggregate state to rendering or persistence.

use crate::{AggregateSnapshot, ContractError};

/// Snapshot output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(PresentationSink: Send)]
pub trait LocalPresentationSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Render or persist one snapshot
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn present(&mut self, snapshot: &AggregateSnapshot) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

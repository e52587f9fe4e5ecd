//! Error types for CLI operations.

use std::path::PathBuf;

use aggregator::HubError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Replay input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Hub refused to start
    #[error("Failed to start telemetry hub: {0}")]
    HubStart(#[source] HubError),

    /// A hub task failed while draining
    #[error("Failed to shut down telemetry hub: {0}")]
    HubShutdown(#[source] HubError),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigNotFound(_) | Self::InputNotFound(_) => 2,
            Self::HubStart(_) | Self::HubShutdown(_) => 1,
        }
    }
}

//! Hub lifecycle errors

use thiserror::Error;

/// Errors from misusing the hub lifecycle
#[derive(Debug, Error)]
pub enum HubError {
    /// `start()` called more than once
    #[error("telemetry hub already started")]
    AlreadyStarted,

    /// `start()` called after `shutdown()`
    #[error("telemetry hub already shut down")]
    AlreadyShutDown,

    /// Background task panicked or was cancelled
    #[error("{task} task failed: {message}")]
    TaskFailed {
        /// Task name
        task: &'static str,
        /// Join error message
        message: String,
    },
}

/// Hub Result 类型别名
pub type Result<T> = std::result::Result<T, HubError>;

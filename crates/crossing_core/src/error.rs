//! # Signal Error Types
//!
//! Errors raised while configuring or driving a phase controller.
//! The handoff queue itself is total and never fails.

use thiserror::Error;

/// Errors that can occur in the signal system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// Configuration values are out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Config file could not be read.
    #[error("failed to read config {path}: {reason}")]
    ConfigIo {
        /// Path that was read.
        path: String,
        /// Underlying IO failure.
        reason: String,
    },

    /// Config file is not valid TOML for a signal config.
    #[error("failed to parse config: {0}")]
    ConfigParse(String),

    /// `simulate` was called while the cycling thread is still running.
    #[error("phase cycle already running")]
    AlreadyRunning,

    /// The OS refused to spawn the cycling thread.
    #[error("failed to spawn phase cycle thread: {0}")]
    SpawnFailed(String),
}

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;

//! Core error types for autohangup-core.
//!
//! The countdown workflow itself never fails: everything that can go wrong
//! while it runs is folded into a terminal [`WorkflowState`](crate::WorkflowState).
//! These errors cover the surfaces around it. [`CoreError`] is what config
//! loading returns; the narrower enums come back from the scheduler, the
//! duration parser and telephony controllers directly.

use std::path::PathBuf;
use thiserror::Error;

use crate::telephony::Capability;

/// Core error type for autohangup-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory could not be prepared
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration string could not be parsed
    #[error("Invalid duration '{input}': {message}")]
    InvalidDuration { input: String, message: String },
}

/// Scheduler errors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// The handle does not refer to any work known to this scheduler
    #[error("Unknown work {0}")]
    UnknownWork(uuid::Uuid),

    /// Nothing is registered under the given work name
    #[error("No work registered under '{0}'")]
    NoWork(String),

    /// The background task panicked or was aborted
    #[error("Work {id} did not complete: {message}")]
    JoinFailed { id: uuid::Uuid, message: String },
}

/// Errors raised by a [`TelephonyController`](crate::TelephonyController).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelephonyError {
    /// The host refused the operation for lack of a capability
    #[error("Permission {0} not granted")]
    Unauthorized(Capability),

    /// The host could not be reached or returned garbage
    #[error("Telephony unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

//! Error types for the hotplug agent
//!
//! Provides structured error types for pool-management calls, device path
//! resolution, event payload parsing and agent lifecycle.

use thiserror::Error;

/// Unified error type for the agent
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Pool Management Errors
    // =========================================================================
    #[error("Pool not found: {pool}")]
    PoolNotFound { pool: String },

    #[error("Vdev not found in pool {pool}: {target}")]
    VdevNotFound { pool: String, target: String },

    #[error("Pool operation failed: {pool} - {operation}: {reason}")]
    PoolOperation {
        pool: String,
        operation: String,
        reason: String,
    },

    #[error("Could not label '{device}': {reason}")]
    LabelFailed { device: String, reason: String },

    // =========================================================================
    // Device Errors
    // =========================================================================
    #[error("Device path resolution failed for {path}: {source}")]
    PathResolution {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Event Errors
    // =========================================================================
    #[error("Event payload missing field: {field}")]
    MissingField { field: &'static str },

    #[error("Event payload field {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Auto replace protocol violation: {0}")]
    ProtocolViolation(String),

    // =========================================================================
    // Exposition Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an error sits in the agent's failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Nothing matched; silently ignored
    LookupMiss,
    /// Label/attach sequence broken by an unexpected or incomplete event
    ProtocolViolation,
    /// The pool-management layer or the OS refused an operation
    ExternalOperation,
    /// The agent cannot start
    Initialization,
}

impl Error {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::PoolNotFound { .. } | Error::VdevNotFound { .. } => ErrorClass::LookupMiss,

            Error::MissingField { .. }
            | Error::InvalidField { .. }
            | Error::ProtocolViolation(_) => ErrorClass::ProtocolViolation,

            Error::PoolOperation { .. }
            | Error::LabelFailed { .. }
            | Error::PathResolution { .. }
            | Error::Metrics(_)
            | Error::Io(_) => ErrorClass::ExternalOperation,

            Error::Initialization(_)
            | Error::Configuration(_)
            | Error::JsonParse(_)
            | Error::YamlParse(_) => ErrorClass::Initialization,
        }
    }

    /// Check if this error prevents the agent from becoming active
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Initialization)
    }

    /// Check if this error should be logged rather than swallowed
    pub fn is_reportable(&self) -> bool {
        !matches!(self.class(), ErrorClass::LookupMiss)
    }

    pub(crate) fn pool_op(
        pool: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::PoolOperation {
            pool: pool.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for the agent
pub type Result<T> = std::result::Result<T, Error>;

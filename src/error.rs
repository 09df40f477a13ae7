//! Error types for the buffered table logger

use crate::schema::RowShape;
use thiserror::Error;

/// Result type for logger operations.
pub type Result<T> = std::result::Result<T, LoggerError>;

/// Everything that can go wrong while building or driving a logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Construction-time configuration problem. Fatal to construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The tabular store failed during lookup, creation, growth, or append.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A row of the other shape was queued on a logger already pinned to one.
    #[error("row shape mismatch: logger writes {expected} rows, got a {found} row")]
    ShapeMismatch { expected: RowShape, found: RowShape },
}

/// Missing or malformed logger configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("logger requires a non-empty 'table' name")]
    MissingTable,

    #[error("'max_buffer' must be a positive integer, got {0}")]
    InvalidMaxBuffer(String),

    #[error("unknown time zone '{0}'")]
    InvalidTimezone(String),

    #[error("failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

/// Failure surfaced by a [`TabularStore`](crate::store::TabularStore).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// Escape hatch for store implementations living outside this crate.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

//! Error types for sqlgate

use thiserror::Error;

/// Core error type for sqlgate operations
#[derive(Error, Debug)]
pub enum SqlGateError {
    #[error("Unsupported dialect '{dialect}', supported dialects: {}", supported.join(", "))]
    UnsupportedDialect {
        dialect: String,
        supported: Vec<String>,
    },

    #[error("Plugin load error: {0}")]
    PluginLoad(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SqlGateError {
    /// Whether the error is a connectivity failure eligible for bounded retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SqlGateError::Connection(_) | SqlGateError::Timeout(_)
        )
    }
}

/// Result type alias for sqlgate operations
pub type Result<T> = std::result::Result<T, SqlGateError>;

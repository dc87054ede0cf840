//! Error taxonomy for the archive engine.
//!
//! Every fallible operation surfaces one of these variants as a result value;
//! callers decide whether a failure is retryable ([`StoreError::Transport`]),
//! fatal at startup ([`StoreError::Schema`]), or a normal miss
//! ([`StoreError::NotFound`]).

use thiserror::Error;

/// Errors produced by the store, the decay scheduler, and the MCP layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Addressed id is absent. Non-fatal; MCP maps this to an `isError` payload.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation refused because of conflicting state (e.g. a decay cycle
    /// already in flight).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Migration or schema inconsistency. Fatal at startup; the message names
    /// the missing object.
    #[error("schema error: {0}")]
    Schema(String),

    /// Connection-class failure: pool exhausted, connection reset, protocol
    /// timeout. Retryable by the caller.
    #[error("transport error: {0}")]
    Transport(#[from] sqlx::Error),

    /// Malformed input: bad tool arguments, wrong embedding dimension.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A single decay batch failed. Counted into the run metric; the cycle
    /// continues.
    #[error("decay batch failed: {0}")]
    DecayBatch(String),

    /// JSON (de)serialization of a stored payload failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Shorthand for a [`StoreError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a connection-class failure worth retrying.
    ///
    /// Schema and SQL errors are never retryable; only transport failures
    /// qualify for the startup backoff loop.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::Protocol(_)
            ),
            _ => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_the_field() {
        let err = StoreError::validation("embedding", "expected dimension 768, got 12");
        assert_eq!(
            err.to_string(),
            "invalid embedding: expected dimension 768, got 12"
        );
    }

    #[test]
    fn not_found_is_not_retryable() {
        assert!(!StoreError::NotFound("chat-1".into()).is_retryable());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        assert!(StoreError::Transport(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn row_not_found_is_not_retryable() {
        assert!(!StoreError::Transport(sqlx::Error::RowNotFound).is_retryable());
    }
}

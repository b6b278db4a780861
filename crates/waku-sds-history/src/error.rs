//! Error types for the history module.

use thiserror::Error;
use waku_sds_core::MessageId;

/// Errors that can occur during history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Only content messages belong in local history.
    #[error("message {0} is not a content message")]
    NotContent(MessageId),
}

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

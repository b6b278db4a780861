//! Error types for the repair module.

use thiserror::Error;

/// Errors that can occur while setting up repair.
///
/// Runtime misses (unknown sender, message no longer held, full buffers) are
/// not errors; they are logged and skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepairError {
    /// Configuration failed validation.
    #[error("invalid repair config: {0}")]
    InvalidConfig(String),

    /// The local participant id is empty.
    #[error("participant id must not be empty")]
    EmptyParticipantId,
}

/// Result type for repair operations.
pub type Result<T> = std::result::Result<T, RepairError>;

//! Error types for the SDS core primitives.

use thiserror::Error;

/// Core errors raised while constructing or decoding messages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} message must have content")]
    EmptyContent(&'static str),

    #[error("message has neither a lamport timestamp nor content")]
    Unclassifiable,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Configuration errors for bloom filters.
///
/// These are fatal to the filter instance being built: no filter is created.
#[derive(Debug, Error, PartialEq)]
pub enum BloomError {
    #[error("k must be <= 12, got {0}")]
    HashCountOutOfRange(u32),

    #[error(
        "k={k} and error rate {error_rate} not achievable using less than 4 bytes / element"
    )]
    Unachievable { k: u32, error_rate: f64 },

    #[error("error rate must be in (0, 1), got {0}")]
    InvalidErrorRate(f64),

    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    #[error("{capacity} elements at {bits_per_elem} bits each does not fit in memory")]
    TooLarge { capacity: usize, bits_per_elem: u32 },

    #[error("serialized filter has {got} bytes, expected {expected}")]
    InvalidLength { expected: usize, got: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

//! Unified error type.

use thiserror::Error;
use waku_sds_core::{BloomError, CoreError};
use waku_sds_history::HistoryError;
use waku_sds_repair::RepairError;

/// Any error raised by the SDS component crates.
#[derive(Debug, Error)]
pub enum SdsError {
    /// Message construction or decoding failed.
    #[error("message error: {0}")]
    Message(#[from] CoreError),

    /// Bloom filter configuration was rejected.
    #[error("bloom filter error: {0}")]
    Bloom(#[from] BloomError),

    /// History storage failed.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Repair setup was rejected.
    #[error("repair error: {0}")]
    Repair(#[from] RepairError),
}

/// Result type for SDS operations.
pub type Result<T> = std::result::Result<T, SdsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use waku_sds_core::{BloomFilter, BloomFilterOptions, Message, MessageHeader};

    fn build_message() -> Result<Message> {
        Ok(Message::ephemeral(MessageHeader::new("m", "c", "s"), Vec::new())?)
    }

    fn build_filter() -> Result<BloomFilter> {
        Ok(BloomFilter::new(BloomFilterOptions::new(100, 0.01).with_k_hashes(13))?)
    }

    #[test]
    fn test_conversions() {
        assert!(matches!(build_message(), Err(SdsError::Message(_))));
        assert!(matches!(build_filter(), Err(SdsError::Bloom(_))));
        let err = SdsError::from(RepairError::EmptyParticipantId);
        assert_eq!(err.to_string(), "repair error: participant id must not be empty");
    }
}

//! # Waku SDS Core
//!
//! Pure primitives for Scalable Data Sync: messages, bloom filters, sorted
//! containers and the deterministic hashes everything else is built on.
//!
//! This crate contains no I/O, no storage, no networking, no clocks.
//!
//! ## Key Types
//!
//! - [`Message`] - A validated content, sync or ephemeral message
//! - [`HistoryEntry`] - Reference to a message in causal history or a repair request
//! - [`BloomFilter`] - Probabilistic set of received message ids
//! - [`SortedContainer`] - Self-sorting, duplicate-free sequence
//!
//! ## Wire format
//!
//! Messages are encoded as deterministic CBOR. See the [`canonical`] module.

pub mod bloom;
pub mod canonical;
pub mod error;
pub mod hash;
pub mod message;
pub mod probabilities;
pub mod sorted;
pub mod types;

pub use bloom::{BloomFilter, BloomFilterOptions, DEFAULT_BLOOM_FILTER_OPTIONS};
pub use canonical::{decode_message, encode_message};
pub use error::{BloomError, CoreError};
pub use hash::{Blake3IdHasher, BloomHasher, DoubleHasher, IdHasher};
pub use message::{ByLamportTimestamp, Message, MessageBuilder, MessageHeader, MessageKind};
pub use probabilities::get_m_over_n_bits_for_k;
pub use sorted::{Comparator, NaturalOrder, SortedContainer};
pub use types::{ChannelId, HistoryEntry, MessageId, ParticipantId, RepairHistoryEntry, SenderId};

//! # Waku SDS
//!
//! Scalable Data Sync: the reliability layer that gives a broadcast channel
//! causal ordering and best-effort repair of lost messages.
//!
//! ## Overview
//!
//! - **Messages** carry a lamport timestamp, a causal history of recent
//!   message ids and a bloom filter of everything the sender has seen.
//! - **History** keeps delivered content messages in causal order, in
//!   memory or persisted to SQLite.
//! - **Repair** (SDS-R) schedules requests for missing dependencies and
//!   responses to other participants' requests, spread over time so a
//!   channel does not answer in unison.
//!
//! Transport, encryption and the channel orchestration loop are left to
//! the embedding application.
//!
//! ## Usage
//!
//! ```rust
//! use std::collections::HashMap;
//! use waku_sds::{Message, MessageBuilder, MessageId, RepairConfig, RepairManager};
//!
//! let msg = MessageBuilder::new(MessageId::from_payload(b"hi"), "chat", "alice")
//!     .lamport_timestamp(1)
//!     .content(b"hi".to_vec())
//!     .build()
//!     .unwrap();
//! let bytes = msg.encode();
//! assert_eq!(Message::decode(&bytes), Some(msg.clone()));
//!
//! let mut history = HashMap::new();
//! history.insert(msg.message_id().clone(), msg);
//!
//! let mut repair = RepairManager::new("bob", RepairConfig::default()).unwrap();
//! let swept = repair.sweep_incoming_buffer(&history);
//! assert!(swept.is_empty());
//! ```
//!
//! ## Re-exports
//!
//! - [`waku_sds_core`] - Messages, bloom filter, sorted container, hashing
//! - [`waku_sds_history`] - Local history and its storage backends
//! - [`waku_sds_repair`] - Repair buffers and manager

pub mod error;

pub use waku_sds_core;
pub use waku_sds_history;
pub use waku_sds_repair;

pub use error::{Result, SdsError};

pub use waku_sds_core::{
    BloomFilter, BloomFilterOptions, ChannelId, HistoryEntry, Message, MessageBuilder,
    MessageHeader, MessageId, MessageKind, ParticipantId, RepairHistoryEntry, SenderId,
    SortedContainer,
};
pub use waku_sds_history::{
    LocalHistory, MemLocalHistory, PersistentHistory, PersistentHistoryOptions,
    SqliteHistoryStorage,
};
pub use waku_sds_repair::{RepairConfig, RepairEvent, RepairManager, RepairStats};

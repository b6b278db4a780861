//! # Waku SDS History
//!
//! Local message history for Scalable Data Sync.
//!
//! ## Overview
//!
//! A participant keeps the content messages it has delivered in causal order.
//! The history answers lookups from the repair manager (via [`LocalHistory`])
//! and provides the causal history attached to outgoing messages.
//!
//! ## Key Types
//!
//! - [`LocalHistory`] - Lookup trait; also implemented for `HashMap<MessageId, Message>`
//! - [`MemLocalHistory`] - In-memory history ordered by (lamport timestamp, message id)
//! - [`PersistentHistory`] - History mirrored into a [`HistoryStorage`]
//! - [`SqliteHistoryStorage`] - SQLite key/value backend
//! - [`MemoryHistoryStorage`] - In-memory key/value backend for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waku_sds_history::{PersistentHistory, PersistentHistoryOptions, SqliteHistoryStorage};
//!
//! let storage = SqliteHistoryStorage::open("sds.db").unwrap();
//! let history = PersistentHistory::open(storage, &PersistentHistoryOptions::new("my-channel"));
//! println!("{} messages restored", history.len());
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod persistent;
pub mod sqlite;
pub mod traits;

pub use error::{HistoryError, Result};
pub use memory::{MemLocalHistory, MemoryHistoryStorage};
pub use persistent::{PersistentHistory, PersistentHistoryOptions, HISTORY_STORAGE_PREFIX};
pub use sqlite::SqliteHistoryStorage;
pub use traits::{HistoryStorage, LocalHistory};

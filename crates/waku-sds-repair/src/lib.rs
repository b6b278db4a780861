//! # Waku SDS Repair
//!
//! SDS-R: scheduling of repair requests and responses for Scalable Data Sync.
//!
//! ## Overview
//!
//! When a participant finds a causal dependency it never received, it does
//! not ask for it immediately. It schedules a request at a hash-derived time
//! within `[t_min, t_max)`; if any other participant asks first, or the
//! message shows up, the request is cancelled. Participants holding the
//! message schedule a response the same way, restricted to a response group
//! so only a fraction of the channel answers.
//!
//! ## Key Types
//!
//! - [`RepairManager`] - Per-participant repair state
//! - [`OutgoingRepairBuffer`] - Requests to broadcast, ordered by `t_req`
//! - [`IncomingRepairBuffer`] - Responses to rebroadcast, ordered by `t_resp`
//! - [`RepairConfig`] - Timing window, group count, buffer size
//!
//! ## Flow
//!
//! ```text
//! gap detected ──> on_missing_dependencies ──> outgoing buffer
//!                                                  │ sweep_outgoing_buffer
//!                                                  v
//!                                          repair request on the wire
//!                                                  │
//! peer ──> process_incoming_repair_requests ──> incoming buffer
//!                                                  │ sweep_incoming_buffer
//!                                                  v
//!                                          message rebroadcast
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use waku_sds_core::RepairHistoryEntry;
//! use waku_sds_repair::{RepairConfig, RepairManager};
//!
//! let mut repair = RepairManager::new("alice", RepairConfig::default()).unwrap();
//! repair.on_missing_dependencies_at(&[RepairHistoryEntry::new("m1").with_sender("bob")], 0);
//! assert!(repair.sweep_outgoing_buffer_at(3, 0).is_empty());
//! assert_eq!(repair.sweep_outgoing_buffer_at(3, 120_000).len(), 1);
//! ```

pub mod buffers;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;

pub use buffers::{IncomingBufferEntry, IncomingRepairBuffer, OutgoingBufferEntry, OutgoingRepairBuffer};
pub use config::{RepairConfig, DEFAULT_BUFFER_SIZE, DEFAULT_T_MAX, DEFAULT_T_MIN, PARTICIPANTS_PER_RESPONSE_GROUP};
pub use error::{RepairError, Result};
pub use events::{RepairEvent, RepairEventHandler};
pub use manager::{now_millis, RepairManager, RepairStats, DEFAULT_MAX_REPAIR_REQUESTS};

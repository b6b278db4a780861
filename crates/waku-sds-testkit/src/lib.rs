//! # Waku SDS Testkit
//!
//! Testing utilities for Scalable Data Sync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known messages with their expected wire encoding
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Simulated channel participants for repair scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use waku_sds_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use waku_sds_testkit::generators::message;
//!
//! proptest! {
//!     #[test]
//!     fn encoding_is_deterministic(msg in message()) {
//!         prop_assert_eq!(msg.encode(), msg.clone().encode());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use waku_sds_repair::RepairConfig;
//! use waku_sds_testkit::fixtures::multi_party_fixtures;
//!
//! let mut parties = multi_party_fixtures(3, "chat", RepairConfig::default()).unwrap();
//! let msg = parties[0].send(b"hello", 0).unwrap();
//! parties[1].receive(&msg, 0).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, Outbox, Participant};
pub use generators::{message_from_params, MessageParams};
pub use vectors::{all_vectors, message_from_vector, verify_all_vectors, GoldenVector};

//! Storage Module
//!
//! The in-memory key-value store with TTL support, and the background
//! sweeper that removes expired keys nobody reads.
//!
//! ## Features
//!
//! - **Single Keyspace**: one map of key to value, shared by every connection
//! - **TTL Support**: keys can carry an absolute expiry in milliseconds
//! - **Lazy Expiry**: expired keys are removed when read
//! - **Active Expiry**: a periodic sweep removes the rest
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("ember"));
//! assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("ember")));
//!
//! engine.set_with_ttl(Bytes::from("session"), Bytes::from("token"), Duration::from_secs(3600));
//! assert_eq!(engine.cleanup_expired(), 0);
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{now_millis, StorageEngine, StorageStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, DEFAULT_SWEEP_INTERVAL};

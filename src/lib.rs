//! # EmberKV - A Single-Node In-Memory Key-Value Server
//!
//! EmberKV speaks the Redis serialization protocol (RESP) over TCP and
//! keeps every key in memory, with optional per-key expiry.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             EmberKV                              │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐       │
//! │  │ TCP Server  │───>│ Connection  │───>│ CommandHandler  │       │
//! │  │ (Listener)  │    │  Handler    │    │ (dispatcher)    │       │
//! │  └─────────────┘    └─────────────┘    └───┬─────────┬───┘       │
//! │                                            │         │           │
//! │  ┌─────────────┐                           ▼         ▼           │
//! │  │  Protocol   │               ┌──────────────┐ ┌─────────────┐  │
//! │  │  parse /    │               │StorageEngine │ │ ConfigStore │  │
//! │  │  serialize  │               └──────▲───────┘ └─────────────┘  │
//! │  └─────────────┘                      │                          │
//! │                              ┌────────┴────────┐                 │
//! │                              │  ExpirySweeper  │                 │
//! │                              └─────────────────┘                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One `StorageEngine` and one `ConfigStore` are built at startup and
//! handed to a `CommandHandler`; each connection gets a clone of that
//! handler, so all clients see the same keys.
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberkv::{handle_connection, CommandHandler, ConfigStore, ConnectionStats, StorageEngine};
//! use emberkv::storage::start_expiry_sweeper;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let config = Arc::new(ConfigStore::open("/tmp/redis-files", "dump.rdb")?);
//!     let _sweeper = start_expiry_sweeper(Arc::clone(&storage));
//!
//!     let handler = CommandHandler::new(storage, config);
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         tokio::spawn(handle_connection(stream, addr, handler.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `GET key`
//! - `SET key value [PX milliseconds]`
//! - `CONFIG GET dir|dbfilename`
//!
//! ## Module Overview
//!
//! - [`protocol`]: frame parser and reply serialization
//! - [`storage`]: key-value store with lazy and active expiry
//! - [`config`]: startup options and the `CONFIG GET` store
//! - [`snapshot`]: snapshot file header validation
//! - [`commands`]: the command dispatcher
//! - [`connection`]: client connection loop

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod snapshot;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{ConfigStore, ServerOptions};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse, Command, Parsed, ReplyValue};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port EmberKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host EmberKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

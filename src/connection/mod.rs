//! Connection Module
//!
//! Manages individual client connections. Each accepted client is handled
//! by its own task:
//!
//! ```text
//!   accept() ──> spawn ──> ┌──────────────────────────────────────┐
//!                          │  read chunk ─> dispatch ─> write     │
//!                          │       ▲                       │      │
//!                          │       └───────────────────────┘      │
//!                          └──────────────────────────────────────┘
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, MAX_BUFFER_SIZE,
};

//! Command Handler Module
//!
//! The dispatch layer between the codec and the store.
//!
//! ```text
//! raw frame
//!     │
//!     ▼
//! ┌─────────────────┐
//! │  parse          │  (protocol module)
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  arity check, dispatch
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────────────────┐
//! │ StorageEngine / ConfigStore │
//! └────────┬────────────────────┘
//!          ▼
//!     serialize → raw reply
//! ```

pub mod handler;

pub use handler::{CommandError, CommandHandler};

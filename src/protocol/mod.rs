//! RESP Protocol Codec
//!
//! Stateless functions that turn a raw frame into a structured value and
//! turn a reply value back into a raw frame.
//!
//! ## Modules
//!
//! - `parser`: tolerant/strict frame parser
//! - `command`: token list extracted from a request frame
//! - `types`: the `ReplyValue` enum and serialization
//!
//! ## Example
//!
//! ```
//! use emberkv::protocol::{serialize_bulk, Command, ReplyValue};
//!
//! let cmd = Command::from_frame("*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
//! assert_eq!(cmd.name().as_deref(), Some("GET"));
//!
//! assert_eq!(ReplyValue::simple_string("PONG").serialize(), b"+PONG\r\n");
//! assert_eq!(serialize_bulk(None), b"$-1\r\n");
//! ```

pub mod command;
pub mod parser;
pub mod types;

pub use command::Command;
pub use parser::{parse, parse_frame, ParseError, ParseMode, ParseResult, Parsed, UNKNOWN_COMMAND};
pub use types::{serialize_array, serialize_bulk, ReplyValue};

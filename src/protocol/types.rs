//! RESP Reply Values and Serialization
//!
//! This module defines the values a command can answer with and how they
//! are written to the wire.
//!
//! ## Protocol Format
//!
//! Each frame starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All frames are terminated with CRLF (`\r\n`).
//!
//! ## Deviations
//!
//! `Null` is written as the simple string `+NULL\r\n`, not as a protocol
//! null. The protocol null is only produced through a bulk string with no
//! payload (`$-1\r\n`), which is what `GET` answers for a missing key.
//! Booleans are written as `+OK\r\n` / `+NO\r\n`.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A value that can be sent back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyValue {
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// `+OK\r\n` when true, `+NO\r\n` when false.
    Boolean(bool),

    /// Written as `+NULL\r\n`.
    Null,

    /// Format: `-<error message>\r\n`
    Error(String),

    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<ReplyValue>),

    /// Format: `$<length>\r\n<data>\r\n`, or `$-1\r\n` when absent.
    BulkString(Option<Bytes>),
}

impl ReplyValue {
    /// Creates a new simple string reply.
    ///
    /// # Example
    /// ```
    /// use emberkv::protocol::types::ReplyValue;
    /// let ok = ReplyValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        ReplyValue::SimpleString(s.into())
    }

    /// Creates a new error reply.
    pub fn error(s: impl Into<String>) -> Self {
        ReplyValue::Error(s.into())
    }

    /// Creates a new integer reply.
    pub fn integer(n: i64) -> Self {
        ReplyValue::Integer(n)
    }

    /// Creates a bulk string reply carrying `data`.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        ReplyValue::BulkString(Some(data.into()))
    }

    /// Creates a bulk string reply from an optional payload.
    pub fn optional_bulk(data: Option<Bytes>) -> Self {
        ReplyValue::BulkString(data)
    }

    /// Creates an array reply.
    pub fn array(values: Vec<ReplyValue>) -> Self {
        ReplyValue::Array(values)
    }

    /// Common reply for successful operations
    pub fn ok() -> Self {
        ReplyValue::Boolean(true)
    }

    /// Common reply for PING
    pub fn pong() -> Self {
        ReplyValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value into its wire frame.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            ReplyValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            ReplyValue::Integer(n) => {
                write_line(buf, prefix::INTEGER, n.to_string().as_bytes())
            }
            ReplyValue::Boolean(true) => write_line(buf, prefix::SIMPLE_STRING, b"OK"),
            ReplyValue::Boolean(false) => write_line(buf, prefix::SIMPLE_STRING, b"NO"),
            ReplyValue::Null => write_line(buf, prefix::SIMPLE_STRING, b"NULL"),
            ReplyValue::Error(msg) => write_line(buf, prefix::ERROR, msg.as_bytes()),
            ReplyValue::Array(values) => serialize_array_into(values, buf),
            ReplyValue::BulkString(data) => serialize_bulk_into(data.as_deref(), buf),
        }
    }
}

#[inline]
fn write_line(buf: &mut Vec<u8>, tag: u8, body: &[u8]) {
    buf.push(tag);
    buf.extend_from_slice(body);
    buf.extend_from_slice(CRLF);
}

/// Serializes an optional payload as a bulk string.
///
/// `None` becomes the protocol null `$-1\r\n`. The declared length is the
/// byte length of the payload.
pub fn serialize_bulk(data: Option<&[u8]>) -> Vec<u8> {
    let mut buf = Vec::new();
    serialize_bulk_into(data, &mut buf);
    buf
}

fn serialize_bulk_into(data: Option<&[u8]>, buf: &mut Vec<u8>) {
    match data {
        None => write_line(buf, prefix::BULK_STRING, b"-1"),
        Some(data) => {
            write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
            buf.extend_from_slice(data);
            buf.extend_from_slice(CRLF);
        }
    }
}

/// Serializes `values` as an array frame: the `*<count>` header followed by
/// each element's own frame.
pub fn serialize_array(values: &[ReplyValue]) -> Vec<u8> {
    let mut buf = Vec::new();
    serialize_array_into(values, &mut buf);
    buf
}

fn serialize_array_into(values: &[ReplyValue], buf: &mut Vec<u8>) {
    write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
    for value in values {
        value.serialize_into(buf);
    }
}

impl fmt::Display for ReplyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyValue::SimpleString(s) => write!(f, "{}", s),
            ReplyValue::Integer(n) => write!(f, "(integer) {}", n),
            ReplyValue::Boolean(b) => write!(f, "{}", if *b { "OK" } else { "NO" }),
            ReplyValue::Null => write!(f, "NULL"),
            ReplyValue::Error(s) => write!(f, "(error) {}", s),
            ReplyValue::BulkString(None) => write!(f, "(nil)"),
            ReplyValue::BulkString(Some(data)) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            ReplyValue::Array(values) => {
                if values.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, v)?;
                }
                Ok(())
            }
        }
    }
}

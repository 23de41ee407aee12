//! Frame Parser
//!
//! Turns one received frame into a [`Parsed`] value tree.
//!
//! ## Modes
//!
//! The parser runs in one of two modes:
//!
//! - [`ParseMode::Tolerant`] (what [`parse`] uses): never fails. An empty
//!   frame or an unknown type prefix yields the plain diagnostic value
//!   `"ERR unknown command"`, and malformed or truncated input degrades to
//!   partial results.
//! - [`ParseMode::Strict`]: the same grammar, but every condition the
//!   tolerant mode papers over is reported as a [`ParseError`].
//!
//! ## How Frames Are Walked
//!
//! The input is consumed header line by header line, left to right.
//! A `$<n>` header claims exactly the following line as its payload; the
//! declared length is not checked against the payload. A `*<n>` header is
//! followed by `n` sub-frames, each parsed recursively from the same
//! position. `-1` as a bulk or array length denotes null.

use crate::protocol::types::prefix;
use thiserror::Error;

/// Diagnostic value returned by tolerant parsing for unrecognized frames.
pub const UNKNOWN_COMMAND: &str = "ERR unknown command";

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

const LINE_END: &str = "\r\n";

/// Errors reported by strict parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input is empty
    #[error("empty input")]
    EmptyInput,

    /// Unknown type prefix
    #[error("unknown type prefix: {0:?}")]
    UnknownPrefix(char),

    /// A bulk or array header whose length is not an integer >= -1
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// An integer frame whose body is not an integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A line terminator or declared sub-frame is missing
    #[error("truncated frame")]
    Truncated,

    /// Arrays nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("maximum nesting depth exceeded: {0}")]
    TooDeep(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// How the parser reacts to malformed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Degrade to best-effort values, never fail.
    #[default]
    Tolerant,
    /// Report malformed input as a [`ParseError`].
    Strict,
}

/// A parsed frame.
///
/// Simple strings and bulk strings stay distinguishable so a serialized
/// reply can be parsed back into the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// `+<text>`
    Simple(String),
    /// `:<n>`
    Integer(i64),
    /// `-<message>`
    Error(String),
    /// `$<n>` followed by its payload line
    Bulk(String),
    /// `$-1` or `*-1`
    Null,
    /// `*<n>` followed by `n` sub-frames
    Array(Vec<Parsed>),
}

impl Parsed {
    /// Returns true for the diagnostic value produced by tolerant parsing.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Parsed::Simple(s) if s == UNKNOWN_COMMAND)
    }
}

/// Parses a frame in tolerant mode. Never fails.
///
/// # Example
///
/// ```
/// use emberkv::protocol::{parse, Parsed};
///
/// let parsed = parse("*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n");
/// assert_eq!(
///     parsed,
///     Parsed::Array(vec![Parsed::Bulk("ECHO".into()), Parsed::Bulk("hey".into())])
/// );
/// assert_eq!(parse("?"), Parsed::Simple("ERR unknown command".into()));
/// ```
pub fn parse(input: &str) -> Parsed {
    match parse_frame(input, ParseMode::Tolerant) {
        Ok(value) => value,
        Err(_) => unknown(),
    }
}

/// Parses a frame in the given mode.
pub fn parse_frame(input: &str, mode: ParseMode) -> ParseResult<Parsed> {
    FrameCursor::new(input, mode).parse_value(0)
}

fn unknown() -> Parsed {
    Parsed::Simple(UNKNOWN_COMMAND.to_string())
}

/// Walks a frame one line at a time.
struct FrameCursor<'a> {
    input: &'a str,
    pos: usize,
    mode: ParseMode,
}

impl<'a> FrameCursor<'a> {
    fn new(input: &'a str, mode: ParseMode) -> Self {
        Self {
            input,
            pos: 0,
            mode,
        }
    }

    fn strict(&self) -> bool {
        self.mode == ParseMode::Strict
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the next line and whether it was terminated by CRLF.
    fn next_line(&mut self) -> Option<(&'a str, bool)> {
        if self.exhausted() {
            return None;
        }
        let rest = &self.input[self.pos..];
        match rest.find(LINE_END) {
            Some(end) => {
                self.pos += end + LINE_END.len();
                Some((&rest[..end], true))
            }
            None => {
                self.pos = self.input.len();
                Some((rest, false))
            }
        }
    }

    /// In strict mode reports `err`, otherwise yields the diagnostic value.
    fn fallback(&self, err: ParseError) -> ParseResult<Parsed> {
        if self.strict() {
            Err(err)
        } else {
            Ok(unknown())
        }
    }

    fn parse_value(&mut self, depth: usize) -> ParseResult<Parsed> {
        if depth > MAX_NESTING_DEPTH {
            return self.fallback(ParseError::TooDeep(MAX_NESTING_DEPTH));
        }

        let (line, terminated) = match self.next_line() {
            Some(line) => line,
            None => return self.fallback(ParseError::EmptyInput),
        };

        let tag = match line.chars().next() {
            Some(tag) => tag,
            None => return self.fallback(ParseError::EmptyInput),
        };
        if !terminated && self.strict() {
            return Err(ParseError::Truncated);
        }
        let body = &line[tag.len_utf8()..];

        match u8::try_from(tag).unwrap_or(0) {
            prefix::BULK_STRING => self.parse_bulk(body),
            prefix::ARRAY => self.parse_array(body, depth),
            prefix::SIMPLE_STRING => Ok(Parsed::Simple(body.to_string())),
            prefix::ERROR => Ok(Parsed::Error(body.to_string())),
            prefix::INTEGER => match body.parse::<i64>() {
                Ok(n) => Ok(Parsed::Integer(n)),
                Err(_) if self.strict() => Err(ParseError::InvalidInteger(body.to_string())),
                Err(_) => Ok(Parsed::Simple(body.to_string())),
            },
            _ => self.fallback(ParseError::UnknownPrefix(tag)),
        }
    }

    /// Reads a declared length. `Ok(None)` means tolerant mode could not
    /// read one.
    fn length(&self, body: &str) -> ParseResult<Option<i64>> {
        match body.parse::<i64>() {
            Ok(n) if n >= -1 => Ok(Some(n)),
            _ if self.strict() => Err(ParseError::InvalidLength(body.to_string())),
            _ => Ok(None),
        }
    }

    /// `$<n>\r\n<payload>\r\n`
    fn parse_bulk(&mut self, body: &str) -> ParseResult<Parsed> {
        if self.length(body)? == Some(-1) {
            return Ok(Parsed::Null);
        }

        match self.next_line() {
            Some((payload, true)) => Ok(Parsed::Bulk(payload.to_string())),
            Some(_) | None if self.strict() => Err(ParseError::Truncated),
            Some((payload, false)) => Ok(Parsed::Bulk(payload.to_string())),
            None => Ok(Parsed::Bulk(String::new())),
        }
    }

    /// `*<n>\r\n<sub-frame>...`
    fn parse_array(&mut self, body: &str, depth: usize) -> ParseResult<Parsed> {
        let count = match self.length(body)? {
            Some(-1) => return Ok(Parsed::Null),
            Some(n) => n as usize,
            None => return Ok(Parsed::Array(Vec::new())),
        };

        let mut elements = Vec::new();
        for _ in 0..count {
            if self.exhausted() {
                // Tolerant mode keeps whatever sub-frames actually arrived.
                if self.strict() {
                    return Err(ParseError::Truncated);
                }
                break;
            }
            elements.push(self.parse_value(depth + 1)?);
        }

        Ok(Parsed::Array(elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{serialize_array, serialize_bulk, ReplyValue};
    use bytes::Bytes;

    fn strict(input: &str) -> ParseResult<Parsed> {
        parse_frame(input, ParseMode::Strict)
    }

    fn bulk(s: &str) -> Parsed {
        Parsed::Bulk(s.to_string())
    }

    #[test]
    fn test_parse_simple_string() {
        assert_eq!(parse("+OK\r\n"), Parsed::Simple("OK".to_string()));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse(":1000\r\n"), Parsed::Integer(1000));
        assert_eq!(parse(":-42\r\n"), Parsed::Integer(-42));
    }

    #[test]
    fn test_parse_bad_integer_keeps_text() {
        assert_eq!(parse(":abc\r\n"), Parsed::Simple("abc".to_string()));
        assert_eq!(
            strict(":abc\r\n"),
            Err(ParseError::InvalidInteger("abc".to_string()))
        );
    }

    #[test]
    fn test_parse_bulk_string() {
        assert_eq!(parse("$5\r\nhello\r\n"), bulk("hello"));
        assert_eq!(parse("$0\r\n\r\n"), bulk(""));
    }

    #[test]
    fn test_bulk_length_not_revalidated() {
        assert_eq!(parse("$2\r\nhello\r\n"), bulk("hello"));
        assert_eq!(strict("$2\r\nhello\r\n"), Ok(bulk("hello")));
    }

    #[test]
    fn test_parse_null_bulk_and_array() {
        assert_eq!(parse("$-1\r\n"), Parsed::Null);
        assert_eq!(parse("*-1\r\n"), Parsed::Null);
    }

    #[test]
    fn test_parse_command_array() {
        let parsed = parse("*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
        assert_eq!(
            parsed,
            Parsed::Array(vec![bulk("SET"), bulk("foo"), bulk("bar")])
        );
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(parse("*0\r\n"), Parsed::Array(vec![]));
    }

    #[test]
    fn test_parse_nested_array() {
        let parsed = parse("*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
        assert_eq!(
            parsed,
            Parsed::Array(vec![
                Parsed::Integer(1),
                Parsed::Array(vec![Parsed::Integer(2), Parsed::Integer(3)]),
            ])
        );
    }

    #[test]
    fn test_payload_that_looks_like_a_header() {
        let parsed = parse("*2\r\n$4\r\nECHO\r\n$2\r\n$3\r\n");
        assert_eq!(parsed, Parsed::Array(vec![bulk("ECHO"), bulk("$3")]));
    }

    #[test]
    fn test_unknown_prefix_is_tolerated() {
        assert_eq!(parse("PING\r\n"), Parsed::Simple(UNKNOWN_COMMAND.to_string()));
        assert!(parse("").is_unknown());
        assert_eq!(strict("PING\r\n"), Err(ParseError::UnknownPrefix('P')));
        assert_eq!(strict(""), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_truncated_array_keeps_received_elements() {
        let parsed = parse("*3\r\n$3\r\nSET\r\n$1\r\nk\r\n");
        assert_eq!(parsed, Parsed::Array(vec![bulk("SET"), bulk("k")]));
        assert_eq!(
            strict("*3\r\n$3\r\nSET\r\n$1\r\nk\r\n"),
            Err(ParseError::Truncated)
        );
    }

    #[test]
    fn test_truncated_bulk() {
        assert_eq!(parse("$3\r\nfoo"), bulk("foo"));
        assert_eq!(parse("$3\r\n"), bulk(""));
        assert_eq!(strict("$3\r\nfoo"), Err(ParseError::Truncated));
    }

    #[test]
    fn test_garbage_length() {
        assert_eq!(parse("*x\r\n$1\r\na\r\n"), Parsed::Array(vec![]));
        assert_eq!(parse("$x\r\nabc\r\n"), bulk("abc"));
        assert_eq!(
            strict("*x\r\n"),
            Err(ParseError::InvalidLength("x".to_string()))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "*1\r\n".repeat(MAX_NESTING_DEPTH + 2);
        assert!(matches!(strict(&deep), Err(ParseError::TooDeep(_))));

        // Tolerant mode stops descending and leaves the diagnostic value
        // at the innermost level.
        let mut expected = unknown();
        for _ in 0..=MAX_NESTING_DEPTH {
            expected = Parsed::Array(vec![expected]);
        }
        assert_eq!(parse(&deep), expected);
    }

    #[test]
    fn test_roundtrip_keeps_kinds() {
        let frame = |v: ReplyValue| String::from_utf8(v.serialize()).unwrap();

        assert_eq!(
            parse(&frame(ReplyValue::simple_string("hey"))),
            Parsed::Simple("hey".to_string())
        );
        assert_eq!(parse(&frame(ReplyValue::integer(7))), Parsed::Integer(7));
        assert_eq!(
            parse(&frame(ReplyValue::error("ERR boom"))),
            Parsed::Error("ERR boom".to_string())
        );
        assert_eq!(
            parse(&frame(ReplyValue::bulk_string(Bytes::from("hey")))),
            bulk("hey")
        );
        assert_eq!(parse(&frame(ReplyValue::optional_bulk(None))), Parsed::Null);
        assert_eq!(
            parse(&frame(ReplyValue::Boolean(true))),
            Parsed::Simple("OK".to_string())
        );
        assert_eq!(
            parse(&frame(ReplyValue::Null)),
            Parsed::Simple("NULL".to_string())
        );
    }

    #[test]
    fn test_roundtrip_array_reply() {
        let frame = serialize_array(&[
            ReplyValue::bulk_string(Bytes::from("dir")),
            ReplyValue::simple_string("x"),
            ReplyValue::integer(3),
        ]);
        let parsed = parse(std::str::from_utf8(&frame).unwrap());
        assert_eq!(
            parsed,
            Parsed::Array(vec![
                bulk("dir"),
                Parsed::Simple("x".to_string()),
                Parsed::Integer(3)
            ])
        );

        let null = serialize_bulk(None);
        assert_eq!(parse(std::str::from_utf8(&null).unwrap()), Parsed::Null);
    }
}

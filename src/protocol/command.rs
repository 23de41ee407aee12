//! Parsed client commands.

use crate::protocol::parser::{parse, Parsed};

/// An ordered list of string tokens taken from a top-level array frame.
///
/// Token 0 is the command name; the rest are positional or option
/// arguments. Any frame other than an array produces an empty command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Builds a command from raw tokens.
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// Parses a raw frame (tolerantly) and extracts its tokens.
    pub fn from_frame(frame: &str) -> Self {
        Self::from(parse(frame))
    }

    /// The upper-cased command name, if there is one.
    pub fn name(&self) -> Option<String> {
        self.tokens.first().map(|name| name.to_ascii_uppercase())
    }

    /// Returns the token at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Number of tokens, including the command name.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl From<Parsed> for Command {
    fn from(parsed: Parsed) -> Self {
        match parsed {
            Parsed::Array(elements) => Self::new(elements.into_iter().map(into_token).collect()),
            _ => Self::default(),
        }
    }
}

/// Converts one array element into a token. Nulls and nested arrays have
/// no text and become empty tokens.
fn into_token(element: Parsed) -> String {
    match element {
        Parsed::Simple(s) | Parsed::Bulk(s) | Parsed::Error(s) => s,
        Parsed::Integer(n) => n.to_string(),
        Parsed::Null | Parsed::Array(_) => String::new(),
    }
}

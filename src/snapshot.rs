//! Snapshot File Header
//!
//! A snapshot file starts with the ASCII magic `REDIS` followed by four
//! ASCII version digits. Opcode-tagged sections follow the header.
//!
//! Only the header is validated here. Section payloads are not decoded:
//! [`first_opcode`] identifies the tag of the section after the header,
//! which is where a record-level loader plugs in.

use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// The magic string every snapshot starts with.
pub const MAGIC: &[u8] = b"REDIS";

/// Magic plus four version digits.
pub const HEADER_LEN: usize = 9;

/// Opcode byte of the metadata section.
pub const OPCODE_METADATA: u8 = 0xFA;

/// Errors raised while reading a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("cannot read snapshot: {0}")]
    Io(#[from] io::Error),

    #[error("invalid snapshot magic, expected \"REDIS\"")]
    BadMagic,

    #[error("invalid snapshot version: {0:?}")]
    BadVersion(String),

    #[error("snapshot header truncated: {0} of 9 bytes")]
    Truncated(usize),
}

/// The validated snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u32,
}

/// A section tag found after the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// `0xFA`, auxiliary metadata
    Metadata,
    /// Any tag not recognized yet
    Unknown(u8),
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            OPCODE_METADATA => Opcode::Metadata,
            other => Opcode::Unknown(other),
        }
    }
}

/// Validates the header at the start of `bytes`.
///
/// # Example
///
/// ```
/// use emberkv::snapshot::{load_header, SnapshotError};
///
/// assert_eq!(load_header(b"REDIS0011").unwrap().version, 11);
/// assert!(matches!(load_header(b"NOTRDB001"), Err(SnapshotError::BadMagic)));
/// ```
pub fn load_header(bytes: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    let magic_len = bytes.len().min(MAGIC.len());
    if bytes[..magic_len] != MAGIC[..magic_len] {
        return Err(SnapshotError::BadMagic);
    }
    if bytes.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated(bytes.len()));
    }

    let digits = &bytes[MAGIC.len()..HEADER_LEN];
    let text = String::from_utf8_lossy(digits);
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(SnapshotError::BadVersion(text.into_owned()));
    }
    let version = text
        .parse()
        .map_err(|_| SnapshotError::BadVersion(text.to_string()))?;

    Ok(SnapshotHeader { version })
}

/// Returns the opcode of the first section, or `None` if the file ends
/// right after the header.
pub fn first_opcode(bytes: &[u8]) -> Result<Option<Opcode>, SnapshotError> {
    load_header(bytes)?;
    Ok(bytes.get(HEADER_LEN).copied().map(Opcode::from_byte))
}

/// Reads and validates the header of the snapshot at `path`.
///
/// A missing file is not an error: the server simply starts without a
/// snapshot and `Ok(None)` is returned.
pub fn read_header(path: &Path) -> Result<Option<SnapshotHeader>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    load_header(&bytes).map(Some)
}

//! Server Configuration
//!
//! Two layers live here:
//!
//! - [`ServerOptions`]: command-line options consumed once at startup.
//! - [`ConfigStore`]: the read-only `dir` / `dbfilename` pair exposed to
//!   clients through `CONFIG GET`. Opening it validates the header of the
//!   snapshot file at `dir/dbfilename`.

use crate::snapshot::{self, SnapshotError, SnapshotHeader};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Default snapshot directory.
pub const DEFAULT_DIR: &str = "/tmp/redis-files";

/// Default snapshot file name.
pub const DEFAULT_DBFILENAME: &str = "dump.rdb";

/// Errors in command-line options.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Startup options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Snapshot directory
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            dir: DEFAULT_DIR.to_string(),
            dbfilename: DEFAULT_DBFILENAME.to_string(),
        }
    }
}

/// What the command line asks the process to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsAction {
    Run(ServerOptions),
    Help,
    Version,
}

impl ServerOptions {
    /// Parses options from the arguments following the program name.
    pub fn parse<I>(args: I) -> Result<OptionsAction, OptionsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = ServerOptions::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| OptionsError::MissingValue(arg.clone()));

            match arg.as_str() {
                "--host" | "-h" => options.host = value()?,
                "--port" | "-p" => {
                    let raw = value()?;
                    options.port = raw.parse().map_err(|_| OptionsError::InvalidPort(raw))?;
                }
                "--dir" => options.dir = value()?,
                "--dbfilename" => options.dbfilename = value()?,
                "--help" => return Ok(OptionsAction::Help),
                "--version" | "-v" => return Ok(OptionsAction::Version),
                _ => return Err(OptionsError::UnknownArgument(arg)),
            }
        }

        Ok(OptionsAction::Run(options))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read-only configuration served by `CONFIG GET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    dir: String,
    dbfilename: String,
    snapshot: Option<SnapshotHeader>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_DIR, DEFAULT_DBFILENAME)
    }
}

impl ConfigStore {
    /// Builds the store without touching the filesystem.
    pub fn new(dir: impl Into<String>, dbfilename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            dbfilename: dbfilename.into(),
            snapshot: None,
        }
    }

    /// Builds the store and validates the snapshot header at
    /// `dir/dbfilename`.
    ///
    /// A missing snapshot file is accepted. An unreadable file or an
    /// invalid header is an error, and the server must not start.
    pub fn open(dir: impl Into<String>, dbfilename: impl Into<String>) -> Result<Self, SnapshotError> {
        let mut store = Self::new(dir, dbfilename);
        let path = store.snapshot_path();

        store.snapshot = snapshot::read_header(&path)?;
        match store.snapshot {
            Some(header) => info!(path = %path.display(), version = header.version, "Snapshot header validated"),
            None => info!(path = %path.display(), "No snapshot file, starting empty"),
        }

        Ok(store)
    }

    /// Opens the store described by startup options.
    pub fn from_options(options: &ServerOptions) -> Result<Self, SnapshotError> {
        Self::open(options.dir.clone(), options.dbfilename.clone())
    }

    /// Returns the value of a configuration key.
    ///
    /// Only `dir` and `dbfilename` exist; the match ignores ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("dir") {
            Some(&self.dir)
        } else if key.eq_ignore_ascii_case("dbfilename") {
            Some(&self.dbfilename)
        } else {
            None
        }
    }

    /// `dir/dbfilename`
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }

    /// The validated snapshot header, if a snapshot file was found.
    pub fn snapshot(&self) -> Option<SnapshotHeader> {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_options() {
        let options = match ServerOptions::parse(args(&[])).unwrap() {
            OptionsAction::Run(options) => options,
            other => panic!("expected Run, got {:?}", other),
        };
        assert_eq!(options.bind_address(), "127.0.0.1:6379");
        assert_eq!(options.dir, "/tmp/redis-files");
        assert_eq!(options.dbfilename, "dump.rdb");
    }

    #[test]
    fn test_parse_all_options() {
        let action = ServerOptions::parse(args(&[
            "--dir", "/data", "--dbfilename", "snap.rdb", "-p", "6380", "--host", "0.0.0.0",
        ]))
        .unwrap();
        assert_eq!(
            action,
            OptionsAction::Run(ServerOptions {
                host: "0.0.0.0".to_string(),
                port: 6380,
                dir: "/data".to_string(),
                dbfilename: "snap.rdb".to_string(),
            })
        );
    }

    #[test]
    fn test_option_errors() {
        assert_eq!(
            ServerOptions::parse(args(&["--dir"])),
            Err(OptionsError::MissingValue("--dir".to_string()))
        );
        assert_eq!(
            ServerOptions::parse(args(&["--port", "http"])),
            Err(OptionsError::InvalidPort("http".to_string()))
        );
        assert_eq!(
            ServerOptions::parse(args(&["--verbose"])),
            Err(OptionsError::UnknownArgument("--verbose".to_string()))
        );
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(ServerOptions::parse(args(&["--help"])), Ok(OptionsAction::Help));
        assert_eq!(ServerOptions::parse(args(&["-v"])), Ok(OptionsAction::Version));
    }

    #[test]
    fn test_config_get() {
        let config = ConfigStore::new("/var/lib/ember", "dump.rdb");
        assert_eq!(config.get("dir"), Some("/var/lib/ember"));
        assert_eq!(config.get("DBFILENAME"), Some("dump.rdb"));
        assert_eq!(config.get("maxmemory"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = ConfigStore::default();
        assert_eq!(config.get("dir"), Some(DEFAULT_DIR));
        assert_eq!(config.get("dbfilename"), Some(DEFAULT_DBFILENAME));
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/redis-files/dump.rdb"));
    }

    #[test]
    fn test_open_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigStore::open(dir.path().to_string_lossy(), "dump.rdb").unwrap();
        assert_eq!(config.snapshot(), None);
    }

    #[test]
    fn test_open_with_valid_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dump.rdb"), b"REDIS0011\xFA").unwrap();

        let config = ConfigStore::open(dir.path().to_string_lossy(), "dump.rdb").unwrap();
        assert_eq!(config.snapshot(), Some(SnapshotHeader { version: 11 }));
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dump.rdb"), b"NOTREDIS!").unwrap();

        let result = ConfigStore::open(dir.path().to_string_lossy(), "dump.rdb");
        assert!(matches!(result, Err(SnapshotError::BadMagic)));
    }
}

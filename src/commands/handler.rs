//! Command Dispatcher
//!
//! Receives one raw frame, parses it into a [`Command`], checks arity and
//! runs it against the shared [`StorageEngine`] / [`ConfigStore`].
//!
//! ## Supported Commands
//!
//! | Command                     | Min tokens | Reply                         |
//! |-----------------------------|-----------:|-------------------------------|
//! | `PING`                      | 1          | `+PONG`                       |
//! | `ECHO message`              | 2          | `+message`                    |
//! | `GET key`                   | 2          | bulk string or `$-1`          |
//! | `SET key value [PX ms]`     | 3          | `+OK`                         |
//! | `CONFIG GET parameter`      | 3          | `*2` of parameter and value   |
//!
//! Extra trailing arguments are ignored. Anything else is answered with
//! `-ERR unknown command`. Command-level failures never escape as Rust
//! errors; they are written back as error replies and leave the store
//! untouched.

use crate::config::ConfigStore;
use crate::protocol::{Command, ReplyValue};
use crate::storage::{now_millis, StorageEngine};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Client-visible command failures. The `Display` text is the exact error
/// message sent on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command")]
    UnknownCommand,

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR unknown CONFIG subcommand")]
    UnknownConfigSubcommand,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
}

impl From<CommandError> for ReplyValue {
    fn from(err: CommandError) -> Self {
        ReplyValue::error(err.to_string())
    }
}

type CommandResult = Result<ReplyValue, CommandError>;

/// Minimum number of tokens, command name included.
fn min_arity(name: &str) -> Option<usize> {
    match name {
        "PING" => Some(1),
        "ECHO" | "GET" | "CONFIG" => Some(2),
        "SET" => Some(3),
        _ => None,
    }
}

/// Dispatches commands to the store and the configuration.
///
/// Cloning is cheap: every clone shares the same store and configuration,
/// so one handler is built at startup and cloned into each connection.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    config: Arc<ConfigStore>,
}

impl CommandHandler {
    /// Creates a handler over the process-wide store and configuration.
    pub fn new(storage: Arc<StorageEngine>, config: Arc<ConfigStore>) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Handles one raw frame and returns the raw reply frame.
    ///
    /// The frame is decoded as UTF-8 lossily: invalid sequences become
    /// U+FFFD, so binary values are not stored byte for byte.
    ///
    /// # Example
    ///
    /// ```
    /// use emberkv::commands::CommandHandler;
    /// use emberkv::config::ConfigStore;
    /// use emberkv::storage::StorageEngine;
    /// use std::sync::Arc;
    ///
    /// let handler = CommandHandler::new(
    ///     Arc::new(StorageEngine::new()),
    ///     Arc::new(ConfigStore::default()),
    /// );
    /// assert_eq!(handler.run(b"*1\r\n$4\r\nPING\r\n"), b"+PONG\r\n");
    /// ```
    pub fn run(&self, frame: &[u8]) -> Vec<u8> {
        let text = String::from_utf8_lossy(frame);
        self.execute(&Command::from_frame(&text)).serialize()
    }

    /// Executes a parsed command and returns the reply.
    pub fn execute(&self, command: &Command) -> ReplyValue {
        self.dispatch(command).unwrap_or_else(ReplyValue::from)
    }

    fn dispatch(&self, cmd: &Command) -> CommandResult {
        let name = cmd.name().ok_or(CommandError::UnknownCommand)?;
        let min = min_arity(&name).ok_or(CommandError::UnknownCommand)?;
        if cmd.len() < min {
            return Err(CommandError::WrongArity(name.to_ascii_lowercase()));
        }

        trace!(command = %name, args = cmd.len() - 1, "Dispatching command");

        match name.as_str() {
            "PING" => Ok(ReplyValue::pong()),
            "ECHO" => Ok(ReplyValue::simple_string(arg(cmd, 1))),
            "GET" => self.cmd_get(cmd),
            "SET" => self.cmd_set(cmd),
            "CONFIG" => self.cmd_config(cmd),
            _ => Err(CommandError::UnknownCommand),
        }
    }

    /// GET key
    fn cmd_get(&self, cmd: &Command) -> CommandResult {
        let key = Bytes::from(arg(cmd, 1).to_string());
        Ok(ReplyValue::optional_bulk(self.storage.get(&key)))
    }

    /// SET key value [option value ...]
    ///
    /// Options are read as `(name, value)` pairs from the fourth token on.
    /// `PX <milliseconds>` sets the expiry; other names are ignored.
    fn cmd_set(&self, cmd: &Command) -> CommandResult {
        let mut expires_at = None;

        let mut i = 3;
        while let Some(option) = cmd.arg(i) {
            if option.eq_ignore_ascii_case("PX") {
                let raw = cmd.arg(i + 1).ok_or(CommandError::Syntax)?;
                let ms = raw
                    .parse::<u64>()
                    .ok()
                    .filter(|&ms| ms > 0)
                    .ok_or_else(|| CommandError::InvalidExpireTime("set".to_string()))?;
                expires_at = Some(now_millis().saturating_add(ms));
            }
            i += 2;
        }

        let key = Bytes::from(arg(cmd, 1).to_string());
        let value = Bytes::from(arg(cmd, 2).to_string());
        match expires_at {
            Some(at) => self.storage.set_with_expiry(key, value, at),
            None => self.storage.set(key, value),
        };

        Ok(ReplyValue::ok())
    }

    /// CONFIG GET parameter
    fn cmd_config(&self, cmd: &Command) -> CommandResult {
        if !arg(cmd, 1).eq_ignore_ascii_case("GET") {
            return Err(CommandError::UnknownConfigSubcommand);
        }
        if cmd.len() < 3 {
            return Err(CommandError::WrongArity("config|get".to_string()));
        }

        let key = arg(cmd, 2);
        let value = self.config.get(key).map(|v| Bytes::from(v.to_string()));
        Ok(ReplyValue::array(vec![
            ReplyValue::bulk_string(key.to_string()),
            ReplyValue::optional_bulk(value),
        ]))
    }
}

/// Token at `index`, which the arity check guarantees is present.
fn arg(cmd: &Command, index: usize) -> &str {
    cmd.arg(index).unwrap_or_default()
}

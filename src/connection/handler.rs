//! Connection Handler
//!
//! Each accepted client gets its own task running a read → dispatch →
//! write loop until the client disconnects.
//!
//! ## Framing
//!
//! Reads accumulate until the buffer holds one complete frame (up to
//! [`MAX_BUFFER_SIZE`] bytes). The frame is dispatched, its reply is
//! written and flushed, and only then is the next frame read. Replies on
//! one connection therefore go out in the order the frames arrived. If the
//! client closes mid-frame, whatever arrived is dispatched as is.

use crate::commands::CommandHandler;
use crate::protocol::{parse_frame, ParseError, ParseMode};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Maximum size of a single frame
pub const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial read buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total frames processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    buffer: BytesMut,

    /// Shares the process-wide store with every other connection
    command_handler: CommandHandler,

    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            stats,
        }
    }

    /// Runs the connection loop until the client disconnects or an I/O
    /// error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.read_frame().await?;

            let reply = self.command_handler.run(&self.buffer);
            self.buffer.clear();
            self.stats.command_processed();

            self.send_reply(&reply).await?;
        }
    }

    /// Reads into the (empty) buffer until it holds a complete frame.
    async fn read_frame(&mut self) -> Result<(), ConnectionError> {
        loop {
            if self.buffer.len() >= MAX_BUFFER_SIZE {
                error!(
                    client = %self.addr,
                    size = self.buffer.len(),
                    "Buffer size limit exceeded"
                );
                return Err(ConnectionError::BufferFull);
            }
            self.buffer.reserve(MAX_BUFFER_SIZE - self.buffer.len());

            let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Err(ConnectionError::ClientDisconnected);
                }
                debug!(client = %self.addr, bytes = self.buffer.len(), "EOF inside a frame");
                return Ok(());
            }

            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, "Read data");

            if !is_incomplete(&self.buffer) {
                return Ok(());
            }
        }
    }

    async fn send_reply(&mut self, reply: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(reply).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(reply.len());
        trace!(client = %self.addr, bytes = reply.len(), "Sent reply");
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Client disconnected")]
    ClientDisconnected,

    #[error("Frame exceeds {} bytes", MAX_BUFFER_SIZE)]
    BufferFull,
}

/// True while the buffered bytes are a prefix of a longer frame.
fn is_incomplete(buffer: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buffer);
    matches!(
        parse_frame(&text, ParseMode::Strict),
        Err(ParseError::Truncated)
    )
}

/// Runs a connection handler for an accepted TCP stream to completion.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    // Outcome already logged by `run`.
    let _ = handler.run().await;
}

//! Connection Handler
//!
//! Handles individual client connections: one dedicated thread drives
//! the receive loop, drains complete frames through the codec, and
//! dispatches each decoded message.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;

use crate::error::{FramecastError, Result};
use crate::network::server::ServerState;
use crate::protocol::{decode_message, encode_message, Message};

/// Name reported in `echoed_by` fields
pub const SERVER_NAME: &str = "Framecast Server";

/// The shareable write half of a connection
///
/// Held by the registry for broadcast fan-out while the receive loop
/// owns the read half. Sends from the connection's own dispatch and
/// from other connections' broadcast threads are serialized by the
/// writer mutex so frame bytes are never interleaved on the wire.
pub struct ConnectionHandle {
    /// Identity: remote endpoint as `address:port`
    client_id: String,

    /// Write half, locked per send
    writer: Mutex<TcpStream>,

    /// Dedicated handle for shutdown, outside the writer lock so a
    /// send blocked on a full peer buffer cannot stall `close`
    shutdown_handle: TcpStream,

    /// Cleared exactly once on close
    open: AtomicBool,
}

impl ConnectionHandle {
    pub fn new(client_id: String, writer: TcpStream) -> Result<Self> {
        let shutdown_handle = writer.try_clone()?;
        Ok(Self {
            client_id,
            writer: Mutex::new(writer),
            shutdown_handle,
            open: AtomicBool::new(true),
        })
    }

    /// The connection's identity
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the connection has not been closed yet
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Encode and write one message
    ///
    /// Synchronous encode-then-write; the writer lock is held for the
    /// duration of the write so concurrent senders cannot interleave.
    pub fn send(&self, message: &Message) -> Result<()> {
        if !self.is_open() {
            return Err(FramecastError::ConnectionClosed);
        }

        let frame = encode_message(message);
        let mut writer = self.writer.lock();
        writer.write_all(&frame)?;
        writer.flush()?;

        tracing::trace!("Sent {} to {}", message.tag(), self.client_id);
        Ok(())
    }

    /// Shut the socket down (idempotent)
    ///
    /// Unblocks the receive loop's pending read; repeated calls have
    /// no additional effect.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.shutdown_handle.shutdown(Shutdown::Both);
            tracing::debug!("Closed connection {}", self.client_id);
        }
    }
}

/// A server-side connection: read half, shared write handle, and the
/// inbound accumulation buffer
pub struct Connection {
    reader: TcpStream,
    handle: Arc<ConnectionHandle>,
    state: Arc<ServerState>,
    buffer: BytesMut,
}

impl Connection {
    /// Wrap an accepted socket
    ///
    /// Splits the stream into a read half (owned by the receive loop)
    /// and a write half (shared through the handle), disables Nagle,
    /// and applies the configured idle timeout.
    pub fn accept(stream: TcpStream, state: Arc<ServerState>) -> Result<Self> {
        let client_id = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let idle_ms = state.config().idle_timeout_ms;
        if idle_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(idle_ms)))?;
        }

        let writer = stream.try_clone()?;
        let handle = Arc::new(ConnectionHandle::new(client_id, writer)?);

        Ok(Self {
            reader: stream,
            handle,
            state,
            buffer: BytesMut::new(),
        })
    }

    /// The shareable write half (registered with the registry)
    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    /// The connection's identity
    pub fn client_id(&self) -> &str {
        self.handle.client_id()
    }

    /// Drive the connection for its whole lifetime
    ///
    /// Sends the one-time welcome, runs the receive loop, and always
    /// runs teardown exactly once whichever way the loop exits.
    pub fn run(mut self) {
        tracing::debug!("Client connected: {}", self.client_id());

        if let Err(e) = self.handle.send(&Message::welcome(self.client_id())) {
            tracing::debug!("Failed to send welcome to {}: {}", self.client_id(), e);
        } else if let Err(e) = self.receive_loop() {
            // A peer that vanished before we could reply is routine
            let vanished = matches!(&e, FramecastError::ConnectionClosed)
                || matches!(
                    &e,
                    FramecastError::Io(io_err) if matches!(
                        io_err.kind(),
                        std::io::ErrorKind::BrokenPipe
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                    )
                );
            if vanished {
                tracing::debug!("Client {} disconnected: {}", self.client_id(), e);
            } else {
                tracing::warn!("Error handling client {}: {}", self.client_id(), e);
            }
        }

        self.cleanup();
    }

    /// Read chunks, drain complete frames, dispatch messages
    fn receive_loop(&mut self) -> Result<()> {
        let chunk_size = self.state.config().read_chunk_size;
        let max_frame = self.state.config().max_frame_size;
        let mut chunk = vec![0u8; chunk_size];

        loop {
            let n = match self.reader.read(&mut chunk) {
                Ok(0) => {
                    // Zero-length read: peer shut down its side
                    tracing::debug!("Client {} disconnected", self.client_id());
                    return Ok(());
                }
                Ok(n) => n,
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    tracing::debug!("Read timeout for client {}", self.client_id());
                    return Ok(());
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::ConnectionReset
                        || e.kind() == std::io::ErrorKind::ConnectionAborted =>
                {
                    tracing::debug!("Client {} disconnected abruptly", self.client_id());
                    return Ok(());
                }
                Err(e) => {
                    if !self.handle.is_open() {
                        // Read unblocked by our own close during shutdown
                        return Ok(());
                    }
                    return Err(e.into());
                }
            };

            self.buffer.extend_from_slice(&chunk[..n]);

            // Drain every complete frame before blocking on the next read
            while let Some(message) = decode_message(&mut self.buffer, max_frame)? {
                self.dispatch(message)?;
            }
        }
    }

    /// Route one decoded message to its handler
    fn dispatch(&self, message: Message) -> Result<()> {
        tracing::trace!("Received {} from {}", message.tag(), self.client_id());

        match message {
            Message::Ping { timestamp, .. } => self
                .handle
                .send(&Message::pong(Some(timestamp), self.client_id())),
            Message::Echo { content, .. } => self
                .handle
                .send(&Message::echo_response(content, SERVER_NAME)),
            Message::Broadcast { content, .. } => self.handle_broadcast(content),
            Message::GetStats { .. } => self.handle.send(&self.state.stats_message()),
            Message::RawText(text) => self.handle.send(&Message::text_echo(text)),
            // Default fallback: echo the original message back wrapped
            other => self.handle.send(&Message::response_to(other.to_value())),
        }
    }

    /// Fan the content out to every other live connection and confirm
    /// to the sender
    fn handle_broadcast(&self, content: String) -> Result<()> {
        let outbound = Message::broadcast_from(self.client_id(), content);
        let report = self
            .state
            .registry()
            .broadcast(&outbound, Some(self.client_id()));

        self.state.record_broadcast(report.delivered);

        self.handle
            .send(&Message::broadcast_sent(report.recipients))
    }

    /// Teardown: deregister, close the socket, release the buffer
    ///
    /// Runs exactly once per connection; both steps are idempotent so
    /// a concurrent server shutdown cannot double-free anything.
    fn cleanup(&mut self) {
        self.state.registry().remove(self.client_id());
        self.handle.close();
        self.buffer = BytesMut::new();
        tracing::debug!("Client {} cleaned up", self.client_id());
    }
}

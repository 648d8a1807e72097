//! TCP Client
//!
//! Owns one outbound connection plus a send API and a caller-supplied
//! message callback. The receive loop mirrors the server side but
//! delivers every decoded message to the callback instead of protocol
//! dispatch.

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::BytesMut;
use serde_json::Value;

use crate::config::Config;
use crate::error::{FramecastError, Result};
use crate::network::ConnectionHandle;
use crate::protocol::{decode_message, Message};

struct ClientInner {
    handle: Arc<ConnectionHandle>,
    receive_thread: Option<JoinHandle<()>>,
}

/// Client for the framed message protocol
pub struct Client {
    config: Config,
    inner: Option<ClientInner>,
}

impl Client {
    /// Create a client (not yet connected)
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: None,
        }
    }

    /// Open the connection and start the receive loop
    ///
    /// Every message decoded off the socket is handed to `callback`
    /// on the receive thread, in arrival order.
    pub fn connect<F>(&mut self, callback: F) -> Result<()>
    where
        F: Fn(Message) + Send + 'static,
    {
        if self.inner.is_some() {
            return Err(FramecastError::Network("already connected".to_string()));
        }

        let stream = TcpStream::connect(self.config.addr().as_str())?;
        stream.set_nodelay(true)?;

        let client_id = stream
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "client".to_string());

        let writer = stream.try_clone()?;
        let handle = Arc::new(ConnectionHandle::new(client_id, writer)?);

        let loop_handle = Arc::clone(&handle);
        let chunk_size = self.config.read_chunk_size;
        let max_frame = self.config.max_frame_size;

        let receive_thread = thread::Builder::new()
            .name("framecast-client-recv".to_string())
            .spawn(move || receive_loop(stream, loop_handle, chunk_size, max_frame, callback))?;

        self.inner = Some(ClientInner {
            handle,
            receive_thread: Some(receive_thread),
        });

        tracing::info!("Connected to {}", self.config.addr());
        Ok(())
    }

    /// Whether the connection is currently open
    pub fn is_connected(&self) -> bool {
        self.inner
            .as_ref()
            .map(|inner| inner.handle.is_open())
            .unwrap_or(false)
    }

    /// Send an arbitrary message
    pub fn send(&self, message: &Message) -> Result<()> {
        let inner = self.inner.as_ref().ok_or(FramecastError::NotConnected)?;
        inner.handle.send(message)
    }

    /// Send a heartbeat ping
    pub fn ping(&self) -> Result<()> {
        let info = format!("Framecast Client {}", self.config.addr());
        self.send(&Message::ping(Some(info)))
    }

    /// Ask the server to echo `content` back
    pub fn echo(&self, content: impl Into<String>) -> Result<()> {
        self.send(&Message::echo(content))
    }

    /// Ask the server to broadcast `content` to all other clients
    pub fn broadcast(&self, content: impl Into<String>) -> Result<()> {
        self.send(&Message::broadcast(content))
    }

    /// Request server statistics
    pub fn get_stats(&self) -> Result<()> {
        self.send(&Message::get_stats())
    }

    /// Send a custom-typed message with extra fields
    pub fn send_custom(&self, msg_type: &str, fields: Value) -> Result<()> {
        self.send(&Message::custom(msg_type, fields))
    }

    /// Send a plain-text payload (no JSON envelope)
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(&Message::RawText(text.into()))
    }

    /// Close the connection and join the receive loop (idempotent)
    ///
    /// No callback fires after this returns.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };

        inner.handle.close();

        if let Some(receive_thread) = inner.receive_thread.take() {
            let _ = receive_thread.join();
        }

        tracing::info!("Disconnected from {}", self.config.addr());
        Ok(())
    }
}

/// Background receive loop delivering decoded messages to the callback
fn receive_loop<F>(
    mut stream: TcpStream,
    handle: Arc<ConnectionHandle>,
    chunk_size: usize,
    max_frame: usize,
    callback: F,
) where
    F: Fn(Message),
{
    let mut buffer = BytesMut::new();
    let mut chunk = vec![0u8; chunk_size];

    'outer: loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                tracing::debug!("Server closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                if handle.is_open() {
                    tracing::warn!("Error receiving messages: {}", e);
                }
                break;
            }
        };

        buffer.extend_from_slice(&chunk[..n]);

        loop {
            match decode_message(&mut buffer, max_frame) {
                Ok(Some(message)) => callback(message),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Closing connection: {}", e);
                    break 'outer;
                }
            }
        }
    }

    handle.close();
}

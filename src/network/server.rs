//! TCP Server
//!
//! Accepts connections and spawns one thread per client.
//!
//! ## Lifecycle
//! `Stopped -> Listening -> Stopped`. Bind failure is fatal to
//! startup and leaves no partial state. Shutdown is cooperative: the
//! running flag is cleared, every registered connection is closed
//! before the listening socket, and the accept loop is unblocked by a
//! throwaway local connection.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::Config;
use crate::error::{FramecastError, Result};
use crate::network::connection::Connection;
use crate::network::registry::Registry;
use crate::protocol::Message;

/// State shared between the accept loop and every connection thread
pub struct ServerState {
    config: Config,
    registry: Registry,

    /// Fixed at server start, for uptime and the stats reply
    started_at: Instant,
    started_wall: DateTime<Utc>,

    /// Cumulative broadcast-recipient counter, one per delivery
    messages_sent: AtomicU64,
}

impl ServerState {
    fn new(config: Config) -> Self {
        Self {
            config,
            registry: Registry::new(),
            started_at: Instant::now(),
            started_wall: Utc::now(),
            messages_sent: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wall-clock seconds since the server started
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Total broadcast messages delivered so far
    pub fn total_messages(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub(crate) fn record_broadcast(&self, delivered: usize) {
        self.messages_sent
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    /// Aggregate current stats into a `server_stats` message
    ///
    /// Computed at request time, not independently persisted.
    pub fn stats_message(&self) -> Message {
        Message::ServerStats {
            connected_clients: self.registry.len(),
            uptime_seconds: self.uptime_seconds(),
            total_messages: self.total_messages(),
            server_start_time: self
                .started_wall
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            current_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

/// Multi-client TCP server speaking the framed message protocol
pub struct Server {
    config: Config,
    state: Arc<ServerState>,
    running: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
    accept_thread: Option<JoinHandle<()>>,
}

impl Server {
    /// Create a server (not yet listening)
    pub fn new(config: Config) -> Self {
        let state = Arc::new(ServerState::new(config.clone()));
        Self {
            config,
            state,
            running: Arc::new(AtomicBool::new(false)),
            local_addr: None,
            accept_thread: None,
        }
    }

    /// Bind, listen, and spawn the accept loop
    ///
    /// Returns once the listener is live; `local_addr` is then valid
    /// even when the configured port was 0.
    pub fn start(&mut self) -> Result<()> {
        if self.accept_thread.is_some() {
            return Err(FramecastError::Network("server already running".to_string()));
        }

        let listener = TcpListener::bind(self.config.addr().as_str())?;
        let local_addr = listener.local_addr()?;

        // Fresh registry and clocks for this run
        self.state = Arc::new(ServerState::new(self.config.clone()));
        self.local_addr = Some(local_addr);
        self.running.store(true, Ordering::Release);

        let state = Arc::clone(&self.state);
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("framecast-accept".to_string())
            .spawn(move || accept_loop(listener, state, running))?;

        self.accept_thread = Some(handle);

        tracing::info!("Framecast server listening on {}", local_addr);
        Ok(())
    }

    /// Start and block until the accept loop exits
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        if let Some(handle) = self.accept_thread.take() {
            handle
                .join()
                .map_err(|_| FramecastError::Network("accept loop panicked".to_string()))?;
        }
        Ok(())
    }

    /// The bound address (valid after `start`)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.local_addr
            .ok_or_else(|| FramecastError::Network("server not started".to_string()))
    }

    /// Shared state handle, for stats and inspection
    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Graceful shutdown (idempotent)
    ///
    /// Closes every client connection, then unblocks and joins the
    /// accept loop, which drops the listening socket on exit.
    pub fn stop(&mut self) -> Result<()> {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        if was_running {
            tracing::info!("Shutting down Framecast server...");
        }

        // Client sockets close before the listener
        self.state.registry().close_all();

        if let Some(addr) = self.local_addr.take() {
            // Wake the accept loop so it observes the cleared flag
            let _ = TcpStream::connect(addr);
        }

        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }

        // A connection accepted in the shutdown window may have been
        // registered after the first sweep
        self.state.registry().close_all();

        if was_running {
            tracing::info!("Framecast server stopped");
        }
        Ok(())
    }
}

/// Accept incoming connections until the running flag clears
fn accept_loop(listener: TcpListener, state: Arc<ServerState>, running: Arc<AtomicBool>) {
    for stream in listener.incoming() {
        if !running.load(Ordering::Acquire) {
            break;
        }

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("Error accepting connection: {}", e);
                continue;
            }
        };

        let connection = match Connection::accept(stream, Arc::clone(&state)) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!("Failed to set up connection: {}", e);
                continue;
            }
        };

        // Register before the connection thread starts so a broadcast
        // issued during the welcome already sees this client
        let client_id = connection.client_id().to_string();
        let handle = Arc::clone(connection.handle());
        state.registry().insert(handle);

        let spawn_result = thread::Builder::new()
            .name(format!("framecast-conn-{client_id}"))
            .spawn(move || connection.run());

        if let Err(e) = spawn_result {
            tracing::warn!("Failed to spawn thread for {}: {}", client_id, e);
            if let Some(handle) = state.registry().remove(&client_id) {
                handle.close();
            }
        }
    }

    tracing::debug!("Accept loop exited");
}

//! Configuration for Framecast
//!
//! Centralized configuration with sensible defaults, shared by the
//! server and the client.

use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Configuration for a Framecast server or client
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host to bind (server) or connect to (client)
    pub host: String,

    /// TCP port (0 on the server side picks an ephemeral port)
    pub port: u16,

    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of bytes pulled off the socket per read
    pub read_chunk_size: usize,

    /// Maximum declared frame payload size before the connection
    /// is closed as misbehaving
    pub max_frame_size: usize,

    /// Read idle timeout in milliseconds (0 = no timeout)
    pub idle_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9999,
            read_chunk_size: 4096,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            idle_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The `host:port` address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the socket read chunk size (in bytes)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.config.read_chunk_size = size;
        self
    }

    /// Set the maximum accepted frame payload size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the read idle timeout (in milliseconds, 0 disables it)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

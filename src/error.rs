//! Error types for Framecast
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using FramecastError
pub type Result<T> = std::result::Result<T, FramecastError>;

/// Unified error type for Framecast operations
#[derive(Debug, Error)]
pub enum FramecastError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Frame too large: declared {declared} bytes (max {max})")]
    FrameTooLarge { declared: usize, max: usize },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,
}

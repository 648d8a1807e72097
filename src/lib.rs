//! # Framecast
//!
//! A length-prefixed message protocol over raw TCP, with:
//! - Binary framing: 4-byte big-endian length prefix + UTF-8 payload
//! - Typed JSON messages with a raw-text fallback
//! - A concurrent multi-client server with broadcast fan-out
//! - Ping/pong heartbeat and server statistics
//! - A client with a user-supplied message callback
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TCP Server                             │
//! │        (accept loop, one thread per connection)              │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │
//! ┌───────────────────────────▼──────────────────────────────────┐
//! │                  Connection Registry                         │
//! │       (mutex-guarded map, snapshot-then-fan-out)             │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │
//!              ┌──────────────┴──────────────┐
//!              │                             │
//!              ▼                             ▼
//!       ┌─────────────┐               ┌─────────────┐
//!       │ Frame Codec │               │  Dispatch   │
//!       │ (pure fns)  │               │ (per type)  │
//!       └─────────────┘               └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::Client;
pub use config::Config;
pub use error::{FramecastError, Result};
pub use network::{Registry, Server, ServerState};
pub use protocol::Message;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Framecast
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌──────────────────┬─────────────────────────────┐
//! │ Length (4 bytes, │ Payload (length bytes,      │
//! │ big-endian u32)  │ UTF-8 JSON or raw text)     │
//! └──────────────────┴─────────────────────────────┘
//! ```
//!
//! ## Message Envelope
//! Structured payloads are JSON objects with a `type` tag and a
//! `timestamp`. Recognized tags: `welcome`, `ping`, `pong`, `echo`,
//! `echo_response`, `broadcast`, `broadcast_sent`, `get_stats`,
//! `server_stats`, `response`. Non-JSON payloads are carried as raw
//! text.

mod message;
mod codec;

pub use message::{timestamp_now, Message};
pub use codec::{
    decode_message, encode_message, DEFAULT_MAX_FRAME_SIZE, LENGTH_PREFIX_SIZE,
};

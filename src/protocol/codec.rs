//! Frame codec
//!
//! Pure encoding and decoding between messages and the wire format.
//! No I/O and no state: the connection owns the buffer, the codec
//! only inspects and consumes it.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────┐
//! │ Length (4 bytes, │ Payload (length bytes,      │
//! │ big-endian u32)  │ UTF-8 JSON or raw text)     │
//! └──────────────────┴─────────────────────────────┘
//! ```
//!
//! A frame is complete only when the buffer holds the 4-byte header
//! plus the declared payload. Payloads that parse as a JSON object
//! become typed messages; everything else degrades to
//! [`Message::RawText`] — malformed JSON is never a decode error.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FramecastError, Result};
use super::Message;

/// Length prefix size: 4-byte big-endian payload length
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum payload size (16 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode a message into a single frame
///
/// Structured messages are JSON-serialized; [`Message::RawText`]
/// payloads are written as their raw bytes. Never fails for a valid
/// in-memory message.
pub fn encode_message(message: &Message) -> Bytes {
    let payload: Vec<u8> = match message {
        Message::RawText(text) => text.as_bytes().to_vec(),
        structured => structured.to_value().to_string().into_bytes(),
    };

    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);
    frame.freeze()
}

/// Extract one complete frame from the buffer, if present
///
/// Returns `Ok(None)` when the buffer holds less than a full frame —
/// the header itself or the declared payload is still incomplete —
/// leaving the buffer untouched so the caller can wait for more
/// bytes. Consumes exactly one frame otherwise.
///
/// The only error is a declared payload length above
/// `max_frame_size`; the caller is expected to close the connection.
///
/// Callers drain the buffer by calling this in a loop after every
/// socket read, dispatching each message until `Ok(None)`.
pub fn decode_message(buffer: &mut BytesMut, max_frame_size: usize) -> Result<Option<Message>> {
    if buffer.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let declared = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;

    if declared > max_frame_size {
        return Err(FramecastError::FrameTooLarge {
            declared,
            max: max_frame_size,
        });
    }

    if buffer.len() < LENGTH_PREFIX_SIZE + declared {
        return Ok(None);
    }

    buffer.advance(LENGTH_PREFIX_SIZE);
    let payload = buffer.split_to(declared);

    Ok(Some(Message::from_payload(&payload)))
}

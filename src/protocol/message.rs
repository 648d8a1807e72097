//! Message definitions
//!
//! Typed application-level messages carried inside frames.
//!
//! Every structured message is a JSON object on the wire with a `type`
//! tag and a `timestamp` (RFC 3339). Payloads that are not JSON
//! objects decode to [`Message::RawText`]; objects with an
//! unrecognized tag, or a recognized tag with missing required
//! fields, decode to [`Message::Other`] so the original value is
//! preserved for the fallback response path.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Current RFC 3339 timestamp with microsecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A decoded application-level message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Sent by the server once per connection, immediately after accept
    Welcome {
        client_id: String,
        message: String,
        timestamp: String,
    },

    /// Heartbeat request
    Ping {
        timestamp: String,
        client_info: Option<String>,
    },

    /// Heartbeat reply echoing the ping's timestamp
    Pong {
        ping_timestamp: Option<String>,
        pong_timestamp: String,
        client_id: String,
    },

    /// Echo request
    Echo { content: String, timestamp: String },

    /// Echo reply
    EchoResponse {
        content: String,
        timestamp: String,
        echoed_by: String,
    },

    /// Broadcast request (client -> server, `from_client` empty) or
    /// fan-out delivery (server -> other clients, `from_client` set)
    Broadcast {
        from_client: Option<String>,
        content: String,
        timestamp: String,
    },

    /// Confirmation returned to the broadcast sender
    BroadcastSent { recipients: usize, timestamp: String },

    /// Stats request
    GetStats { timestamp: String },

    /// Stats reply
    ServerStats {
        connected_clients: usize,
        uptime_seconds: u64,
        total_messages: u64,
        server_start_time: String,
        current_time: String,
    },

    /// Reply to a plain-text payload (tagged `echo` on the wire)
    TextEcho {
        original_text: String,
        timestamp: String,
    },

    /// Default reply wrapping a message the server did not recognize
    Response {
        original_message: Value,
        timestamp: String,
    },

    /// A structured message with an unrecognized `type` tag,
    /// preserved verbatim
    Other(Value),

    /// A payload that was not a JSON object
    RawText(String),
}

impl Message {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Welcome message for a newly accepted connection
    pub fn welcome(client_id: impl Into<String>) -> Self {
        Message::Welcome {
            client_id: client_id.into(),
            message: "Welcome to Framecast Server!".to_string(),
            timestamp: timestamp_now(),
        }
    }

    /// Ping with the current timestamp
    pub fn ping(client_info: Option<String>) -> Self {
        Message::Ping {
            timestamp: timestamp_now(),
            client_info,
        }
    }

    /// Pong replying to a ping's timestamp
    pub fn pong(ping_timestamp: Option<String>, client_id: impl Into<String>) -> Self {
        Message::Pong {
            ping_timestamp,
            pong_timestamp: timestamp_now(),
            client_id: client_id.into(),
        }
    }

    /// Echo request
    pub fn echo(content: impl Into<String>) -> Self {
        Message::Echo {
            content: content.into(),
            timestamp: timestamp_now(),
        }
    }

    /// Echo reply
    pub fn echo_response(content: impl Into<String>, echoed_by: impl Into<String>) -> Self {
        Message::EchoResponse {
            content: content.into(),
            timestamp: timestamp_now(),
            echoed_by: echoed_by.into(),
        }
    }

    /// Broadcast request (no sender identity yet)
    pub fn broadcast(content: impl Into<String>) -> Self {
        Message::Broadcast {
            from_client: None,
            content: content.into(),
            timestamp: timestamp_now(),
        }
    }

    /// Broadcast fan-out message stamped with the sender's identity
    pub fn broadcast_from(from_client: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Broadcast {
            from_client: Some(from_client.into()),
            content: content.into(),
            timestamp: timestamp_now(),
        }
    }

    /// Broadcast confirmation for the sender
    pub fn broadcast_sent(recipients: usize) -> Self {
        Message::BroadcastSent {
            recipients,
            timestamp: timestamp_now(),
        }
    }

    /// Stats request
    pub fn get_stats() -> Self {
        Message::GetStats {
            timestamp: timestamp_now(),
        }
    }

    /// Reply to a plain-text payload
    pub fn text_echo(original_text: impl Into<String>) -> Self {
        Message::TextEcho {
            original_text: original_text.into(),
            timestamp: timestamp_now(),
        }
    }

    /// Default reply wrapping an unrecognized message
    pub fn response_to(original_message: Value) -> Self {
        Message::Response {
            original_message,
            timestamp: timestamp_now(),
        }
    }

    /// Custom message: `type` and `timestamp` plus caller-supplied fields
    pub fn custom(msg_type: impl Into<String>, fields: Value) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(msg_type.into()));
        map.insert("timestamp".to_string(), Value::String(timestamp_now()));
        if let Value::Object(extra) = fields {
            for (k, v) in extra {
                map.insert(k, v);
            }
        }
        Message::Other(Value::Object(map))
    }

    // =========================================================================
    // Wire Representation
    // =========================================================================

    /// The `type` tag this message carries on the wire
    pub fn tag(&self) -> &str {
        match self {
            Message::Welcome { .. } => "welcome",
            Message::Ping { .. } => "ping",
            Message::Pong { .. } => "pong",
            Message::Echo { .. } => "echo",
            Message::EchoResponse { .. } => "echo_response",
            Message::Broadcast { .. } => "broadcast",
            Message::BroadcastSent { .. } => "broadcast_sent",
            Message::GetStats { .. } => "get_stats",
            Message::ServerStats { .. } => "server_stats",
            Message::TextEcho { .. } => "echo",
            Message::Response { .. } => "response",
            Message::Other(v) => v
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
            Message::RawText(_) => "raw_text",
        }
    }

    /// JSON value for a structured message
    ///
    /// [`Message::RawText`] has no JSON form; it is returned as a bare
    /// JSON string for display purposes only — the codec writes raw
    /// text payloads without JSON encoding.
    pub fn to_value(&self) -> Value {
        match self {
            Message::Welcome {
                client_id,
                message,
                timestamp,
            } => json!({
                "type": "welcome",
                "client_id": client_id,
                "message": message,
                "timestamp": timestamp,
            }),
            Message::Ping {
                timestamp,
                client_info,
            } => {
                let mut v = json!({ "type": "ping", "timestamp": timestamp });
                if let Some(info) = client_info {
                    v["client_info"] = json!(info);
                }
                v
            }
            Message::Pong {
                ping_timestamp,
                pong_timestamp,
                client_id,
            } => json!({
                "type": "pong",
                "ping_timestamp": ping_timestamp,
                "pong_timestamp": pong_timestamp,
                "client_id": client_id,
            }),
            Message::Echo { content, timestamp } => json!({
                "type": "echo",
                "content": content,
                "timestamp": timestamp,
            }),
            Message::EchoResponse {
                content,
                timestamp,
                echoed_by,
            } => json!({
                "type": "echo_response",
                "content": content,
                "timestamp": timestamp,
                "echoed_by": echoed_by,
            }),
            Message::Broadcast {
                from_client,
                content,
                timestamp,
            } => {
                let mut v = json!({
                    "type": "broadcast",
                    "content": content,
                    "timestamp": timestamp,
                });
                if let Some(from) = from_client {
                    v["from_client"] = json!(from);
                }
                v
            }
            Message::BroadcastSent {
                recipients,
                timestamp,
            } => json!({
                "type": "broadcast_sent",
                "recipients": recipients,
                "timestamp": timestamp,
            }),
            Message::GetStats { timestamp } => json!({
                "type": "get_stats",
                "timestamp": timestamp,
            }),
            Message::ServerStats {
                connected_clients,
                uptime_seconds,
                total_messages,
                server_start_time,
                current_time,
            } => json!({
                "type": "server_stats",
                "connected_clients": connected_clients,
                "uptime_seconds": uptime_seconds,
                "total_messages": total_messages,
                "server_start_time": server_start_time,
                "current_time": current_time,
            }),
            Message::TextEcho {
                original_text,
                timestamp,
            } => json!({
                "type": "echo",
                "original_text": original_text,
                "timestamp": timestamp,
                "from_server": true,
            }),
            Message::Response {
                original_message,
                timestamp,
            } => json!({
                "type": "response",
                "original_message": original_message,
                "timestamp": timestamp,
                "from_server": true,
            }),
            Message::Other(v) => v.clone(),
            Message::RawText(text) => Value::String(text.clone()),
        }
    }

    /// Decode a frame payload into a message
    ///
    /// Never fails: anything that is not a JSON object becomes
    /// [`Message::RawText`] carrying the payload verbatim.
    pub fn from_payload(payload: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(payload) {
            Ok(v) if v.is_object() => Self::from_value(v),
            _ => Message::RawText(String::from_utf8_lossy(payload).into_owned()),
        }
    }

    /// Decode a JSON object into a typed message
    ///
    /// Required fields are validated here, at decode time. A known tag
    /// with missing fields falls back to [`Message::Other`] rather
    /// than erroring, preserving the value for the default response.
    pub fn from_value(value: Value) -> Self {
        match Self::parse_tagged(&value) {
            Some(message) => message,
            None => Message::Other(value),
        }
    }

    fn parse_tagged(value: &Value) -> Option<Message> {
        let obj = value.as_object()?;
        let tag = obj.get("type")?.as_str()?;

        let get_str = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let get_u64 = |key: &str| obj.get(key).and_then(Value::as_u64);

        match tag {
            "welcome" => Some(Message::Welcome {
                client_id: get_str("client_id")?,
                message: get_str("message")?,
                timestamp: get_str("timestamp")?,
            }),
            "ping" => Some(Message::Ping {
                timestamp: get_str("timestamp")?,
                client_info: get_str("client_info"),
            }),
            "pong" => Some(Message::Pong {
                ping_timestamp: get_str("ping_timestamp"),
                pong_timestamp: get_str("pong_timestamp")?,
                client_id: get_str("client_id")?,
            }),
            // Two shapes share the "echo" tag: the echo request
            // (content) and the server's plain-text reply (original_text)
            "echo" => {
                if let Some(original_text) = get_str("original_text") {
                    Some(Message::TextEcho {
                        original_text,
                        timestamp: get_str("timestamp")?,
                    })
                } else {
                    Some(Message::Echo {
                        content: get_str("content")?,
                        timestamp: get_str("timestamp")?,
                    })
                }
            }
            "echo_response" => Some(Message::EchoResponse {
                content: get_str("content")?,
                timestamp: get_str("timestamp")?,
                echoed_by: get_str("echoed_by")?,
            }),
            "broadcast" => Some(Message::Broadcast {
                from_client: get_str("from_client"),
                content: get_str("content")?,
                timestamp: get_str("timestamp")?,
            }),
            "broadcast_sent" => Some(Message::BroadcastSent {
                recipients: get_u64("recipients")? as usize,
                timestamp: get_str("timestamp")?,
            }),
            "get_stats" => Some(Message::GetStats {
                timestamp: get_str("timestamp")?,
            }),
            "server_stats" => Some(Message::ServerStats {
                connected_clients: get_u64("connected_clients")? as usize,
                uptime_seconds: get_u64("uptime_seconds")?,
                total_messages: get_u64("total_messages")?,
                server_start_time: get_str("server_start_time")?,
                current_time: get_str("current_time")?,
            }),
            "response" => Some(Message::Response {
                original_message: obj.get("original_message")?.clone(),
                timestamp: get_str("timestamp")?,
            }),
            _ => None,
        }
    }
}

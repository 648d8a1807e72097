//! Registry Tests
//!
//! Tests for the connection registry and the shared write handle,
//! over real loopback sockets.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use framecast::network::{ConnectionHandle, Registry};
use framecast::protocol::{decode_message, Message, DEFAULT_MAX_FRAME_SIZE};
use framecast::FramecastError;

/// A connected (local, remote) socket pair over loopback
fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let local = TcpStream::connect(addr).unwrap();
    let (remote, _) = listener.accept().unwrap();
    (local, remote)
}

/// A registered handle plus the peer socket that receives its sends
fn handle_with_peer(id: &str) -> (Arc<ConnectionHandle>, TcpStream) {
    let (local, remote) = socket_pair();
    remote
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let handle = ConnectionHandle::new(id.to_string(), local).unwrap();
    (Arc::new(handle), remote)
}

/// Read frames off a peer socket until one complete message arrives
fn read_message(stream: &mut TcpStream) -> Message {
    let mut buffer = BytesMut::new();
    let mut chunk = [0u8; 1024];
    loop {
        if let Some(message) = decode_message(&mut buffer, DEFAULT_MAX_FRAME_SIZE).unwrap() {
            return message;
        }
        let n = stream.read(&mut chunk).expect("read timed out");
        assert!(n > 0, "peer closed before a full frame arrived");
        buffer.extend_from_slice(&chunk[..n]);
    }
}

// =============================================================================
// Registry Membership Tests
// =============================================================================

#[test]
fn test_insert_remove_len() {
    let registry = Registry::new();
    assert!(registry.is_empty());

    let (a, _peer_a) = handle_with_peer("a");
    let (b, _peer_b) = handle_with_peer("b");
    registry.insert(a);
    registry.insert(b);

    assert_eq!(registry.len(), 2);
    assert!(registry.contains("a"));
    assert!(registry.contains("b"));

    assert!(registry.remove("a").is_some());
    assert_eq!(registry.len(), 1);
    assert!(!registry.contains("a"));
}

#[test]
fn test_remove_is_idempotent() {
    let registry = Registry::new();
    let (a, _peer) = handle_with_peer("a");
    registry.insert(a);

    assert!(registry.remove("a").is_some());
    assert!(registry.remove("a").is_none());
    assert!(registry.remove("never-registered").is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_snapshot_reflects_current_members() {
    let registry = Registry::new();
    let (a, _pa) = handle_with_peer("a");
    let (b, _pb) = handle_with_peer("b");
    registry.insert(a);
    registry.insert(b);

    let mut ids: Vec<String> = registry
        .snapshot()
        .iter()
        .map(|h| h.client_id().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

// =============================================================================
// Broadcast Tests
// =============================================================================

#[test]
fn test_broadcast_excludes_sender() {
    let registry = Registry::new();
    let (a, mut peer_a) = handle_with_peer("a");
    let (b, mut peer_b) = handle_with_peer("b");
    let (c, mut peer_c) = handle_with_peer("c");
    registry.insert(a);
    registry.insert(b);
    registry.insert(c);

    let message = Message::broadcast_from("a", "hi");
    let report = registry.broadcast(&message, Some("a"));

    assert_eq!(report.recipients, 2);
    assert_eq!(report.delivered, 2);

    for peer in [&mut peer_b, &mut peer_c] {
        match read_message(peer) {
            Message::Broadcast {
                from_client,
                content,
                ..
            } => {
                assert_eq!(from_client.as_deref(), Some("a"));
                assert_eq!(content, "hi");
            }
            other => panic!("expected Broadcast, got {other:?}"),
        }
    }

    // The sender's peer socket must stay silent
    peer_a
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut chunk = [0u8; 64];
    assert!(
        peer_a.read(&mut chunk).is_err(),
        "sender received its own broadcast"
    );
}

#[test]
fn test_broadcast_without_exclusion_reaches_everyone() {
    let registry = Registry::new();
    let (a, mut peer_a) = handle_with_peer("a");
    let (b, mut peer_b) = handle_with_peer("b");
    registry.insert(a);
    registry.insert(b);

    let report = registry.broadcast(&Message::broadcast_from("server", "all"), None);
    assert_eq!(report.recipients, 2);
    assert_eq!(report.delivered, 2);

    assert!(matches!(read_message(&mut peer_a), Message::Broadcast { .. }));
    assert!(matches!(read_message(&mut peer_b), Message::Broadcast { .. }));
}

#[test]
fn test_broadcast_skips_closed_handles() {
    let registry = Registry::new();
    let (a, mut peer_a) = handle_with_peer("a");
    let (b, _peer_b) = handle_with_peer("b");
    let dead = Arc::clone(&b);
    registry.insert(a);
    registry.insert(b);

    dead.close();

    let report = registry.broadcast(&Message::broadcast_from("x", "still here"), None);
    assert_eq!(report.recipients, 2);
    assert_eq!(report.delivered, 1);
    assert!(matches!(read_message(&mut peer_a), Message::Broadcast { .. }));
}

// =============================================================================
// Handle Tests
// =============================================================================

#[test]
fn test_close_is_idempotent() {
    let (handle, _peer) = handle_with_peer("a");
    assert!(handle.is_open());

    handle.close();
    assert!(!handle.is_open());

    // Repeated close signals have no additional effect and do not panic
    handle.close();
    handle.close();
    assert!(!handle.is_open());
}

#[test]
fn test_close_does_not_wait_for_blocked_send() {
    let (handle, _peer) = handle_with_peer("a");

    // The peer never reads, so repeated large sends eventually block
    // on a full socket buffer while holding the writer lock
    let sender = Arc::clone(&handle);
    let sender_thread = std::thread::spawn(move || {
        let big = Message::RawText("x".repeat(256 * 1024));
        while sender.send(&big).is_ok() {}
    });

    // Give the sender time to wedge
    std::thread::sleep(Duration::from_millis(300));

    let started = std::time::Instant::now();
    handle.close();
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "close waited on an in-flight write"
    );

    // Shutdown unblocks the wedged send, which then errors out
    sender_thread.join().unwrap();
    assert!(!handle.is_open());
}

#[test]
fn test_send_after_close_fails() {
    let (handle, _peer) = handle_with_peer("a");
    handle.close();

    match handle.send(&Message::ping(None)) {
        Err(FramecastError::ConnectionClosed) => {}
        other => panic!("expected ConnectionClosed, got {other:?}"),
    }
}

#[test]
fn test_close_all_closes_every_member() {
    let registry = Registry::new();
    let (a, _pa) = handle_with_peer("a");
    let (b, _pb) = handle_with_peer("b");
    let a_ref = Arc::clone(&a);
    let b_ref = Arc::clone(&b);
    registry.insert(a);
    registry.insert(b);

    registry.close_all();

    assert!(!a_ref.is_open());
    assert!(!b_ref.is_open());
}

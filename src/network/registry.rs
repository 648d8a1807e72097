//! Connection Registry
//!
//! The server's authoritative set of currently connected clients.
//!
//! ## Concurrency
//! The accept thread inserts, each connection's own thread removes
//! during teardown, and broadcast calls read from any dispatch
//! thread. All of that is serialized through one mutex; broadcast
//! takes a snapshot under the lock and fans out after releasing it,
//! so a slow peer never blocks accepts or removals.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::network::connection::ConnectionHandle;
use crate::protocol::Message;

/// Outcome of one broadcast fan-out
#[derive(Debug, Clone, Copy)]
pub struct BroadcastReport {
    /// Registry size minus the sender at the moment of the snapshot
    pub recipients: usize,

    /// Messages actually written to a peer
    pub delivered: usize,
}

/// Concurrency-safe map from connection identity to its write handle
#[derive(Default)]
pub struct Registry {
    connections: Mutex<HashMap<String, Arc<ConnectionHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under its identity
    pub fn insert(&self, handle: Arc<ConnectionHandle>) {
        let client_id = handle.client_id().to_string();
        self.connections.lock().insert(client_id, handle);
    }

    /// Deregister a connection (idempotent)
    pub fn remove(&self, client_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.connections.lock().remove(client_id)
    }

    /// Whether an identity is currently registered
    pub fn contains(&self, client_id: &str) -> bool {
        self.connections.lock().contains_key(client_id)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// A consistent snapshot of the current members
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Send a message to every member except `exclude`
    ///
    /// The member set is snapshotted under the lock and the fan-out
    /// happens outside it. A failed send closes only the failing
    /// handle; its own receive loop observes the close and cleans up.
    pub fn broadcast(&self, message: &Message, exclude: Option<&str>) -> BroadcastReport {
        let targets: Vec<Arc<ConnectionHandle>> = {
            let connections = self.connections.lock();
            connections
                .values()
                .filter(|handle| exclude != Some(handle.client_id()))
                .cloned()
                .collect()
        };

        let recipients = targets.len();
        let mut delivered = 0;

        for handle in targets {
            match handle.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Error sending to {}: {}", handle.client_id(), e);
                    handle.close();
                }
            }
        }

        BroadcastReport {
            recipients,
            delivered,
        }
    }

    /// Close every registered connection
    ///
    /// Used during server shutdown; each connection's own thread
    /// removes its registry entry as it unwinds.
    pub fn close_all(&self) {
        for handle in self.snapshot() {
            handle.close();
        }
    }
}

//! Network Module
//!
//! TCP server, connection handling, and the connection registry.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One dedicated thread per connection driving its receive loop
//! - Broadcast fan-out through the shared registry

mod connection;
mod registry;
mod server;

pub use connection::{Connection, ConnectionHandle, SERVER_NAME};
pub use registry::{BroadcastReport, Registry};
pub use server::{Server, ServerState};

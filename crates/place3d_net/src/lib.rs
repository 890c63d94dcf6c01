//! Place3D Network Layer
//!
//! Authoritative world state, its single-writer coordinator, and the
//! replication protocol that keeps every session's replica converged.

pub mod client;
pub mod coordinator;
mod error;
pub mod protocol;
pub mod replica;
pub mod session;
pub mod transport;
pub mod world;

pub use client::{ClientConnection, ClientSession};
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::NetError;
pub use protocol::{ClientMessage, PlayerRecord, ServerMessage, Snapshot};
pub use replica::ReplicaView;
pub use session::SessionRegistry;
pub use transport::{serve, serve_listener};
pub use world::{Audience, Outbound, WorldConfig, WorldError, WorldState};

/// Network protocol version
pub const PROTOCOL_VERSION: u32 = 1;

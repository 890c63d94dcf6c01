//! Session registry
//!
//! Maps each joined player to the outbound channel of its connection and
//! fans applied events out to their audience.

use crate::protocol::ServerMessage;
use crate::world::Outbound;
use place3d_core::PlayerId;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Outbound half of a session: everything sent here is written to its socket.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<PlayerId, Outbox>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, player: PlayerId, outbox: Outbox) {
        if self.sessions.insert(player, outbox).is_some() {
            tracing::warn!("Session for player {} replaced", player);
        }
    }

    pub fn unregister(&mut self, player: PlayerId) -> bool {
        self.sessions.remove(&player).is_some()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Send `outbound` to every registered session in its audience.
    ///
    /// Fire-and-forget: a closed outbox is skipped, not retried. Its session
    /// leaves through the normal disconnect path. Returns the number of
    /// sessions the message was handed to.
    pub fn deliver(&self, outbound: &Outbound) -> usize {
        let mut delivered = 0;
        for (&player, outbox) in &self.sessions {
            if !outbound.audience.includes(player) {
                continue;
            }
            if outbox.send(outbound.message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(
                    "Dropped {} for player {}: session closed",
                    outbound.message.kind(),
                    player
                );
            }
        }
        delivered
    }
}

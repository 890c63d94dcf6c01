//! Session-side view of the world.
//!
//! A replica is seeded from the join snapshot and then changed only by
//! coordinator events. Predicted placements are tracked beside it, never in
//! it, and retire when confirmed, cleared, or expired.

use crate::protocol::{ClientMessage, PlayerRecord, ServerMessage, Snapshot};
use glam::Vec3;
use place3d_core::placement::{self, PlacementCandidate, PlacementError};
use place3d_core::{CellKey, Color, CubeRecord, GridConfig, PlayerId, SpatialIndex};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// An unconfirmed local placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub color: Color,
    pub issued_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ReplicaView {
    player_id: PlayerId,
    color: Color,
    grid: GridConfig,
    cubes: SpatialIndex,
    players: BTreeMap<PlayerId, PlayerRecord>,
    predictions: HashMap<CellKey, Prediction>,
    prediction_timeout: Duration,
}

impl ReplicaView {
    pub fn from_snapshot(snapshot: Snapshot, prediction_timeout: Duration) -> Self {
        let mut view = Self {
            player_id: snapshot.assigned_id,
            color: snapshot.assigned_color.clone(),
            grid: snapshot.grid,
            cubes: SpatialIndex::new(),
            players: BTreeMap::new(),
            predictions: HashMap::new(),
            prediction_timeout,
        };
        view.reseed(snapshot);
        view
    }

    fn reseed(&mut self, snapshot: Snapshot) {
        self.player_id = snapshot.assigned_id;
        self.color = snapshot.assigned_color;
        self.grid = snapshot.grid;
        self.cubes = snapshot.cubes.into_iter().map(|(_, record)| record).collect();
        self.players = snapshot
            .players
            .into_iter()
            .map(|player| (player.id, player))
            .collect();
        self.predictions.clear();
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn cubes(&self) -> &SpatialIndex {
        &self.cubes
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.values()
    }

    pub fn predictions(&self) -> impl Iterator<Item = (&CellKey, &Prediction)> {
        self.predictions.iter()
    }

    pub fn is_predicted(&self, key: CellKey) -> bool {
        self.predictions.contains_key(&key)
    }

    /// Fold one coordinator message into the view.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Snapshot(snapshot) => self.reseed(snapshot.clone()),
            ServerMessage::PresenceJoined { player } => {
                self.players.insert(player.id, player.clone());
            }
            ServerMessage::CubePlaced {
                key,
                color,
                owner_id,
                ..
            } => {
                self.predictions.remove(key);
                self.cubes.put(CubeRecord {
                    position: *key,
                    color: color.clone(),
                    owner_id: *owner_id,
                });
            }
            ServerMessage::CubeRemoved { key } => {
                self.cubes.remove(*key);
            }
            ServerMessage::PresenceMoved {
                player_id,
                position,
            } => {
                if let Some(player) = self.players.get_mut(player_id) {
                    player.last_known_position = *position;
                }
            }
            ServerMessage::WorldCleared => {
                self.cubes.remove_all();
                self.predictions.clear();
            }
            ServerMessage::PresenceLeft { player_id } => {
                self.players.remove(player_id);
            }
            ServerMessage::Error { message } => {
                tracing::warn!("Coordinator rejected a message: {}", message);
            }
        }
    }

    /// Where a cube would go for `candidate`, judged against this replica.
    pub fn preview(&self, candidate: PlacementCandidate) -> Result<CellKey, PlacementError> {
        let key = placement::evaluate(&self.cubes, &self.grid, candidate)?;
        if self.predictions.contains_key(&key) {
            return Err(PlacementError::Occupied { key });
        }
        Ok(key)
    }

    /// Record a prediction for `candidate` and build the intent to send.
    pub fn predict_place(
        &mut self,
        candidate: PlacementCandidate,
        color: Color,
        now: Instant,
    ) -> Result<ClientMessage, PlacementError> {
        let key = self.preview(candidate)?;
        let center = key.center(self.grid.cube_size);
        self.predictions.insert(
            key,
            Prediction {
                color: color.clone(),
                issued_at: now,
            },
        );
        Ok(ClientMessage::PlaceIntent {
            x: center.x,
            y: center.y,
            z: center.z,
            color,
        })
    }

    /// Intent to remove the cube at `key`, if this replica has one there.
    pub fn remove_intent(&self, key: CellKey) -> Option<ClientMessage> {
        self.cubes
            .contains(key)
            .then_some(ClientMessage::RemoveIntent { key })
    }

    pub fn move_intent(&self, position: Vec3) -> ClientMessage {
        ClientMessage::MoveIntent { position }
    }

    /// Drop predictions older than the timeout. Returns the keys dropped.
    pub fn expire_predictions(&mut self, now: Instant) -> Vec<CellKey> {
        let timeout = self.prediction_timeout;
        let mut expired: Vec<CellKey> = self
            .predictions
            .iter()
            .filter(|(_, prediction)| now.saturating_duration_since(prediction.issued_at) >= timeout)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            self.predictions.remove(key);
        }
        expired.sort();
        expired
    }
}

//! Authoritative world state.
//!
//! A serial command processor: each operation is one atomic transition that
//! either fails with a [`WorldError`] and leaves state untouched, or applies
//! and returns the event to replicate. No I/O happens here.

use crate::protocol::{ClientMessage, PlayerRecord, ServerMessage, Snapshot};
use crate::PROTOCOL_VERSION;
use glam::Vec3;
use place3d_core::placement::{self, PlacementError};
use place3d_core::{CellKey, Color, CubeRecord, GridConfig, PlayerId, SpatialIndex};
use std::collections::BTreeMap;
use thiserror::Error;

/// Reasons a request is declined. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("invalid placement: {0}")]
    InvalidPlacement(#[from] PlacementError),

    #[error("no cube at {key}")]
    NoopRemoval { key: CellKey },

    #[error("player {0} is not connected")]
    UnknownSession(PlayerId),

    #[error("player id space exhausted")]
    IdsExhausted,
}

/// Which sessions receive an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

impl Audience {
    pub fn includes(&self, player: PlayerId) -> bool {
        match *self {
            Audience::All => true,
            Audience::AllExcept(excluded) => player != excluded,
            Audience::Only(target) => player == target,
        }
    }
}

/// An applied change, ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Outbound {
    fn to(audience: Audience, message: ServerMessage) -> Self {
        Self { audience, message }
    }
}

/// Result of a successful connect.
#[derive(Debug, Clone)]
pub struct Joined {
    pub player_id: PlayerId,
    /// Delivered to the new session only.
    pub snapshot: Outbound,
    /// Delivered to everyone else.
    pub announce: Outbound,
}

/// Fixed parameters of a world.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub grid: GridConfig,
    pub spawn_position: Vec3,
    pub palette: Vec<Color>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            spawn_position: Vec3::new(0.0, 2.0, 10.0),
            palette: Color::default_palette(),
        }
    }
}

pub struct WorldState {
    config: WorldConfig,
    cubes: SpatialIndex,
    players: BTreeMap<PlayerId, PlayerRecord>,
    next_player_id: u64,
}

impl WorldState {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            cubes: SpatialIndex::new(),
            players: BTreeMap::new(),
            next_player_id: 1,
        }
    }

    pub fn grid(&self) -> &GridConfig {
        &self.config.grid
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

    fn palette_color(&self, id: PlayerId) -> Color {
        let palette = &self.config.palette;
        if palette.is_empty() {
            return Color::from("#ffffff");
        }
        let slot = (id.0.saturating_sub(1) % palette.len() as u64) as usize;
        palette[slot].clone()
    }

    fn ensure_connected(&self, id: PlayerId) -> Result<(), WorldError> {
        if self.players.contains_key(&id) {
            Ok(())
        } else {
            Err(WorldError::UnknownSession(id))
        }
    }

    /// Register a new participant and build its join snapshot.
    pub fn connect(&mut self) -> Result<Joined, WorldError> {
        let id = PlayerId(self.next_player_id);
        self.next_player_id = self
            .next_player_id
            .checked_add(1)
            .ok_or(WorldError::IdsExhausted)?;

        let color = self.palette_color(id);
        let record = PlayerRecord {
            id,
            display_name: format!("Player {id}"),
            assigned_color: color.clone(),
            last_known_position: self.config.spawn_position,
        };
        self.players.insert(id, record.clone());

        let snapshot = Snapshot {
            protocol_version: PROTOCOL_VERSION,
            assigned_id: id,
            assigned_color: color,
            grid: self.config.grid,
            cubes: self.cubes.snapshot(),
            players: self.players.values().cloned().collect(),
        };

        Ok(Joined {
            player_id: id,
            snapshot: Outbound::to(Audience::Only(id), ServerMessage::Snapshot(snapshot)),
            announce: Outbound::to(
                Audience::AllExcept(id),
                ServerMessage::PresenceJoined { player: record },
            ),
        })
    }

    /// Remove a participant. Cubes it placed stay in the world.
    pub fn disconnect(&mut self, id: PlayerId) -> Result<Outbound, WorldError> {
        self.players
            .remove(&id)
            .ok_or(WorldError::UnknownSession(id))?;
        Ok(Outbound::to(
            Audience::AllExcept(id),
            ServerMessage::PresenceLeft { player_id: id },
        ))
    }

    /// Place a cube at `key` if the cell is in bounds and free.
    pub fn place(
        &mut self,
        owner: PlayerId,
        key: CellKey,
        color: Color,
    ) -> Result<Outbound, WorldError> {
        self.ensure_connected(owner)?;
        placement::is_valid_placement(&self.cubes, &self.config.grid, key)?;

        self.cubes.put(CubeRecord {
            position: key,
            color: color.clone(),
            owner_id: owner,
        });

        let center = key.center(self.config.grid.cube_size);
        Ok(Outbound::to(
            Audience::All,
            ServerMessage::CubePlaced {
                key,
                x: center.x,
                y: center.y,
                z: center.z,
                color,
                owner_id: owner,
            },
        ))
    }

    /// Place a cube at the cell containing world position `pos`.
    pub fn place_at(
        &mut self,
        owner: PlayerId,
        pos: Vec3,
        color: Color,
    ) -> Result<Outbound, WorldError> {
        let key = CellKey::from_world(pos, self.config.grid.cube_size)
            .ok_or(PlacementError::Unresolvable)?;
        self.place(owner, key, color)
    }

    pub fn remove(&mut self, key: CellKey) -> Result<Outbound, WorldError> {
        self.cubes
            .remove(key)
            .ok_or(WorldError::NoopRemoval { key })?;
        Ok(Outbound::to(Audience::All, ServerMessage::CubeRemoved { key }))
    }

    pub fn clear(&mut self) -> Outbound {
        self.cubes.remove_all();
        Outbound::to(Audience::All, ServerMessage::WorldCleared)
    }

    pub fn move_player(&mut self, id: PlayerId, position: Vec3) -> Result<Outbound, WorldError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(WorldError::UnknownSession(id))?;
        player.last_known_position = position;
        Ok(Outbound::to(
            Audience::AllExcept(id),
            ServerMessage::PresenceMoved {
                player_id: id,
                position,
            },
        ))
    }

    /// Apply an intent received from `sender`'s session.
    pub fn apply(&mut self, sender: PlayerId, intent: ClientMessage) -> Result<Outbound, WorldError> {
        self.ensure_connected(sender)?;
        match intent {
            ClientMessage::PlaceIntent { x, y, z, color } => {
                self.place_at(sender, Vec3::new(x, y, z), color)
            }
            ClientMessage::RemoveIntent { key } => self.remove(key),
            ClientMessage::MoveIntent { position } => self.move_player(sender, position),
            ClientMessage::ClearIntent => Ok(self.clear()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use place3d_core::DEFAULT_PALETTE;

    fn world() -> WorldState {
        WorldState::new(WorldConfig {
            palette: vec![Color::from("#ff6b6b"), Color::from("#4ecdc4")],
            ..WorldConfig::default()
        })
    }

    fn red() -> Color {
        Color::from("#ff0000")
    }

    fn snapshot_of(joined: &Joined) -> &Snapshot {
        match &joined.snapshot.message {
            ServerMessage::Snapshot(snapshot) => snapshot,
            other => panic!("expected snapshot, got {}", other.kind()),
        }
    }

    #[test]
    fn connect_assigns_increasing_ids_and_round_robin_colors() {
        let mut world = world();
        let a = world.connect().unwrap();
        let b = world.connect().unwrap();
        let c = world.connect().unwrap();

        assert_eq!((a.player_id, b.player_id, c.player_id), (PlayerId(1), PlayerId(2), PlayerId(3)));
        assert_eq!(snapshot_of(&a).assigned_color, Color::from("#ff6b6b"));
        assert_eq!(snapshot_of(&b).assigned_color, Color::from("#4ecdc4"));
        assert_eq!(snapshot_of(&c).assigned_color, Color::from("#ff6b6b"));

        let player = world.player(PlayerId(2)).unwrap();
        assert_eq!(player.display_name, "Player 2");
        assert_eq!(player.last_known_position, Vec3::new(0.0, 2.0, 10.0));
        assert_eq!(b.announce.audience, Audience::AllExcept(PlayerId(2)));
    }

    #[test]
    fn default_config_hands_out_the_shared_palette() {
        let mut world = WorldState::new(WorldConfig::default());
        let colors: Vec<_> = (0..DEFAULT_PALETTE.len() + 1)
            .map(|_| snapshot_of(&world.connect().unwrap()).assigned_color.clone())
            .collect();
        assert_eq!(colors[..DEFAULT_PALETTE.len()], Color::default_palette()[..]);
        assert_eq!(colors[DEFAULT_PALETTE.len()], colors[0]);
    }

    #[test]
    fn ids_are_not_reused_after_disconnect() {
        let mut world = world();
        let a = world.connect().unwrap();
        world.disconnect(a.player_id).unwrap();
        let b = world.connect().unwrap();
        assert_eq!(b.player_id, PlayerId(2));
    }

    #[test]
    fn place_then_get_and_column_height() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        let key = CellKey::new(3, 0, -4);

        let event = world.place(id, key, red()).unwrap();
        assert_eq!(event.audience, Audience::All);
        assert!(matches!(event.message, ServerMessage::CubePlaced { owner_id, .. } if owner_id == id));

        let record = world.cubes().get(key).unwrap();
        assert_eq!(record.owner_id, id);
        assert_eq!(record.color, red());
        assert_eq!(world.cubes().highest_occupied_at(3, -4), 1);
    }

    #[test]
    fn place_on_occupied_cell_changes_nothing() {
        let mut world = world();
        let first = world.connect().unwrap().player_id;
        let second = world.connect().unwrap().player_id;
        let key = CellKey::new(0, 0, 0);
        world.place(first, key, red()).unwrap();

        let result = world.place(second, key, Color::from("#0000ff"));
        assert_eq!(
            result,
            Err(WorldError::InvalidPlacement(PlacementError::Occupied { key }))
        );
        let record = world.cubes().get(key).unwrap();
        assert_eq!(record.owner_id, first);
        assert_eq!(record.color, red());
        assert_eq!(world.cubes().len(), 1);
    }

    #[test]
    fn twenty_first_cube_in_a_column_is_rejected() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;

        for iy in 0..20 {
            let top = world.cubes().highest_occupied_at(0, 0);
            assert_eq!(top, iy);
            world.place(id, CellKey::new(0, top, 0), red()).unwrap();
        }
        let top = world.cubes().highest_occupied_at(0, 0);
        assert!(matches!(
            world.place(id, CellKey::new(0, top, 0), Color::from("#123456")),
            Err(WorldError::InvalidPlacement(PlacementError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn place_intent_quantizes_world_coordinates() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        let event = world
            .apply(
                id,
                ClientMessage::PlaceIntent {
                    x: 2.5,
                    y: 0.5,
                    z: -0.5,
                    color: red(),
                },
            )
            .unwrap();
        match event.message {
            ServerMessage::CubePlaced { key, x, y, z, .. } => {
                assert_eq!(key, CellKey::new(2, 0, -1));
                assert_eq!((x, y, z), (2.5, 0.5, -0.5));
            }
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn out_of_bounds_intent_is_declined() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        let result = world.apply(
            id,
            ClientMessage::PlaceIntent {
                x: 30.0,
                y: 0.0,
                z: 0.0,
                color: red(),
            },
        );
        assert!(matches!(result, Err(WorldError::InvalidPlacement(_))));
        assert!(world.cubes().is_empty());
    }

    #[test]
    fn remove_absent_is_noop_and_present_removes_exactly_one() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        let keep = CellKey::new(1, 0, 1);
        let gone = CellKey::new(2, 0, 2);
        world.place(id, keep, red()).unwrap();
        world.place(id, gone, red()).unwrap();

        let missing = CellKey::new(9, 0, 9);
        assert_eq!(world.remove(missing), Err(WorldError::NoopRemoval { key: missing }));
        assert_eq!(world.cubes().len(), 2);

        let event = world.remove(gone).unwrap();
        assert_eq!(event.message, ServerMessage::CubeRemoved { key: gone });
        assert!(world.cubes().contains(keep));
        assert!(!world.cubes().contains(gone));
    }

    #[test]
    fn clear_empties_everything_and_broadcasts() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        world.place(id, CellKey::new(0, 0, 0), red()).unwrap();
        world.place(id, CellKey::new(0, 1, 0), red()).unwrap();

        let event = world.clear();
        assert_eq!(event, Outbound::to(Audience::All, ServerMessage::WorldCleared));
        assert!(world.cubes().is_empty());
    }

    #[test]
    fn move_is_not_echoed_to_mover() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        let target = Vec3::new(4.0, 2.0, -1.0);
        let event = world.move_player(id, target).unwrap();
        assert_eq!(event.audience, Audience::AllExcept(id));
        assert!(!event.audience.includes(id));
        assert_eq!(world.player(id).unwrap().last_known_position, target);
    }

    #[test]
    fn disconnect_keeps_cubes_and_rejects_later_intents() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        world.place(id, CellKey::new(5, 0, 5), red()).unwrap();

        let event = world.disconnect(id).unwrap();
        assert_eq!(event.message, ServerMessage::PresenceLeft { player_id: id });
        assert_eq!(world.cubes().len(), 1);

        assert_eq!(world.disconnect(id), Err(WorldError::UnknownSession(id)));
        assert_eq!(
            world.apply(id, ClientMessage::ClearIntent),
            Err(WorldError::UnknownSession(id))
        );
        assert_eq!(world.cubes().len(), 1);
    }

    #[test]
    fn join_snapshot_matches_authoritative_cubes() {
        let mut world = world();
        let id = world.connect().unwrap().player_id;
        for ix in 0..6 {
            world.place(id, CellKey::new(ix, 0, 0), red()).unwrap();
        }
        world.remove(CellKey::new(1, 0, 0)).unwrap();
        world.remove(CellKey::new(4, 0, 0)).unwrap();

        let late = world.connect().unwrap();
        let snapshot = snapshot_of(&late);
        assert_eq!(snapshot.cubes, world.cubes().snapshot());
        let keys: Vec<_> = snapshot.cubes.iter().map(|(key, _)| key.ix).collect();
        assert_eq!(keys, vec![0, 2, 3, 5]);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.protocol_version, PROTOCOL_VERSION);
    }
}

//! Wire protocol
//!
//! Newline-delimited JSON, one message per line, tagged by a `type` field.

use glam::Vec3;
use place3d_core::{CellKey, Color, CubeRecord, GridConfig, PlayerId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A connected participant as seen by every session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "color")]
    pub assigned_color: Color,
    #[serde(rename = "position")]
    pub last_known_position: Vec3,
}

/// Full world state handed to a session when it joins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub protocol_version: u32,
    pub assigned_id: PlayerId,
    pub assigned_color: Color,
    pub grid: GridConfig,
    pub cubes: Vec<(CellKey, CubeRecord)>,
    pub players: Vec<PlayerRecord>,
}

/// Session to coordinator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// World coordinates inside the target cell; quantized by the coordinator.
    PlaceIntent {
        x: f32,
        y: f32,
        z: f32,
        color: Color,
    },
    RemoveIntent {
        key: CellKey,
    },
    MoveIntent {
        position: Vec3,
    },
    ClearIntent,
}

/// Coordinator to one or more sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Snapshot(Snapshot),
    PresenceJoined {
        player: PlayerRecord,
    },
    /// `x`, `y`, `z` are the center of the placed cell.
    CubePlaced {
        key: CellKey,
        x: f32,
        y: f32,
        z: f32,
        color: Color,
        owner_id: PlayerId,
    },
    CubeRemoved {
        key: CellKey,
    },
    PresenceMoved {
        player_id: PlayerId,
        position: Vec3,
    },
    WorldCleared,
    PresenceLeft {
        player_id: PlayerId,
    },
    /// Sent only in reply to a line that could not be decoded.
    Error {
        message: String,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlaceIntent { .. } => "placeIntent",
            Self::RemoveIntent { .. } => "removeIntent",
            Self::MoveIntent { .. } => "moveIntent",
            Self::ClearIntent => "clearIntent",
        }
    }
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::PresenceJoined { .. } => "presenceJoined",
            Self::CubePlaced { .. } => "cubePlaced",
            Self::CubeRemoved { .. } => "cubeRemoved",
            Self::PresenceMoved { .. } => "presenceMoved",
            Self::WorldCleared => "worldCleared",
            Self::PresenceLeft { .. } => "presenceLeft",
            Self::Error { .. } => "error",
        }
    }
}

/// Serialize one message as a single line, newline included.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim())
}

//! Place3D Core
//!
//! The shared voxel-world model used by both the coordinator and every session:
//! - Grid configuration and canonical cell keys
//! - Sparse spatial index of placed cubes
//! - Placement resolution and validity rules

pub mod cell;
pub mod math;
pub mod placement;
pub mod spatial;

pub use glam;

pub use cell::{CellKey, GridConfig};
pub use placement::{PlacementCandidate, PlacementError};
pub use spatial::{Color, CubeRecord, SpatialIndex, DEFAULT_PALETTE};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Participant identity, assigned by the coordinator and never reused.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

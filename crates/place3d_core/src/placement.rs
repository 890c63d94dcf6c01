//! Placement resolution and validity.
//!
//! These functions are pure: the coordinator runs them against the
//! authoritative index to decide an edit, and sessions run the same code
//! against their replica to preview one.

use crate::math::{dominant_axis, Vec3};
use crate::{CellKey, GridConfig, SpatialIndex};
use thiserror::Error;

/// A point of interest reported by the picking adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementCandidate {
    /// Hit on the ground plane at world `(x, z)`.
    Ground { x: f32, z: f32 },
    /// Hit on a face of the existing cube at `cube`, with the face's outward normal.
    Face { cube: CellKey, normal: Vec3 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell {key} is outside the buildable volume")]
    OutOfBounds { key: CellKey },

    #[error("cell {key} is already occupied")]
    Occupied { key: CellKey },

    #[error("hit does not resolve to a cell")]
    Unresolvable,
}

/// Cell targeted by `candidate`, without checking validity.
pub fn resolve(
    index: &SpatialIndex,
    grid: &GridConfig,
    candidate: PlacementCandidate,
) -> Option<CellKey> {
    match candidate {
        PlacementCandidate::Ground { x, z } => {
            let ground = CellKey::from_world(Vec3::new(x, 0.0, z), grid.cube_size)?;
            let iy = index.highest_occupied_at(ground.ix, ground.iz);
            Some(CellKey::new(ground.ix, iy, ground.iz))
        }
        PlacementCandidate::Face { cube, normal } => {
            let (axis, sign) = dominant_axis(normal)?;
            Some(cube.step(axis, sign))
        }
    }
}

/// Whether a cube may be placed at `key` right now.
pub fn is_valid_placement(
    index: &SpatialIndex,
    grid: &GridConfig,
    key: CellKey,
) -> Result<(), PlacementError> {
    let declined = if !grid.contains(key) {
        PlacementError::OutOfBounds { key }
    } else if index.contains(key) {
        PlacementError::Occupied { key }
    } else {
        return Ok(());
    };
    tracing::debug!("Placement declined: {}", declined);
    Err(declined)
}

/// Resolve `candidate` and check it in one step.
pub fn evaluate(
    index: &SpatialIndex,
    grid: &GridConfig,
    candidate: PlacementCandidate,
) -> Result<CellKey, PlacementError> {
    let key = resolve(index, grid, candidate).ok_or(PlacementError::Unresolvable)?;
    is_valid_placement(index, grid, key)?;
    Ok(key)
}

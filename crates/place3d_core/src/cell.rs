//! Grid discretization
//!
//! A continuous world position maps to exactly one [`CellKey`] by flooring
//! each coordinate over the cube size.

use crate::math::{Axis, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grid configuration shared by the coordinator and every session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Width of the buildable area in cells, along both x and z.
    pub grid_size: u32,
    /// Edge length of one cube in world units.
    pub cube_size: f32,
    /// Number of stackable layers; valid heights are `0..max_height`.
    pub max_height: u32,
}

impl GridConfig {
    pub fn half_grid(&self) -> i32 {
        (self.grid_size / 2) as i32
    }

    /// Whether `key` lies inside the buildable volume.
    pub fn contains(&self, key: CellKey) -> bool {
        let half = self.half_grid();
        (-half..=half).contains(&key.ix)
            && (-half..=half).contains(&key.iz)
            && key.iy >= 0
            && (key.iy as i64) < self.max_height as i64
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            grid_size: 50,
            cube_size: 1.0,
            max_height: 20,
        }
    }
}

/// Canonical identity of one grid cell.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CellKey {
    pub ix: i32,
    pub iy: i32,
    pub iz: i32,
}

impl CellKey {
    pub const fn new(ix: i32, iy: i32, iz: i32) -> Self {
        Self { ix, iy, iz }
    }

    /// Quantize a world position. Returns `None` if any coordinate is not finite.
    pub fn from_world(pos: Vec3, cube_size: f32) -> Option<Self> {
        if !pos.is_finite() {
            return None;
        }
        let cell = (pos / cube_size).floor();
        Some(Self::new(cell.x as i32, cell.y as i32, cell.z as i32))
    }

    /// World-space center of the cell.
    pub fn center(&self, cube_size: f32) -> Vec3 {
        (Vec3::new(self.ix as f32, self.iy as f32, self.iz as f32) + Vec3::splat(0.5)) * cube_size
    }

    /// The neighbouring cell one step along `axis` in direction `sign`.
    pub fn step(&self, axis: Axis, sign: i32) -> Self {
        let mut next = *self;
        let coord = match axis {
            Axis::X => &mut next.ix,
            Axis::Y => &mut next.iy,
            Axis::Z => &mut next.iz,
        };
        *coord = coord.saturating_add(sign);
        next
    }

    /// Column coordinates `(ix, iz)`.
    pub fn column(&self) -> (i32, i32) {
        (self.ix, self.iz)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.ix, self.iy, self.iz)
    }
}

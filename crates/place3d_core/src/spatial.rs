//! Sparse occupancy index for placed cubes.
//!
//! Cubes are stored by key, with a per-column set of occupied heights so
//! column queries stay exact when cubes are removed from the middle or top.

use crate::{CellKey, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opaque cube color, carried through the protocol untouched (e.g. `"#ff6b6b"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

/// Colors handed to players round-robin by id.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#ff6b6b", "#4ecdc4", "#45b7d1", "#96ceb4", "#ffeaa7", "#dda0dd", "#98d8c8", "#f7dc6f",
];

impl Color {
    pub fn default_palette() -> Vec<Color> {
        DEFAULT_PALETTE.into_iter().map(Color::from).collect()
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One placed cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeRecord {
    pub position: CellKey,
    pub color: Color,
    pub owner_id: PlayerId,
}

/// Sparse map from cell to cube.
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    cubes: HashMap<CellKey, CubeRecord>,
    /// Occupied heights per `(ix, iz)` column.
    columns: HashMap<(i32, i32), BTreeSet<i32>>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cube at its own position, returning whatever it replaced.
    pub fn put(&mut self, record: CubeRecord) -> Option<CubeRecord> {
        let key = record.position;
        self.columns.entry(key.column()).or_default().insert(key.iy);
        self.cubes.insert(key, record)
    }

    pub fn get(&self, key: CellKey) -> Option<&CubeRecord> {
        self.cubes.get(&key)
    }

    pub fn contains(&self, key: CellKey) -> bool {
        self.cubes.contains_key(&key)
    }

    /// Delete the cube at `key`. No-op if the cell is empty.
    pub fn remove(&mut self, key: CellKey) -> Option<CubeRecord> {
        let removed = self.cubes.remove(&key)?;
        if let Some(heights) = self.columns.get_mut(&key.column()) {
            heights.remove(&key.iy);
            if heights.is_empty() {
                self.columns.remove(&key.column());
            }
        }
        Some(removed)
    }

    /// Drop every cube. Returns how many were removed.
    pub fn remove_all(&mut self) -> usize {
        let count = self.cubes.len();
        self.cubes.clear();
        self.columns.clear();
        count
    }

    /// First free height directly above the topmost cube in column `(ix, iz)`,
    /// or 0 for an empty column.
    pub fn highest_occupied_at(&self, ix: i32, iz: i32) -> i32 {
        self.columns
            .get(&(ix, iz))
            .and_then(|heights| heights.last())
            .map_or(0, |top| top.saturating_add(1))
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &CubeRecord)> {
        self.cubes.iter()
    }

    /// All cubes as `(key, record)` pairs in key order.
    pub fn snapshot(&self) -> Vec<(CellKey, CubeRecord)> {
        let mut entries: Vec<_> = self
            .iter()
            .map(|(key, record)| (*key, record.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }
}

impl FromIterator<CubeRecord> for SpatialIndex {
    fn from_iter<I: IntoIterator<Item = CubeRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for record in iter {
            index.put(record);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(ix: i32, iy: i32, iz: i32) -> CubeRecord {
        CubeRecord {
            position: CellKey::new(ix, iy, iz),
            color: Color::from("#ff0000"),
            owner_id: PlayerId(1),
        }
    }

    #[test]
    fn put_then_get_returns_record() {
        let mut index = SpatialIndex::new();
        assert!(index.put(cube(2, 0, -3)).is_none());

        let record = index.get(CellKey::new(2, 0, -3)).unwrap();
        assert_eq!(record.owner_id, PlayerId(1));
        assert_eq!(index.highest_occupied_at(2, -3), 1);
    }

    #[test]
    fn empty_column_height_is_zero() {
        let index = SpatialIndex::new();
        assert_eq!(index.highest_occupied_at(0, 0), 0);
    }

    #[test]
    fn column_height_tracks_topmost_cube() {
        let mut index = SpatialIndex::new();
        index.put(cube(0, 0, 0));
        index.put(cube(0, 1, 0));
        index.put(cube(0, 4, 0));
        index.put(cube(1, 9, 0));
        assert_eq!(index.highest_occupied_at(0, 0), 5);

        // Removing the top lowers the ceiling to the next cube down.
        index.remove(CellKey::new(0, 4, 0));
        assert_eq!(index.highest_occupied_at(0, 0), 2);

        // Removing from the middle leaves the ceiling alone.
        index.remove(CellKey::new(0, 0, 0));
        assert_eq!(index.highest_occupied_at(0, 0), 2);

        index.remove(CellKey::new(0, 1, 0));
        assert_eq!(index.highest_occupied_at(0, 0), 0);
        assert_eq!(index.highest_occupied_at(1, 0), 10);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut index = SpatialIndex::new();
        index.put(cube(0, 0, 0));
        assert!(index.remove(CellKey::new(5, 0, 5)).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_deletes_only_target() {
        let mut index = SpatialIndex::new();
        index.put(cube(0, 0, 0));
        index.put(cube(1, 0, 0));

        let removed = index.remove(CellKey::new(1, 0, 0)).unwrap();
        assert_eq!(removed.position, CellKey::new(1, 0, 0));
        assert!(index.contains(CellKey::new(0, 0, 0)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn remove_all_clears_cubes_and_columns() {
        let mut index: SpatialIndex = [cube(0, 0, 0), cube(0, 1, 0), cube(3, 0, 3)]
            .into_iter()
            .collect();
        assert_eq!(index.remove_all(), 3);
        assert!(index.is_empty());
        assert_eq!(index.highest_occupied_at(0, 0), 0);
    }

    #[test]
    fn iter_visits_every_cube_once() {
        let index: SpatialIndex = [cube(0, 0, 0), cube(0, 1, 0), cube(5, 0, -5)]
            .into_iter()
            .collect();
        let mut keys: Vec<_> = index.iter().map(|(key, _)| *key).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![CellKey::new(0, 0, 0), CellKey::new(0, 1, 0), CellKey::new(5, 0, -5)]
        );
        assert!(index.iter().all(|(key, record)| *key == record.position));
    }

    #[test]
    fn default_palette_has_distinct_colors() {
        let palette = Color::default_palette();
        assert_eq!(palette.len(), DEFAULT_PALETTE.len());
        assert_eq!(palette[0].as_str(), "#ff6b6b");
        let unique: std::collections::HashSet<_> = palette.iter().collect();
        assert_eq!(unique.len(), palette.len());
    }

    #[test]
    fn snapshot_is_sorted_and_complete() {
        let index: SpatialIndex = [cube(3, 0, 0), cube(-1, 2, 0), cube(0, 0, 1)]
            .into_iter()
            .collect();
        let keys: Vec<_> = index.snapshot().into_iter().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![CellKey::new(-1, 2, 0), CellKey::new(0, 0, 1), CellKey::new(3, 0, 0)]
        );
    }
}

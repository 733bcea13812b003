//! Tile existence and elevation.
//!
//! The engine only asks two things of the terrain: whether a coordinate is a
//! real tile and how high it sits. Presentation uses the elevation to place
//! unit models; the engine uses existence to keep plans on the map.

use std::collections::BTreeMap;

use super::coord::Coord;

/// The set of tiles that make up the battlefield.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMap {
    elevation: BTreeMap<Coord, i32>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flat `width` x `height` board with its corner at the origin.
    pub fn rectangle(width: i32, height: i32) -> Self {
        let mut map = TileMap::new();
        for x in 0..width {
            for y in 0..height {
                map.insert(Coord::new(x, y), 0);
            }
        }
        map
    }

    /// Adds or replaces a tile.
    pub fn insert(&mut self, at: Coord, elevation: i32) {
        self.elevation.insert(at, elevation);
    }

    /// Builder form of [`TileMap::insert`] for an existing tile.
    pub fn with_elevation(mut self, at: Coord, elevation: i32) -> Self {
        self.insert(at, elevation);
        self
    }

    pub fn contains(&self, at: Coord) -> bool {
        self.elevation.contains_key(&at)
    }

    pub fn elevation(&self, at: Coord) -> Option<i32> {
        self.elevation.get(&at).copied()
    }

    pub fn len(&self) -> usize {
        self.elevation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elevation.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, i32)> + '_ {
        self.elevation.iter().map(|(c, e)| (*c, *e))
    }
}

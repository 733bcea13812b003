//! Occupancy index: which unit stands on which tile.
//!
//! The index is the single owner of the coordinate-to-unit mapping. It never
//! holds two units on one tile; an insert onto an occupied tile is rejected
//! with [`OccupancyError::Occupied`] instead of silently replacing the entry.

use std::collections::BTreeMap;

use super::coord::Coord;
use super::unit::UnitId;

/// Errors raised by occupancy updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OccupancyError {
    #[error("tile {at} already holds unit {incumbent}; refusing to place {arrival}")]
    Occupied {
        at: Coord,
        incumbent: UnitId,
        arrival: UnitId,
    },

    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),
}

/// Mutable coordinate-to-unit index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridIndex {
    tiles: BTreeMap<Coord, UnitId>,
}

impl GridIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupant(&self, at: Coord) -> Option<UnitId> {
        self.tiles.get(&at).copied()
    }

    pub fn is_occupied(&self, at: Coord) -> bool {
        self.tiles.contains_key(&at)
    }

    /// Places `unit` on `at`. Fails if another unit is already there.
    pub fn insert(&mut self, at: Coord, unit: UnitId) -> Result<(), OccupancyError> {
        match self.tiles.get(&at) {
            Some(&incumbent) if incumbent != unit => Err(OccupancyError::Occupied {
                at,
                incumbent,
                arrival: unit,
            }),
            _ => {
                self.tiles.insert(at, unit);
                Ok(())
            }
        }
    }

    /// Clears `at` if, and only if, it is held by `unit`.
    pub fn remove(&mut self, at: Coord, unit: UnitId) -> bool {
        if self.tiles.get(&at) == Some(&unit) {
            self.tiles.remove(&at);
            return true;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// A frozen copy of the index for use during resolution.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tiles: self.tiles.clone(),
        }
    }
}

/// Start-of-tick occupancy. Immutable; later registry updates do not show through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    tiles: BTreeMap<Coord, UnitId>,
}

impl Snapshot {
    pub fn occupant(&self, at: Coord) -> Option<UnitId> {
        self.tiles.get(&at).copied()
    }

    /// Number of occupied tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coord, UnitId)> + '_ {
        self.tiles.iter().map(|(c, u)| (*c, *u))
    }
}

impl FromIterator<(Coord, UnitId)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (Coord, UnitId)>>(iter: I) -> Self {
        Snapshot {
            tiles: iter.into_iter().collect(),
        }
    }
}

//! Board representation: coordinates, units, tiles and occupancy.
//!
//! Contains the core data structures for unit archetypes and plans, the
//! occupancy index and the registry that owns every live unit.

pub mod coord;
pub mod event;
pub mod grid;
pub mod registry;
pub mod tiles;
pub mod unit;

pub use coord::Coord;
pub use event::Event;
pub use grid::{GridIndex, OccupancyError, Snapshot};
pub use registry::UnitRegistry;
pub use tiles::TileMap;
pub use unit::{Action, Faction, Unit, UnitId, UnitKind, ALL_KINDS};

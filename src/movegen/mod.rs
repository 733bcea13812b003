//! Legal move generation.
//!
//! Archetype move, attack and control sets, breadth-first path planning over
//! them, and a random command policy used to drive headless skirmishes.

pub mod path;
pub mod sets;

pub use path::{find_path, find_path_on, PathError, SEARCH_LIMIT};
pub use sets::{attack_set, control_set, move_set};

use rand::Rng;

use crate::board::{Coord, TileMap, Unit, UnitRegistry};

/// A command the player or AI layer can issue to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Coord),
    Attack(Coord),
}

/// Picks a random command for `unit`.
///
/// Attacks the first attack-set tile that holds an enemy. Otherwise walks to a
/// uniformly chosen move-set tile that exists on `tiles`. Returns `None` when
/// the unit has nowhere to go.
pub fn random_command(
    unit: &Unit,
    registry: &UnitRegistry,
    tiles: &TileMap,
    rng: &mut impl Rng,
) -> Option<Command> {
    if let Some(target) = unit
        .attack_set()
        .into_iter()
        .find(|t| registry.has_enemy_at(*t, unit.faction))
    {
        return Some(Command::Attack(target));
    }

    let legal: Vec<Coord> = unit
        .move_set()
        .into_iter()
        .filter(|t| tiles.contains(*t))
        .collect();
    if legal.is_empty() {
        return None;
    }
    let idx = rng.gen_range(0..legal.len());
    Some(Command::Move(legal[idx]))
}

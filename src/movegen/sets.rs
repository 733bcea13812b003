//! Per-archetype move, attack and control sets.
//!
//! Offsets are written for a unit facing +y; the y component is multiplied
//! by the unit's forward sign so both factions share one table. Results keep
//! the table order, so callers and tests see a stable sequence.

use crate::board::coord::Coord;
use crate::board::unit::UnitKind;

type Offset = (i32, i32);

const INFANTRY_MOVES: &[Offset] = &[(0, 1), (1, 1), (-1, 1)];

const SPEARMAN_MOVES: &[Offset] = &[(0, 1), (1, 1), (-1, 1), (1, -1), (-1, -1)];

const SPEARMAN_ATTACKS: &[Offset] = &[(1, 1), (0, 1), (-1, 1)];

const COMMANDER_MOVES: &[Offset] = &[
    (0, 1),
    (1, 0),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

const ARCHER_MOVES: &[Offset] = &[(0, 1), (1, 0), (-1, 0), (0, -1)];

const ARCHER_ATTACKS: &[Offset] = &[(0, 2), (1, 2), (-1, 2), (2, 2), (-2, 2)];

fn move_offsets(kind: UnitKind) -> &'static [Offset] {
    match kind {
        UnitKind::Infantry => INFANTRY_MOVES,
        UnitKind::Spearman => SPEARMAN_MOVES,
        UnitKind::Commander => COMMANDER_MOVES,
        UnitKind::Archer => ARCHER_MOVES,
    }
}

fn attack_offsets(kind: UnitKind) -> &'static [Offset] {
    match kind {
        UnitKind::Infantry | UnitKind::Commander => move_offsets(kind),
        UnitKind::Spearman => SPEARMAN_ATTACKS,
        UnitKind::Archer => ARCHER_ATTACKS,
    }
}

fn apply(offsets: &[Offset], from: Coord, forward: i32) -> Vec<Coord> {
    offsets
        .iter()
        .map(|&(dx, dy)| Coord::new(from.x + dx, from.y + dy * forward))
        .collect()
}

/// Tiles the archetype may step to from `from` this tick.
pub fn move_set(kind: UnitKind, from: Coord, forward: i32) -> Vec<Coord> {
    apply(move_offsets(kind), from, forward)
}

/// Tiles the archetype may attack from `from`. Ranged archetypes reach past
/// their move set.
pub fn attack_set(kind: UnitKind, from: Coord, forward: i32) -> Vec<Coord> {
    apply(attack_offsets(kind), from, forward)
}

/// Tiles the archetype contests for tie-break purposes.
///
/// The union of its move set under both facings, so the result does not
/// depend on which side the unit fights for.
pub fn control_set(kind: UnitKind, from: Coord) -> Vec<Coord> {
    let mut tiles = move_set(kind, from, 1);
    for tile in move_set(kind, from, -1) {
        if !tiles.contains(&tile) {
            tiles.push(tile);
        }
    }
    tiles
}

//! Breadth-first path planning over the move-set graph.
//!
//! The adjacency of a tile is the unit's move set from that tile, so the
//! search only ever proposes steps the unit could legally take one per tick.
//! Move sets keep producing new tiles on an unbounded grid, so every search
//! carries an expansion limit and fails closed when it is exceeded.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::board::coord::Coord;
use crate::board::tiles::TileMap;
use crate::board::unit::{Unit, UnitKind};

use super::sets::move_set;

/// Default number of frontier expansions before a search is abandoned.
pub const SEARCH_LIMIT: usize = 1000;

/// Errors that can occur during path planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("no path from {start} to {target}")]
    NotFound { start: Coord, target: Coord },

    #[error("path search abandoned after {limit} expansions")]
    SearchLimit { limit: usize },
}

/// Finds the shortest step sequence for `unit` from `start` to `target` on an
/// unbounded grid.
///
/// The returned path excludes `start` and ends at `target`; it is empty when
/// the two coincide.
pub fn find_path(start: Coord, target: Coord, unit: &Unit) -> Result<Vec<Coord>, PathError> {
    let (kind, forward) = (unit.kind, unit.forward());
    bfs(start, target, SEARCH_LIMIT, |from| move_set(kind, from, forward))
}

/// Like [`find_path`], but only expands tiles that exist on `tiles`.
pub fn find_path_on(
    tiles: &TileMap,
    start: Coord,
    target: Coord,
    kind: UnitKind,
    forward: i32,
    limit: usize,
) -> Result<Vec<Coord>, PathError> {
    if !tiles.contains(target) {
        return Err(PathError::NotFound { start, target });
    }
    bfs(start, target, limit, |from| {
        move_set(kind, from, forward)
            .into_iter()
            .filter(|t| tiles.contains(*t))
            .collect()
    })
}

fn bfs<F>(start: Coord, target: Coord, limit: usize, neighbours: F) -> Result<Vec<Coord>, PathError>
where
    F: Fn(Coord) -> Vec<Coord>,
{
    let mut frontier = VecDeque::from([start]);
    // Marked on enqueue so no tile is queued twice.
    let mut visited = HashSet::from([start]);
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut expansions = 0usize;

    while let Some(current) = frontier.pop_front() {
        expansions += 1;
        if expansions > limit {
            return Err(PathError::SearchLimit { limit });
        }

        if current == target {
            return Ok(reconstruct(&came_from, start, target));
        }

        for next in neighbours(current) {
            if visited.insert(next) {
                came_from.insert(next, current);
                frontier.push_back(next);
            }
        }
    }

    Err(PathError::NotFound { start, target })
}

fn reconstruct(came_from: &HashMap<Coord, Coord>, start: Coord, target: Coord) -> Vec<Coord> {
    let mut path = Vec::new();
    let mut step = target;
    while step != start {
        path.push(step);
        step = came_from[&step];
    }
    path.reverse();
    path
}

//! Combat between units of opposite factions after movement.
//!
//! Both entry points share one tie-break: count the units of each faction
//! whose control set reaches the contested tile(s) and compare. A positive
//! balance (more ally controllers) destroys the enemy unit, a negative one the
//! ally unit, and an even balance destroys both.

use std::cmp::Ordering;

use tracing::debug;

use crate::board::{Coord, Faction, OccupancyError, Unit, UnitId, UnitRegistry};

/// A unit that ended the tick on a contested tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender {
    pub unit: UnitId,
    pub faction: Faction,
    /// Whether the unit stepped onto the tile this tick.
    pub moved: bool,
}

/// Ally controllers minus enemy controllers over `tiles`.
///
/// A unit controlling several of the tiles is counted once.
pub fn control_balance(registry: &UnitRegistry, tiles: &[Coord]) -> i32 {
    registry
        .controllers_of(tiles)
        .map(|u| match u.faction {
            Faction::Ally => 1,
            Faction::Enemy => -1,
        })
        .sum()
}

/// Units destroyed for a given control balance.
pub fn casualties_for(balance: i32, ally: UnitId, enemy: UnitId) -> Vec<UnitId> {
    match balance.cmp(&0) {
        Ordering::Greater => vec![enemy],
        Ordering::Less => vec![ally],
        Ordering::Equal => vec![ally, enemy],
    }
}

/// Arbitrates two units of opposite factions that ended the tick on `tile`.
///
/// The side that moved beats the side that stood still. If both moved, the
/// control tie-break over `tile` decides. Units of one faction never fight;
/// the result is then empty.
pub fn resolve_same_tile(
    registry: &UnitRegistry,
    tile: Coord,
    a: Contender,
    b: Contender,
) -> Vec<UnitId> {
    if a.faction == b.faction {
        return Vec::new();
    }
    let (ally, enemy) = if a.faction == Faction::Ally { (a, b) } else { (b, a) };
    match (ally.moved, enemy.moved) {
        (true, false) => vec![enemy.unit],
        (false, true) => vec![ally.unit],
        _ => {
            let balance = control_balance(registry, &[tile]);
            debug!(%tile, balance, "same-tile tie-break");
            casualties_for(balance, ally.unit, enemy.unit)
        }
    }
}

/// Arbitrates a head-on collision: two units of opposite factions that each
/// tried to step onto the other's tile.
pub fn resolve_collision(registry: &UnitRegistry, a: &Unit, b: &Unit) -> Vec<UnitId> {
    if a.faction == b.faction {
        return Vec::new();
    }
    let (ally, enemy) = if a.faction == Faction::Ally { (a, b) } else { (b, a) };
    let tiles = [ally.pos(), enemy.pos()];
    let balance = control_balance(registry, &tiles);
    debug!(ally = %ally.id, enemy = %enemy.id, balance, "head-on collision");
    casualties_for(balance, ally.id, enemy.id)
}

/// Runs head-on arbitration for every cancelled swap pair still on the board
/// and removes the losers. Returns the destroyed units.
pub fn collide_swaps(
    registry: &mut UnitRegistry,
    pairs: impl IntoIterator<Item = (UnitId, UnitId)>,
) -> Result<Vec<Unit>, OccupancyError> {
    let mut fallen = Vec::new();
    for (a, b) in pairs {
        let losers = match (registry.get(a), registry.get(b)) {
            (Some(ua), Some(ub)) => resolve_collision(registry, ua, ub),
            _ => continue,
        };
        for id in losers {
            fallen.push(registry.unregister(id)?);
        }
    }
    Ok(fallen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::UnitKind;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    /// Two contenders placed where they control nothing near (5, 5).
    fn contenders(registry: &mut UnitRegistry) -> (Contender, Contender) {
        let ally = registry
            .spawn(UnitKind::Infantry, Faction::Ally, c(5, 2))
            .unwrap();
        let enemy = registry
            .spawn(UnitKind::Infantry, Faction::Enemy, c(5, 8))
            .unwrap();
        (
            Contender {
                unit: ally,
                faction: Faction::Ally,
                moved: true,
            },
            Contender {
                unit: enemy,
                faction: Faction::Enemy,
                moved: true,
            },
        )
    }

    #[test]
    fn commander_controls_its_neighbours() {
        let mut registry = UnitRegistry::new();
        registry
            .spawn(UnitKind::Commander, Faction::Ally, c(4, 4))
            .unwrap();
        assert_eq!(control_balance(&registry, &[c(5, 5)]), 1);
        assert_eq!(control_balance(&registry, &[c(7, 7)]), 0);
    }

    #[test]
    fn unit_controlling_both_tiles_counts_once() {
        let mut registry = UnitRegistry::new();
        registry
            .spawn(UnitKind::Commander, Faction::Enemy, c(1, 1))
            .unwrap();
        assert_eq!(control_balance(&registry, &[c(1, 2), c(2, 2)]), -1);
    }

    #[test]
    fn mover_beats_stationary_unit() {
        let mut registry = UnitRegistry::new();
        let (mut ally, enemy) = contenders(&mut registry);
        ally.moved = false;
        assert_eq!(
            resolve_same_tile(&registry, c(5, 5), ally, enemy),
            vec![ally.unit]
        );
        assert_eq!(
            resolve_same_tile(&registry, c(5, 5), enemy, ally),
            vec![ally.unit]
        );
    }

    #[test]
    fn three_against_one_destroys_enemy() {
        let mut registry = UnitRegistry::new();
        let (ally, enemy) = contenders(&mut registry);
        for at in [c(4, 4), c(4, 5), c(4, 6)] {
            registry
                .spawn(UnitKind::Commander, Faction::Ally, at)
                .unwrap();
        }
        registry
            .spawn(UnitKind::Commander, Faction::Enemy, c(6, 5))
            .unwrap();
        assert_eq!(control_balance(&registry, &[c(5, 5)]), 2);
        assert_eq!(
            resolve_same_tile(&registry, c(5, 5), ally, enemy),
            vec![enemy.unit]
        );
    }

    #[test]
    fn even_control_destroys_both() {
        let mut registry = UnitRegistry::new();
        let (ally, enemy) = contenders(&mut registry);
        registry
            .spawn(UnitKind::Commander, Faction::Ally, c(4, 5))
            .unwrap();
        registry
            .spawn(UnitKind::Commander, Faction::Enemy, c(6, 5))
            .unwrap();
        assert_eq!(
            resolve_same_tile(&registry, c(5, 5), ally, enemy),
            vec![ally.unit, enemy.unit]
        );
    }

    #[test]
    fn enemy_majority_destroys_ally() {
        let mut registry = UnitRegistry::new();
        let (ally, enemy) = contenders(&mut registry);
        registry
            .spawn(UnitKind::Commander, Faction::Enemy, c(6, 5))
            .unwrap();
        assert_eq!(
            resolve_same_tile(&registry, c(5, 5), ally, enemy),
            vec![ally.unit]
        );
    }

    #[test]
    fn same_faction_never_fights() {
        let mut registry = UnitRegistry::new();
        let (ally, _) = contenders(&mut registry);
        let other = Contender {
            unit: UnitId(99),
            faction: Faction::Ally,
            moved: true,
        };
        assert!(resolve_same_tile(&registry, c(5, 5), ally, other).is_empty());
    }

    #[test]
    fn collision_counts_both_tiles() {
        let mut registry = UnitRegistry::new();
        let a = registry
            .spawn(UnitKind::Infantry, Faction::Ally, c(0, 0))
            .unwrap();
        let e = registry
            .spawn(UnitKind::Infantry, Faction::Enemy, c(0, 1))
            .unwrap();
        // Each infantry controls the other's tile: even.
        let fallen = collide_swaps(&mut registry, [(a, e)]).unwrap();
        assert_eq!(fallen.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn collision_with_support_keeps_the_stronger_side() {
        let mut registry = UnitRegistry::new();
        let a = registry
            .spawn(UnitKind::Infantry, Faction::Ally, c(0, 0))
            .unwrap();
        let e = registry
            .spawn(UnitKind::Infantry, Faction::Enemy, c(0, 1))
            .unwrap();
        registry
            .spawn(UnitKind::Commander, Faction::Ally, c(1, 0))
            .unwrap();
        let fallen = collide_swaps(&mut registry, [(a, e)]).unwrap();
        assert_eq!(fallen.iter().map(|u| u.id).collect::<Vec<_>>(), vec![e]);
        assert!(registry.contains(a));
    }

    #[test]
    fn collision_skips_missing_units() {
        let mut registry = UnitRegistry::new();
        let a = registry
            .spawn(UnitKind::Infantry, Faction::Ally, c(0, 0))
            .unwrap();
        let fallen = collide_swaps(&mut registry, [(a, UnitId(50))]).unwrap();
        assert!(fallen.is_empty());
        assert!(registry.contains(a));
    }
}

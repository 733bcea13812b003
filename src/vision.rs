//! Per-faction vision and fog of war.
//!
//! Recomputed once per tick after the apply phase. A tile is visible to a
//! faction if it lies within the vision radius (Manhattan, inclusive) of any
//! of its units; every tile a faction has ever seen stays revealed.

use std::collections::HashSet;

use crate::board::{Coord, Faction, Unit, UnitRegistry};

#[derive(Debug, Clone, Default)]
struct Sight {
    visible: HashSet<Coord>,
    revealed: HashSet<Coord>,
}

/// Visible and revealed tiles for both factions.
#[derive(Debug, Clone)]
pub struct Vision {
    radius: i32,
    ally: Sight,
    enemy: Sight,
}

impl Vision {
    pub fn new(radius: i32) -> Self {
        Vision {
            radius,
            ally: Sight::default(),
            enemy: Sight::default(),
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    fn sight(&self, faction: Faction) -> &Sight {
        match faction {
            Faction::Ally => &self.ally,
            Faction::Enemy => &self.enemy,
        }
    }

    fn sight_mut(&mut self, faction: Faction) -> &mut Sight {
        match faction {
            Faction::Ally => &mut self.ally,
            Faction::Enemy => &mut self.enemy,
        }
    }

    /// Recomputes visibility from the registry's current unit positions.
    pub fn update(&mut self, registry: &UnitRegistry) {
        for faction in [Faction::Ally, Faction::Enemy] {
            let mut visible = HashSet::new();
            for unit in registry.by_faction(faction) {
                visible.extend(tiles_within(unit.pos(), self.radius));
            }
            let sight = self.sight_mut(faction);
            sight.revealed.extend(visible.iter().copied());
            sight.visible = visible;
        }
    }

    pub fn is_visible(&self, tile: Coord, faction: Faction) -> bool {
        self.sight(faction).visible.contains(&tile)
    }

    /// Whether `faction` has seen `tile` at any point.
    pub fn is_revealed(&self, tile: Coord, faction: Faction) -> bool {
        self.sight(faction).revealed.contains(&tile)
    }

    pub fn visible_tiles(&self, faction: Faction) -> &HashSet<Coord> {
        &self.sight(faction).visible
    }

    /// Hostile units `viewer` can currently see, in ascending id order.
    pub fn visible_enemies<'a>(
        &'a self,
        registry: &'a UnitRegistry,
        viewer: Faction,
    ) -> impl Iterator<Item = &'a Unit> + 'a {
        registry
            .by_faction(viewer.opponent())
            .filter(move |u| self.is_visible(u.pos(), viewer))
    }
}

/// Every tile within Manhattan distance `radius` of `center`, inclusive.
pub fn tiles_within(center: Coord, radius: i32) -> Vec<Coord> {
    let mut tiles = Vec::new();
    for dx in -radius..=radius {
        let span = radius - dx.abs();
        for dy in -span..=span {
            tiles.push(Coord::new(center.x + dx, center.y + dy));
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::UnitKind;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn diamond_has_expected_size() {
        assert_eq!(tiles_within(c(0, 0), 0), vec![c(0, 0)]);
        assert_eq!(tiles_within(c(0, 0), 1).len(), 5);
        assert_eq!(tiles_within(c(0, 0), 3).len(), 25);
    }

    #[test]
    fn radius_is_inclusive() {
        let tiles = tiles_within(c(2, 2), 3);
        assert!(tiles.contains(&c(5, 2)));
        assert!(tiles.contains(&c(2, -1)));
        assert!(!tiles.contains(&c(5, 3)));
        assert!(tiles.iter().all(|t| t.manhattan(c(2, 2)) <= 3));
    }

    #[test]
    fn visibility_follows_units_and_reveal_persists() {
        let mut registry = UnitRegistry::new();
        let id = registry
            .spawn(UnitKind::Commander, Faction::Ally, c(0, 0))
            .unwrap();
        let mut vision = Vision::new(2);
        vision.update(&registry);
        assert!(vision.is_visible(c(0, 2), Faction::Ally));
        assert!(!vision.is_visible(c(0, 2), Faction::Enemy));

        registry.move_unit(id, c(0, 5)).unwrap();
        vision.update(&registry);
        assert!(!vision.is_visible(c(0, 0), Faction::Ally));
        assert!(vision.is_revealed(c(0, 0), Faction::Ally));
        assert!(vision.is_visible(c(0, 7), Faction::Ally));
    }

    #[test]
    fn fogged_enemies_are_filtered() {
        let mut registry = UnitRegistry::new();
        registry
            .spawn(UnitKind::Infantry, Faction::Ally, c(0, 0))
            .unwrap();
        let near = registry
            .spawn(UnitKind::Infantry, Faction::Enemy, c(1, 2))
            .unwrap();
        registry
            .spawn(UnitKind::Infantry, Faction::Enemy, c(6, 6))
            .unwrap();
        let mut vision = Vision::new(3);
        vision.update(&registry);
        let seen: Vec<_> = vision
            .visible_enemies(&registry, Faction::Ally)
            .map(|u| u.id)
            .collect();
        assert_eq!(seen, vec![near]);
    }
}

//! The unit registry: the only place units are created, moved and destroyed.
//!
//! The registry owns every live [`Unit`] and the [`GridIndex`] that locates
//! them. Every coordinate change goes through [`UnitRegistry::move_unit`] or
//! [`UnitRegistry::relocate`], which update the unit and the index together
//! and record a [`Event::PositionChanged`] notification.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use super::coord::Coord;
use super::event::Event;
use super::grid::{GridIndex, OccupancyError, Snapshot};
use super::unit::{Faction, Unit, UnitId, UnitKind};

/// Owner of all live units, indexed by id and by position.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: BTreeMap<UnitId, Unit>,
    grid: GridIndex,
    next_id: u32,
    events: Vec<Event>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a unit with a fresh id and registers it at `at`.
    pub fn spawn(
        &mut self,
        kind: UnitKind,
        faction: Faction,
        at: Coord,
    ) -> Result<UnitId, OccupancyError> {
        let id = UnitId(self.next_id);
        self.register(Unit::new(id, kind, faction, at))?;
        Ok(id)
    }

    /// Adds a unit to the registry and the occupancy index.
    ///
    /// Fails without side effects if the unit's tile is already taken.
    pub fn register(&mut self, unit: Unit) -> Result<(), OccupancyError> {
        let id = unit.id;
        let at = unit.pos();
        if let Err(e) = self.grid.insert(at, id) {
            warn!(error = %e, "unit registration rejected");
            return Err(e);
        }
        self.events.push(Event::Registered {
            unit: id,
            kind: unit.kind,
            faction: unit.faction,
            at,
        });
        self.next_id = self.next_id.max(id.0 + 1);
        self.units.insert(id, unit);
        debug!(unit = %id, %at, "unit registered");
        Ok(())
    }

    /// Removes a unit from the registry and its tile. Returns the removed unit.
    pub fn unregister(&mut self, id: UnitId) -> Result<Unit, OccupancyError> {
        let unit = self
            .units
            .remove(&id)
            .ok_or(OccupancyError::UnknownUnit(id))?;
        self.grid.remove(unit.pos(), id);
        self.events.push(Event::Unregistered {
            unit: id,
            at: unit.pos(),
        });
        debug!(unit = %id, at = %unit.pos(), "unit unregistered");
        Ok(unit)
    }

    /// Moves one unit to `to`, keeping the index in step.
    pub fn move_unit(&mut self, id: UnitId, to: Coord) -> Result<(), OccupancyError> {
        let from = self
            .units
            .get(&id)
            .map(Unit::pos)
            .ok_or(OccupancyError::UnknownUnit(id))?;
        if from == to {
            return Ok(());
        }
        self.grid.insert(to, id)?;
        self.grid.remove(from, id);
        self.commit_position(id, from, to);
        Ok(())
    }

    /// Moves several units at once, as if simultaneously.
    ///
    /// All movers leave their tiles before any of them arrives, so rotations
    /// and chains are legal. The batch is validated first: if any arrival
    /// would land on an occupied tile (or two arrivals share one) nothing is
    /// changed and the first conflict is returned.
    pub fn relocate(&mut self, moves: &[(UnitId, Coord)]) -> Result<(), OccupancyError> {
        let mut leaving = HashSet::new();
        for &(id, to) in moves {
            let unit = self.units.get(&id).ok_or(OccupancyError::UnknownUnit(id))?;
            if unit.pos() != to {
                leaving.insert(id);
            }
        }

        let mut arriving: BTreeMap<Coord, UnitId> = BTreeMap::new();
        for &(id, to) in moves {
            if !leaving.contains(&id) {
                continue;
            }
            if let Some(&other) = arriving.get(&to) {
                return Err(OccupancyError::Occupied {
                    at: to,
                    incumbent: other,
                    arrival: id,
                });
            }
            if let Some(incumbent) = self.grid.occupant(to) {
                if !leaving.contains(&incumbent) {
                    return Err(OccupancyError::Occupied {
                        at: to,
                        incumbent,
                        arrival: id,
                    });
                }
            }
            arriving.insert(to, id);
        }

        let mut departures = Vec::with_capacity(arriving.len());
        for &(id, to) in moves {
            if leaving.contains(&id) {
                let from = self.units[&id].pos();
                self.grid.remove(from, id);
                departures.push((id, from, to));
            }
        }
        for (id, from, to) in departures {
            self.grid.insert(to, id)?;
            self.commit_position(id, from, to);
        }
        Ok(())
    }

    /// Puts an index entry on `at` with no unit behind it.
    #[cfg(test)]
    pub(crate) fn index_stray(&mut self, at: Coord, id: UnitId) {
        let _ = self.grid.insert(at, id);
    }

    fn commit_position(&mut self, id: UnitId, from: Coord, to: Coord) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.set_pos(to);
        }
        self.events.push(Event::PositionChanged { unit: id, from, to });
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    pub fn unit_at(&self, at: Coord) -> Option<&Unit> {
        self.grid.occupant(at).and_then(|id| self.units.get(&id))
    }

    /// True if `at` holds a unit hostile to `faction`.
    pub fn has_enemy_at(&self, at: Coord, faction: Faction) -> bool {
        self.unit_at(at).is_some_and(|u| u.faction != faction)
    }

    /// All live units in ascending id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    pub fn by_faction(&self, faction: Faction) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.faction == faction)
    }

    /// Units whose control set touches any of `tiles`.
    pub fn controllers_of<'a>(&'a self, tiles: &'a [Coord]) -> impl Iterator<Item = &'a Unit> {
        self.units
            .values()
            .filter(move |u| u.control_set().iter().any(|t| tiles.contains(t)))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copy of the occupancy index, detached from later updates.
    pub fn snapshot(&self) -> Snapshot {
        self.grid.snapshot()
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Takes all notifications recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    #[test]
    fn spawn_assigns_increasing_ids() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        let b = reg.spawn(UnitKind::Archer, Faction::Enemy, c(0, 5)).unwrap();
        assert!(a < b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.unit_at(c(0, 5)).map(|u| u.id), Some(b));
    }

    #[test]
    fn register_onto_occupied_tile_fails_cleanly() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(1, 1)).unwrap();
        reg.drain_events();
        let err = reg.spawn(UnitKind::Infantry, Faction::Enemy, c(1, 1)).unwrap_err();
        assert!(matches!(err, OccupancyError::Occupied { incumbent, .. } if incumbent == a));
        assert_eq!(reg.len(), 1);
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn unregister_clears_tile_once() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(2, 2)).unwrap();
        let removed = reg.unregister(a).unwrap();
        assert_eq!(removed.id, a);
        assert!(reg.unit_at(c(2, 2)).is_none());
        assert!(reg.snapshot().is_empty());
        assert_eq!(reg.unregister(a), Err(OccupancyError::UnknownUnit(a)));
    }

    #[test]
    fn unregister_with_queued_moves_leaves_no_trace() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        reg.get_mut(a).unwrap().plan_move([c(0, 1), c(0, 2)]);
        reg.unregister(a).unwrap();
        assert!(reg.snapshot().is_empty());
        assert!(reg.unit_at(c(0, 1)).is_none());
    }

    #[test]
    fn move_unit_updates_index_and_fires_once() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        reg.drain_events();
        reg.move_unit(a, c(0, 1)).unwrap();
        assert_eq!(reg.get(a).unwrap().pos(), c(0, 1));
        assert_eq!(reg.unit_at(c(0, 1)).map(|u| u.id), Some(a));
        assert!(reg.unit_at(c(0, 0)).is_none());
        assert_eq!(
            reg.drain_events(),
            vec![Event::PositionChanged {
                unit: a,
                from: c(0, 0),
                to: c(0, 1)
            }]
        );
    }

    #[test]
    fn move_onto_occupied_tile_is_rejected() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        let b = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 1)).unwrap();
        assert!(reg.move_unit(a, c(0, 1)).is_err());
        assert_eq!(reg.get(a).unwrap().pos(), c(0, 0));
        assert_eq!(reg.unit_at(c(0, 1)).map(|u| u.id), Some(b));
    }

    #[test]
    fn relocate_allows_rotation() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Commander, Faction::Ally, c(0, 0)).unwrap();
        let b = reg.spawn(UnitKind::Commander, Faction::Ally, c(1, 0)).unwrap();
        let d = reg.spawn(UnitKind::Commander, Faction::Ally, c(1, 1)).unwrap();
        reg.relocate(&[(a, c(1, 0)), (b, c(1, 1)), (d, c(0, 0))]).unwrap();
        assert_eq!(reg.unit_at(c(1, 0)).map(|u| u.id), Some(a));
        assert_eq!(reg.unit_at(c(1, 1)).map(|u| u.id), Some(b));
        assert_eq!(reg.unit_at(c(0, 0)).map(|u| u.id), Some(d));
        assert_eq!(reg.snapshot().len(), 3);
    }

    #[test]
    fn relocate_rejects_shared_arrival_atomically() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        let b = reg.spawn(UnitKind::Infantry, Faction::Ally, c(2, 0)).unwrap();
        reg.drain_events();
        assert!(reg.relocate(&[(a, c(1, 1)), (b, c(1, 1))]).is_err());
        assert_eq!(reg.get(a).unwrap().pos(), c(0, 0));
        assert_eq!(reg.get(b).unwrap().pos(), c(2, 0));
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn relocate_rejects_arrival_on_staying_unit() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        reg.spawn(UnitKind::Infantry, Faction::Enemy, c(0, 1)).unwrap();
        assert!(reg.relocate(&[(a, c(0, 1))]).is_err());
        assert_eq!(reg.get(a).unwrap().pos(), c(0, 0));
    }

    #[test]
    fn faction_queries() {
        let mut reg = UnitRegistry::new();
        reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        reg.spawn(UnitKind::Infantry, Faction::Ally, c(1, 0)).unwrap();
        reg.spawn(UnitKind::Infantry, Faction::Enemy, c(0, 5)).unwrap();
        assert_eq!(reg.by_faction(Faction::Ally).count(), 2);
        assert_eq!(reg.by_faction(Faction::Enemy).count(), 1);
        assert!(reg.has_enemy_at(c(0, 5), Faction::Ally));
        assert!(!reg.has_enemy_at(c(0, 0), Faction::Ally));
        assert!(!reg.has_enemy_at(c(9, 9), Faction::Ally));
    }

    #[test]
    fn controllers_cover_move_neighbourhood() {
        let mut reg = UnitRegistry::new();
        let a = reg.spawn(UnitKind::Infantry, Faction::Ally, c(0, 0)).unwrap();
        reg.spawn(UnitKind::Infantry, Faction::Enemy, c(5, 5)).unwrap();
        let tiles = [c(1, 1)];
        let ids: Vec<UnitId> = reg.controllers_of(&tiles).map(|u| u.id).collect();
        assert_eq!(ids, vec![a]);
    }
}

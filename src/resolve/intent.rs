//! Intent collection: what every unit wants to do this tick.
//!
//! Each unit contributes one [`Intent`], read from the head of its plan, and
//! units are grouped by the tile they intend to occupy. Groups are kept in
//! coordinate order so a sweep over them is deterministic.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::board::{Action, Coord, Faction, Unit, UnitId};

/// One unit's intention for the coming tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub unit: UnitId,
    pub faction: Faction,
    pub action: Action,
    /// Tile the unit stands on at tick start.
    pub from: Coord,
    /// Tile the unit intends to occupy after the tick.
    pub to: Coord,
    pub attack_target: Option<Coord>,
}

impl Intent {
    /// Reads the intent off a unit's current plan.
    pub fn of(unit: &Unit) -> Self {
        Intent {
            unit: unit.id,
            faction: unit.faction,
            action: unit.action(),
            from: unit.pos(),
            to: unit.next_tile(),
            attack_target: unit.attack_target(),
        }
    }

    pub fn wait(unit: UnitId, faction: Faction, at: Coord) -> Self {
        Intent {
            unit,
            faction,
            action: Action::Wait,
            from: at,
            to: at,
            attack_target: None,
        }
    }

    pub fn step(unit: UnitId, faction: Faction, from: Coord, to: Coord) -> Self {
        Intent {
            unit,
            faction,
            action: Action::Move,
            from,
            to,
            attack_target: None,
        }
    }

    /// A melee attack steps onto `target`; pass `to == from` for a ranged one.
    pub fn attack(unit: UnitId, faction: Faction, from: Coord, to: Coord, target: Coord) -> Self {
        Intent {
            unit,
            faction,
            action: Action::Attack,
            from,
            to,
            attack_target: Some(target),
        }
    }

    pub fn is_attack(&self) -> bool {
        self.action == Action::Attack
    }

    /// The tile under attack. Falls back to the step target for plans that
    /// lost their explicit target.
    pub fn target(&self) -> Coord {
        self.attack_target.unwrap_or(self.to)
    }

    /// A non-attacking unit that means to stay on its tile.
    pub fn is_stationary(&self) -> bool {
        !self.is_attack() && self.to == self.from
    }

    /// Whether the unit leaves its tile if allowed.
    pub fn vacates(&self) -> bool {
        self.action != Action::Wait && self.to != self.from
    }
}

/// All intents of a tick, grouped by intended tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentGroups {
    intents: BTreeMap<UnitId, Intent>,
    groups: Vec<(Coord, Vec<UnitId>)>,
}

impl IntentGroups {
    /// Collects the intent of every unit in `units`.
    pub fn collect<'a>(units: impl IntoIterator<Item = &'a Unit>) -> Self {
        Self::from_intents(units.into_iter().map(Intent::of))
    }

    /// Groups already-built intents. A later intent for the same unit
    /// replaces an earlier one.
    pub fn from_intents(intents: impl IntoIterator<Item = Intent>) -> Self {
        let intents: BTreeMap<UnitId, Intent> =
            intents.into_iter().map(|i| (i.unit, i)).collect();

        let mut by_tile: BTreeMap<Coord, Vec<UnitId>> = BTreeMap::new();
        for intent in intents.values() {
            by_tile.entry(intent.to).or_default().push(intent.unit);
        }

        IntentGroups {
            intents,
            groups: by_tile.into_iter().collect(),
        }
    }

    pub fn get(&self, unit: UnitId) -> Option<&Intent> {
        self.intents.get(&unit)
    }

    /// Intents in ascending unit id order.
    pub fn intents(&self) -> impl Iterator<Item = &Intent> {
        self.intents.values()
    }

    /// Groups in sweep order.
    pub fn groups(&self) -> impl Iterator<Item = (Coord, &[UnitId])> {
        self.groups.iter().map(|(t, ids)| (*t, ids.as_slice()))
    }

    /// Units that intend to occupy `tile`.
    pub fn group(&self, tile: Coord) -> &[UnitId] {
        self.groups
            .iter()
            .find(|(t, _)| *t == tile)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Number of units with an intent.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Permutes the sweep order of the groups and of the members within each.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        self.groups.shuffle(rng);
        for (_, members) in &mut self.groups {
            members.shuffle(rng);
        }
    }
}

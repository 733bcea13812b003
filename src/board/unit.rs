//! Unit archetypes, factions and per-unit plan state.
//!
//! A unit's coordinate is private: it changes only through the registry's
//! position-update path, which keeps the occupancy index in sync.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::coord::Coord;
use crate::movegen::sets::{attack_set, control_set, move_set};

/// Stable identity of a unit for the lifetime of a game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The archetype of a unit. Fixes its move/attack shapes and cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    Infantry,
    Spearman,
    Archer,
    Commander,
}

pub const ALL_KINDS: [UnitKind; 4] = [
    UnitKind::Infantry,
    UnitKind::Spearman,
    UnitKind::Archer,
    UnitKind::Commander,
];

impl UnitKind {
    /// Ranged units attack from where they stand instead of stepping onto the target.
    pub const fn is_ranged(self) -> bool {
        matches!(self, UnitKind::Archer)
    }

    /// Ticks a unit must wait after committing a step.
    pub const fn cooldown(self) -> u32 {
        match self {
            UnitKind::Infantry => 10,
            UnitKind::Spearman => 8,
            UnitKind::Archer => 8,
            UnitKind::Commander => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            UnitKind::Infantry => "infantry",
            UnitKind::Spearman => "spearman",
            UnitKind::Archer => "archer",
            UnitKind::Commander => "commander",
        }
    }
}

/// Which side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    Ally,
    Enemy,
}

impl Faction {
    /// Sign applied to the y component of move and attack offsets.
    pub const fn forward(self) -> i32 {
        match self {
            Faction::Ally => 1,
            Faction::Enemy => -1,
        }
    }

    pub const fn opponent(self) -> Faction {
        match self {
            Faction::Ally => Faction::Enemy,
            Faction::Enemy => Faction::Ally,
        }
    }
}

/// The kind of action a unit has queued for the coming tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    Wait,
    Move,
    Attack,
}

/// A unit on the board together with its queued plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub faction: Faction,
    pos: Coord,
    cooldown: u32,
    action: Action,
    /// Remaining steps of the current plan, front first.
    path: VecDeque<Coord>,
    attack_target: Option<Coord>,
    moving: bool,
}

impl Unit {
    /// Creates an idle unit at `pos` with no cooldown.
    pub fn new(id: UnitId, kind: UnitKind, faction: Faction, pos: Coord) -> Self {
        Unit {
            id,
            kind,
            faction,
            pos,
            cooldown: 0,
            action: Action::Wait,
            path: VecDeque::new(),
            attack_target: None,
            moving: false,
        }
    }

    pub fn pos(&self) -> Coord {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: Coord) {
        self.pos = pos;
    }

    pub fn forward(&self) -> i32 {
        self.faction.forward()
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn set_cooldown(&mut self, ticks: u32) {
        self.cooldown = ticks;
    }

    pub fn path(&self) -> impl Iterator<Item = Coord> + '_ {
        self.path.iter().copied()
    }

    pub fn attack_target(&self) -> Option<Coord> {
        self.attack_target
    }

    /// Whether the presentation layer should be animating this unit.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub(crate) fn set_moving(&mut self, moving: bool) {
        self.moving = moving;
    }

    /// Replaces the plan with a walk along `path`. An empty path leaves the unit waiting.
    pub fn plan_move(&mut self, path: impl IntoIterator<Item = Coord>) {
        self.path = path.into_iter().collect();
        self.attack_target = None;
        self.action = if self.path.is_empty() {
            Action::Wait
        } else {
            Action::Move
        };
    }

    /// Replaces the plan with an attack on `target`.
    ///
    /// Melee units queue a step onto the target; ranged units queue their own tile.
    pub fn plan_attack(&mut self, target: Coord) {
        let step = if self.kind.is_ranged() { self.pos } else { target };
        self.path = VecDeque::from([step]);
        self.attack_target = Some(target);
        self.action = Action::Attack;
    }

    /// Drops the plan and goes back to waiting.
    pub fn cancel(&mut self) {
        self.path.clear();
        self.attack_target = None;
        self.action = Action::Wait;
    }

    /// The tile this unit intends to occupy after the coming tick.
    pub fn next_tile(&self) -> Coord {
        if self.action == Action::Wait || self.cooldown > 0 {
            return self.pos;
        }
        self.path.front().copied().unwrap_or(self.pos)
    }

    /// A non-attacking unit that intends to stay where it is.
    pub fn is_stationary(&self) -> bool {
        self.action != Action::Attack && self.next_tile() == self.pos
    }

    pub fn move_set(&self) -> Vec<Coord> {
        move_set(self.kind, self.pos, self.forward())
    }

    pub fn attack_set(&self) -> Vec<Coord> {
        attack_set(self.kind, self.pos, self.forward())
    }

    pub fn control_set(&self) -> Vec<Coord> {
        control_set(self.kind, self.pos)
    }

    /// Counts the cooldown down by one tick.
    ///
    /// Returns true when the cooldown has just expired; a unit with a queued
    /// path is re-armed to move on the next tick.
    pub(crate) fn tick_cooldown(&mut self) -> bool {
        if self.cooldown == 0 {
            return false;
        }
        self.cooldown -= 1;
        if self.cooldown > 0 {
            return false;
        }
        if !self.path.is_empty() {
            self.action = Action::Move;
        }
        true
    }

    /// Pops the next step of the plan and arms the post-step cooldown.
    ///
    /// Returns the step and the action that produced it. The caller commits
    /// the coordinate through the registry.
    pub(crate) fn take_step(&mut self) -> Option<(Coord, Action)> {
        let step = self.path.pop_front()?;
        let action = self.action;
        self.action = Action::Wait;
        self.cooldown = self.kind.cooldown();
        if action == Action::Attack {
            self.attack_target = None;
        }
        Some((step, action))
    }

    /// Settles a unit that was allowed but had nothing to do this tick.
    pub(crate) fn settle_idle(&mut self) {
        if self.path.is_empty() {
            self.action = Action::Wait;
        }
    }
}

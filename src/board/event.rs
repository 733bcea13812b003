//! Notifications produced for presentation, vision and other collaborators.

use serde::Serialize;

use super::coord::Coord;
use super::unit::{Faction, UnitId, UnitKind};

/// Something observable that happened to a unit.
///
/// Events are buffered while a tick runs and handed out only once the board
/// is consistent again, so a consumer never sees a half-applied tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Registered {
        unit: UnitId,
        kind: UnitKind,
        faction: Faction,
        at: Coord,
    },
    Unregistered {
        unit: UnitId,
        at: Coord,
    },
    /// Fired exactly once per committed step.
    PositionChanged {
        unit: UnitId,
        from: Coord,
        to: Coord,
    },
    MoveStarted {
        unit: UnitId,
    },
    MoveStopped {
        unit: UnitId,
    },
    AttackPerformed {
        unit: UnitId,
        target: Coord,
    },
    GameOver {
        winner: Faction,
    },
}

impl Event {
    /// The unit the event is about, if any.
    pub fn unit(&self) -> Option<UnitId> {
        match *self {
            Event::Registered { unit, .. }
            | Event::Unregistered { unit, .. }
            | Event::PositionChanged { unit, .. }
            | Event::MoveStarted { unit }
            | Event::MoveStopped { unit }
            | Event::AttackPerformed { unit, .. } => Some(unit),
            Event::GameOver { .. } => None,
        }
    }
}

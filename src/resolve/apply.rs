//! Applies a tick's verdicts to the registry.
//!
//! Runs in ascending unit id order. Dead units are removed first so they do
//! not block arrivals. Allowed units then take their next step, and the
//! resulting landings are checked before anything is committed: two opposite
//! factions on one tile fight it out, anything else on a shared tile is sent
//! back where it came from. Surviving steps are committed to the registry in
//! one batch.
//!
//! All of this runs against a staged copy of the registry that replaces the
//! live one only once the commit succeeded, so a failed apply leaves the
//! board exactly as it was.

use std::collections::BTreeMap;

use tracing::debug;

use crate::board::{Action, Coord, Event, OccupancyError, Unit, UnitId, UnitRegistry};

use super::combat::{self, Contender};
use super::tick::{Resolution, Verdict};

/// A step an allowed unit takes this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub unit: UnitId,
    pub from: Coord,
    pub to: Coord,
    pub action: Action,
    /// Attacked tile, for attack steps.
    pub target: Option<Coord>,
}

/// What the apply phase did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    /// Destroyed units, in the order they were removed.
    pub casualties: Vec<Unit>,
    /// Steps committed to the registry.
    pub steps: Vec<Step>,
    /// Units sent back to their origin tile by landing arbitration.
    pub reverted: Vec<UnitId>,
}

/// Applies `resolution` to `registry`.
///
/// Fails only if the registry refuses a commit, which means the board was
/// already inconsistent. On failure `registry` is left untouched.
pub fn apply_resolution(
    registry: &mut UnitRegistry,
    resolution: &Resolution,
) -> Result<Applied, OccupancyError> {
    let mut staged = registry.clone();
    let applied = apply_staged(&mut staged, resolution)?;
    *registry = staged;
    Ok(applied)
}

fn apply_staged(
    registry: &mut UnitRegistry,
    resolution: &Resolution,
) -> Result<Applied, OccupancyError> {
    let mut applied = Applied::default();
    let mut steps = Vec::new();
    let mut dying = Vec::new();

    for (id, verdict) in resolution.iter() {
        let Some(unit) = registry.get_mut(id) else {
            continue;
        };
        match verdict {
            Verdict::Dies => dying.push(id),
            Verdict::Cancelled => unit.cancel(),
            Verdict::Engages | Verdict::Unresolved => {}
            Verdict::Allowed => {
                if unit.cooldown() > 0 {
                    unit.tick_cooldown();
                } else if unit.action() == Action::Wait {
                    unit.settle_idle();
                } else {
                    let from = unit.pos();
                    let target = unit.attack_target();
                    match unit.take_step() {
                        Some((to, action)) => steps.push(Step {
                            unit: id,
                            from,
                            to,
                            action,
                            target,
                        }),
                        None => unit.settle_idle(),
                    }
                }
            }
        }
    }

    for id in dying {
        applied.casualties.push(registry.unregister(id)?);
    }

    settle_landings(registry, &mut steps, &mut applied)?;

    let moves: Vec<(UnitId, Coord)> = steps.iter().map(|s| (s.unit, s.to)).collect();
    registry.relocate(&moves)?;

    for step in &steps {
        match step.action {
            Action::Attack => registry.emit(Event::AttackPerformed {
                unit: step.unit,
                target: step.target.unwrap_or(step.to),
            }),
            _ => {
                if let Some(unit) = registry.get_mut(step.unit) {
                    unit.set_moving(true);
                }
                registry.emit(Event::MoveStarted { unit: step.unit });
            }
        }
    }

    applied.steps = steps;
    Ok(applied)
}

/// Arbitrates tiles that would end the tick holding more than one unit.
///
/// Each round handles the first crowded tile in coordinate order and removes
/// at least one step or unit, so the loop terminates.
fn settle_landings(
    registry: &mut UnitRegistry,
    steps: &mut Vec<Step>,
    applied: &mut Applied,
) -> Result<(), OccupancyError> {
    loop {
        let by_unit: BTreeMap<UnitId, &Step> = steps.iter().map(|s| (s.unit, s)).collect();
        let mut landing: BTreeMap<Coord, Vec<Contender>> = BTreeMap::new();
        for unit in registry.units() {
            let (at, moved) = match by_unit.get(&unit.id) {
                Some(step) => (step.to, step.to != step.from),
                None => (unit.pos(), false),
            };
            landing.entry(at).or_default().push(Contender {
                unit: unit.id,
                faction: unit.faction,
                moved,
            });
        }

        let Some((tile, crowd)) = landing.into_iter().find(|(_, c)| c.len() > 1) else {
            return Ok(());
        };

        if crowd.len() == 2 && crowd[0].faction != crowd[1].faction {
            let fallen = combat::resolve_same_tile(registry, tile, crowd[0], crowd[1]);
            debug!(%tile, casualties = fallen.len(), "same-tile combat");
            for id in fallen {
                steps.retain(|s| s.unit != id);
                applied.casualties.push(registry.unregister(id)?);
            }
            continue;
        }

        let movers: Vec<UnitId> = crowd.iter().filter(|c| c.moved).map(|c| c.unit).collect();
        if movers.is_empty() {
            // Two units indexed on one tile; the commit will report it.
            return Ok(());
        }
        debug!(%tile, reverted = movers.len(), "shared landing; movers sent back");
        for id in movers {
            steps.retain(|s| s.unit != id);
            if let Some(unit) = registry.get_mut(id) {
                unit.cancel();
                unit.set_cooldown(0);
            }
            applied.reverted.push(id);
        }
    }
}

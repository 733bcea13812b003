//! Fixed-point tick resolution.
//!
//! Every unit starts `Unresolved` unless it is waiting. Each sweep judges
//! every intent group against the start-of-tick snapshot and the verdicts as
//! they stood when the sweep began, collecting proposals. The proposals are
//! then merged with a fixed precedence (`Dies` > `Cancelled` > `Engages` >
//! `Allowed`), so neither group order nor member order affects the result.
//!
//! A unit moving into an occupied tile depends on the occupant leaving, so
//! chains settle over several sweeps. When a sweep changes nothing, units that
//! simply hold their tile are allowed, and sweeping resumes. Whatever is still
//! unresolved after that sits in a cycle with no conflict and is allowed
//! through.
//!
//! Each changing sweep resolves at least one unit and no verdict ever goes
//! back to `Unresolved`, so at most `movers + 2` sweeps run. The sweep cap is a
//! guard against a corrupted snapshot, not part of normal operation.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::board::{Action, Coord, Snapshot, UnitId};

use super::intent::{Intent, IntentGroups};

/// Default multiplier for the sweep cap (cap = factor × occupied tiles).
pub const DEFAULT_SWEEP_CAP_FACTOR: usize = 2;

/// Merge order when one sweep proposes several verdicts for a unit.
fn precedence(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Unresolved => 0,
        Verdict::Allowed => 1,
        Verdict::Engages => 2,
        Verdict::Cancelled => 3,
        Verdict::Dies => 4,
    }
}

/// Per-unit outcome of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Unresolved,
    Allowed,
    Cancelled,
    /// Mutual attack; no casualties assigned.
    Engages,
    Dies,
}

/// Final verdicts of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    verdicts: BTreeMap<UnitId, Verdict>,
    swaps: BTreeSet<(UnitId, UnitId)>,
    sweeps: usize,
}

impl Resolution {
    pub fn verdict(&self, unit: UnitId) -> Option<Verdict> {
        self.verdicts.get(&unit).copied()
    }

    pub fn verdicts(&self) -> &BTreeMap<UnitId, Verdict> {
        &self.verdicts
    }

    /// Verdicts in ascending unit id order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, Verdict)> + '_ {
        self.verdicts.iter().map(|(u, v)| (*u, *v))
    }

    /// Units that received `verdict`.
    pub fn with(&self, verdict: Verdict) -> impl Iterator<Item = UnitId> + '_ {
        self.iter().filter(move |(_, v)| *v == verdict).map(|(u, _)| u)
    }

    /// Pairs cancelled for trying to trade tiles, lower id first.
    pub fn swaps(&self) -> impl Iterator<Item = (UnitId, UnitId)> + '_ {
        self.swaps.iter().copied()
    }

    /// Sweeps run before the fixed point was reached.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

/// The resolver hit its sweep cap.
///
/// Carries the fallback resolution in which every unit still unresolved at
/// the cap was forced to `Allowed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("resolution gave up after {sweeps} sweeps with {} units unresolved", .unresolved.len())]
pub struct NonConvergence {
    pub sweeps: usize,
    pub unresolved: Vec<UnitId>,
    pub fallback: Resolution,
}

/// Reusable fixed-point resolver.
///
/// Keeps its working buffers between calls; each call to [`resolve`]
/// starts from a clean state.
///
/// [`resolve`]: TickResolver::resolve
#[derive(Debug, Clone)]
pub struct TickResolver {
    sweep_cap_factor: usize,
    verdicts: BTreeMap<UnitId, Verdict>,
    swaps: BTreeSet<(UnitId, UnitId)>,
    proposals: BTreeMap<UnitId, Verdict>,
    contenders: Vec<Intent>,
}

impl Default for TickResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_CAP_FACTOR)
    }
}

impl TickResolver {
    pub fn new(sweep_cap_factor: usize) -> Self {
        TickResolver {
            sweep_cap_factor,
            verdicts: BTreeMap::new(),
            swaps: BTreeSet::new(),
            proposals: BTreeMap::new(),
            contenders: Vec::new(),
        }
    }

    /// Maximum number of sweeps for a board with `snapshot`'s occupancy.
    pub fn sweep_cap(&self, snapshot: &Snapshot) -> usize {
        self.sweep_cap_factor * snapshot.len().max(1)
    }

    /// Resolves one tick's intents against the start-of-tick occupancy.
    pub fn resolve(
        &mut self,
        groups: &IntentGroups,
        snapshot: &Snapshot,
    ) -> Result<Resolution, NonConvergence> {
        self.init(groups);
        let cap = self.sweep_cap(snapshot);
        let mut sweeps = 0;

        while self.has_unresolved() {
            if sweeps >= cap {
                return Err(self.give_up(sweeps));
            }
            sweeps += 1;
            if self.sweep(groups, snapshot) {
                continue;
            }
            if self.settle_stationary(groups) {
                continue;
            }
            break;
        }

        let residual = self.force_unresolved();
        if !residual.is_empty() {
            debug!(count = residual.len(), "cyclic movers allowed through");
        }
        Ok(self.finish(sweeps))
    }

    fn init(&mut self, groups: &IntentGroups) {
        self.verdicts.clear();
        self.swaps.clear();
        self.proposals.clear();
        for intent in groups.intents() {
            let verdict = if intent.action == Action::Wait {
                Verdict::Allowed
            } else {
                Verdict::Unresolved
            };
            self.verdicts.insert(intent.unit, verdict);
        }
    }

    fn has_unresolved(&self) -> bool {
        self.verdicts.values().any(|v| *v == Verdict::Unresolved)
    }

    /// Verdict at the start of the current sweep; units without an intent
    /// count as holding their tile.
    fn verdict(&self, unit: UnitId) -> Verdict {
        self.verdicts.get(&unit).copied().unwrap_or(Verdict::Allowed)
    }

    /// Proposes `verdict` for `unit`. Competing proposals in one sweep keep
    /// the strongest.
    fn propose(&mut self, unit: UnitId, verdict: Verdict) {
        let slot = self.proposals.entry(unit).or_insert(verdict);
        if precedence(verdict) > precedence(*slot) {
            *slot = verdict;
        }
    }

    /// Merges the sweep's proposals. Unresolved units take their proposal;
    /// resolved units only ever change to `Dies`, and a death is final.
    /// Returns true if any verdict changed.
    fn commit(&mut self) -> bool {
        let mut changed = false;
        for (id, proposed) in std::mem::take(&mut self.proposals) {
            let Some(slot) = self.verdicts.get_mut(&id) else {
                continue;
            };
            let accept = match *slot {
                Verdict::Dies => false,
                Verdict::Unresolved => true,
                _ => proposed == Verdict::Dies,
            };
            if accept && *slot != proposed {
                *slot = proposed;
                changed = true;
            }
        }
        changed
    }

    /// One sweep. Every group is judged against the verdicts as they stood
    /// when the sweep began, so the visiting order cannot change the outcome.
    fn sweep(&mut self, groups: &IntentGroups, snapshot: &Snapshot) -> bool {
        self.proposals.clear();
        for (tile, members) in groups.groups() {
            self.contenders.clear();
            for &id in members {
                if self.verdict(id) != Verdict::Unresolved {
                    continue;
                }
                // A unit holding its tile does not contend for it.
                match groups.get(id) {
                    Some(intent) if !intent.is_stationary() => self.contenders.push(*intent),
                    _ => {}
                }
            }

            match self.contenders.len() {
                0 => {}
                1 => {
                    let unit = self.contenders[0];
                    self.single(unit, tile, groups, snapshot);
                }
                2 => {
                    let (a, b) = (self.contenders[0], self.contenders[1]);
                    self.pair(a, b);
                }
                n => {
                    debug!(%tile, contenders = n, "gridlock; all cancelled");
                    let ids: Vec<UnitId> = self.contenders.iter().map(|i| i.unit).collect();
                    for id in ids {
                        self.propose(id, Verdict::Cancelled);
                    }
                }
            }
        }
        self.commit()
    }

    fn single(&mut self, unit: Intent, tile: Coord, groups: &IntentGroups, snapshot: &Snapshot) {
        if unit.is_attack() {
            return self.attack(unit, groups, snapshot);
        }

        let Some(occupant) = snapshot.occupant(tile) else {
            return self.propose(unit.unit, Verdict::Allowed);
        };
        if occupant == unit.unit {
            return;
        }

        let occ = groups.get(occupant).copied();
        if let Some(occ) = occ {
            if occ.to == unit.from {
                debug!(a = %unit.unit, b = %occ.unit, "swap detected; both cancelled");
                let pair = if unit.unit < occ.unit {
                    (unit.unit, occ.unit)
                } else {
                    (occ.unit, unit.unit)
                };
                self.swaps.insert(pair);
                self.propose(unit.unit, Verdict::Cancelled);
                self.propose(occ.unit, Verdict::Cancelled);
                return;
            }
        }

        match self.verdict(occupant) {
            Verdict::Unresolved => {}
            Verdict::Allowed if occ.is_some_and(|o| o.vacates()) => {
                self.propose(unit.unit, Verdict::Allowed)
            }
            _ => self.propose(unit.unit, Verdict::Cancelled),
        }
    }

    fn attack(&mut self, attacker: Intent, groups: &IntentGroups, snapshot: &Snapshot) {
        let target = attacker.target();
        let Some(occupant) = snapshot.occupant(target) else {
            return self.propose(attacker.unit, Verdict::Cancelled);
        };
        let occ = groups.get(occupant).copied();
        if occupant == attacker.unit || occ.is_some_and(|o| o.faction == attacker.faction) {
            return self.propose(attacker.unit, Verdict::Cancelled);
        }

        let occ_verdict = self.verdict(occupant);
        if let Some(o) = occ {
            if occ_verdict == Verdict::Unresolved && o.is_attack() && o.target() == attacker.from
            {
                debug!(a = %attacker.unit, b = %o.unit, "mutual attack; both engage");
                self.propose(attacker.unit, Verdict::Engages);
                self.propose(o.unit, Verdict::Engages);
                return;
            }
        }

        match occ_verdict {
            Verdict::Unresolved => {}
            Verdict::Allowed if occ.is_some_and(|o| o.to != target) => {
                self.propose(attacker.unit, Verdict::Cancelled)
            }
            _ => {
                debug!(attacker = %attacker.unit, victim = %occupant, %target, "attack lands");
                self.propose(attacker.unit, Verdict::Allowed);
                self.propose(occupant, Verdict::Dies);
            }
        }
    }

    fn pair(&mut self, a: Intent, b: Intent) {
        if (!a.is_attack() && !b.is_attack()) || a.faction == b.faction {
            self.propose(a.unit, Verdict::Cancelled);
            self.propose(b.unit, Verdict::Cancelled);
            return;
        }
        if a.is_attack() && b.is_attack() {
            self.propose(a.unit, Verdict::Engages);
            self.propose(b.unit, Verdict::Engages);
            return;
        }
        let (attacker, other) = if a.is_attack() { (a, b) } else { (b, a) };
        self.propose(attacker.unit, Verdict::Allowed);
        self.propose(other.unit, Verdict::Dies);
    }

    /// Lets units that hold their tile stay there.
    fn settle_stationary(&mut self, groups: &IntentGroups) -> bool {
        let mut changed = false;
        for intent in groups.intents() {
            if intent.is_stationary() && self.verdict(intent.unit) == Verdict::Unresolved {
                self.verdicts.insert(intent.unit, Verdict::Allowed);
                changed = true;
            }
        }
        changed
    }

    fn force_unresolved(&mut self) -> Vec<UnitId> {
        let mut forced = Vec::new();
        for (id, verdict) in self.verdicts.iter_mut() {
            if *verdict == Verdict::Unresolved {
                *verdict = Verdict::Allowed;
                forced.push(*id);
            }
        }
        forced
    }

    fn give_up(&mut self, sweeps: usize) -> NonConvergence {
        let unresolved = self.force_unresolved();
        warn!(
            sweeps,
            unresolved = unresolved.len(),
            "resolution hit the sweep cap; forcing remaining units through"
        );
        NonConvergence {
            sweeps,
            unresolved,
            fallback: self.finish(sweeps),
        }
    }

    fn finish(&mut self, sweeps: usize) -> Resolution {
        Resolution {
            verdicts: std::mem::take(&mut self.verdicts),
            swaps: std::mem::take(&mut self.swaps),
            sweeps,
        }
    }
}

/// Convenience function that creates a resolver and resolves one tick.
pub fn resolve_intents(
    groups: &IntentGroups,
    snapshot: &Snapshot,
) -> Result<Resolution, NonConvergence> {
    TickResolver::default().resolve(groups, snapshot)
}

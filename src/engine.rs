//! Tick orchestration.
//!
//! The [`Engine`] owns the board (tiles, registry, vision) and sequences one
//! tick: collect intents, resolve, apply, arbitrate combat, recompute vision.
//! A tick runs to completion before anything outside sees the board, so the
//! events handed back in a [`TickReport`] always describe a consistent state.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::board::{
    Coord, Event, Faction, OccupancyError, TileMap, Unit, UnitId, UnitKind, UnitRegistry,
};
use crate::config::EngineConfig;
use crate::movegen::find_path_on;
use crate::resolve::{apply_resolution, collide_swaps, IntentGroups, Resolution, TickResolver};
use crate::vision::Vision;

/// Most ticks a single [`Engine::update`] call runs.
pub const MAX_TICKS_PER_UPDATE: usize = 8;

/// Why an attack intent was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("{target} is outside the attack range of unit {unit}")]
    OutOfRange { unit: UnitId, target: Coord },

    #[error("no enemy of unit {unit} at {target}")]
    NoEnemy { unit: UnitId, target: Coord },

    #[error("unit {unit} is on cooldown for {remaining} more ticks")]
    OnCooldown { unit: UnitId, remaining: u32 },
}

/// Errors that abort a tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    #[error("board became inconsistent: {0}")]
    Occupancy(#[from] OccupancyError),
}

/// Whether the game is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Over { winner: Faction },
}

/// Everything that happened in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    pub resolution: Resolution,
    /// False if the resolver hit its sweep cap and the fallback was applied.
    pub converged: bool,
    /// Units destroyed this tick.
    pub casualties: Vec<Unit>,
    /// Units whose step was undone by landing arbitration.
    pub reverted: Vec<UnitId>,
    /// Notifications recorded since the last drain, in order.
    pub events: Vec<Event>,
    /// Set on the tick a commander falls.
    pub winner: Option<Faction>,
}

/// The simultaneous-movement engine.
pub struct Engine {
    config: EngineConfig,
    tiles: TileMap,
    registry: UnitRegistry,
    resolver: TickResolver,
    vision: Vision,
    state: GameState,
    tick: u64,
    /// Seconds accumulated towards the next automatic tick.
    elapsed: f64,
}

impl Engine {
    /// Creates an engine with an empty board on `tiles`.
    pub fn new(config: EngineConfig, tiles: TileMap) -> Self {
        Engine {
            resolver: TickResolver::new(config.sweep_cap_factor),
            vision: Vision::new(config.vision_radius),
            config,
            tiles,
            registry: UnitRegistry::new(),
            state: GameState::Playing,
            tick: 0,
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn vision(&self) -> &Vision {
        &self.vision
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, GameState::Over { .. })
    }

    pub fn winner(&self) -> Option<Faction> {
        match self.state {
            GameState::Over { winner } => Some(winner),
            GameState::Playing => None,
        }
    }

    /// Ticks completed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.registry.get(id)
    }

    /// Switches between timer-driven and manual ticking.
    pub fn set_automatic(&mut self, automatic: bool) {
        self.config.automatic_ticks = automatic;
        self.elapsed = 0.0;
    }

    /// Places a new unit and refreshes vision.
    pub fn spawn(
        &mut self,
        kind: UnitKind,
        faction: Faction,
        at: Coord,
    ) -> Result<UnitId, OccupancyError> {
        let id = self.registry.spawn(kind, faction, at)?;
        self.vision.update(&self.registry);
        Ok(id)
    }

    /// Removes a unit outside of combat.
    pub fn remove(&mut self, id: UnitId) -> Result<Unit, OccupancyError> {
        let unit = self.registry.unregister(id)?;
        self.vision.update(&self.registry);
        Ok(unit)
    }

    /// Plans a walk to `target`.
    ///
    /// Never fails for a live unit: if no path exists the unit is left
    /// waiting where it is.
    pub fn set_move_intent(&mut self, id: UnitId, target: Coord) -> Result<(), IntentError> {
        let unit = self.registry.get(id).ok_or(IntentError::UnknownUnit(id))?;
        let path = match find_path_on(
            &self.tiles,
            unit.pos(),
            target,
            unit.kind,
            unit.forward(),
            self.config.path_search_limit,
        ) {
            Ok(path) => path,
            Err(e) => {
                debug!(unit = %id, error = %e, "no path; unit stays");
                Vec::new()
            }
        };
        if let Some(unit) = self.registry.get_mut(id) {
            unit.plan_move(path);
        }
        Ok(())
    }

    /// Plans an attack on `target`. On failure nothing changes.
    pub fn set_attack_intent(&mut self, id: UnitId, target: Coord) -> Result<(), IntentError> {
        let unit = self.registry.get(id).ok_or(IntentError::UnknownUnit(id))?;
        let rejection = if !unit.attack_set().contains(&target) {
            Some(IntentError::OutOfRange { unit: id, target })
        } else if !self.registry.has_enemy_at(target, unit.faction) {
            Some(IntentError::NoEnemy { unit: id, target })
        } else if unit.cooldown() > 0 {
            Some(IntentError::OnCooldown {
                unit: id,
                remaining: unit.cooldown(),
            })
        } else {
            None
        };
        if let Some(err) = rejection {
            debug!(error = %err, "attack intent rejected");
            return Err(err);
        }
        if let Some(unit) = self.registry.get_mut(id) {
            unit.plan_attack(target);
        }
        Ok(())
    }

    /// Called by the presentation layer when a unit's move animation ends.
    pub fn notify_movement_finished(&mut self, id: UnitId) {
        if let Some(unit) = self.registry.get_mut(id) {
            if unit.is_moving() {
                unit.set_moving(false);
                self.registry.emit(Event::MoveStopped { unit: id });
            }
        }
    }

    /// Takes notifications recorded outside of a tick (spawns, removals,
    /// finished movements).
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.registry.drain_events()
    }

    /// Runs one tick. Returns `None` once the game is over.
    ///
    /// A [`TickError`] leaves the board and the tick counter as they were.
    pub fn advance_tick(&mut self) -> Result<Option<TickReport>, TickError> {
        if self.is_over() {
            return Ok(None);
        }
        let tick = self.tick + 1;

        let snapshot = self.registry.snapshot();
        let groups = IntentGroups::collect(self.registry.units());
        let (resolution, converged) = match self.resolver.resolve(&groups, &snapshot) {
            Ok(resolution) => (resolution, true),
            Err(e) => {
                warn!(tick, error = %e, "applying fallback resolution");
                (e.fallback, false)
            }
        };

        let applied = apply_resolution(&mut self.registry, &resolution)?;
        self.tick = tick;
        let mut casualties = applied.casualties;
        if self.config.head_on_combat {
            casualties.extend(collide_swaps(&mut self.registry, resolution.swaps())?);
        }

        let mut winner = None;
        for dead in &casualties {
            if dead.kind == UnitKind::Commander && winner.is_none() {
                winner = Some(dead.faction.opponent());
            }
        }
        if let Some(winner) = winner {
            info!(tick, ?winner, "commander fell; game over");
            self.state = GameState::Over { winner };
            self.registry.emit(Event::GameOver { winner });
        }

        self.vision.update(&self.registry);

        debug!(
            tick,
            sweeps = resolution.sweeps(),
            moved = applied.steps.len(),
            casualties = casualties.len(),
            "tick resolved"
        );

        Ok(Some(TickReport {
            tick,
            resolution,
            converged,
            casualties,
            reverted: applied.reverted,
            events: self.registry.drain_events(),
            winner,
        }))
    }

    /// External tick trigger. Ignored while automatic ticking is on.
    pub fn request_manual_tick(&mut self) -> Result<Option<TickReport>, TickError> {
        if self.config.automatic_ticks {
            debug!("manual tick ignored in automatic mode");
            return Ok(None);
        }
        self.advance_tick()
    }

    /// Advances the tick timer by `elapsed` and runs the ticks that fell due,
    /// at most [`MAX_TICKS_PER_UPDATE`] of them. Time beyond that is dropped.
    pub fn update(&mut self, elapsed: Duration) -> Result<Vec<TickReport>, TickError> {
        let mut reports = Vec::new();
        if !self.config.automatic_ticks || self.is_over() {
            return Ok(reports);
        }
        let Some(interval) = self.config.tick_interval() else {
            return Ok(reports);
        };
        self.elapsed += elapsed.as_secs_f64();
        while self.elapsed >= interval {
            if reports.len() == MAX_TICKS_PER_UPDATE {
                debug!(behind = self.elapsed, "tick backlog dropped");
                self.elapsed = 0.0;
                break;
            }
            self.elapsed -= interval;
            match self.advance_tick()? {
                Some(report) => reports.push(report),
                None => break,
            }
        }
        Ok(reports)
    }
}

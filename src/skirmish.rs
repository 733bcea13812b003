//! Headless skirmish generation.
//!
//! Deploys two mirrored armies on a rectangular map and drives every idle
//! unit with the random command policy until a commander falls or the tick
//! limit is reached. Games are seeded, so a record can be replayed from its
//! seed, and batches run in parallel on a rayon pool.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::board::{Action, Coord, Faction, OccupancyError, TileMap, UnitKind};
use crate::config::EngineConfig;
use crate::engine::{Engine, TickError};
use crate::movegen::{random_command, Command};

/// Smallest map the mirrored deployment fits on.
pub const MIN_WIDTH: i32 = 5;
pub const MIN_HEIGHT: i32 = 6;

/// Errors that abort a skirmish batch.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    #[error("board {width}x{height} is too small; need at least {MIN_WIDTH}x{MIN_HEIGHT}")]
    BoardTooSmall { width: i32, height: i32 },

    #[error("deployment failed: {0}")]
    Deploy(#[from] OccupancyError),

    #[error(transparent)]
    Tick(#[from] TickError),

    #[error("failed to build thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a skirmish batch.
#[derive(Debug, Clone)]
pub struct SkirmishConfig {
    /// Number of games to play.
    pub games: usize,
    pub width: i32,
    pub height: i32,
    /// Ticks before a game is abandoned without a winner.
    pub max_ticks: u64,
    /// Base seed; game `i` uses `seed + i`. 0 picks a random base.
    pub seed: u64,
    /// Worker threads; 1 plays games sequentially.
    pub threads: usize,
    pub engine: EngineConfig,
}

impl Default for SkirmishConfig {
    fn default() -> Self {
        SkirmishConfig {
            games: 10,
            width: 9,
            height: 12,
            max_ticks: 500,
            seed: 0,
            threads: 4,
            engine: EngineConfig {
                automatic_ticks: false,
                ..EngineConfig::default()
            },
        }
    }
}

/// Outcome of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub game_id: usize,
    pub seed: u64,
    pub winner: Option<Faction>,
    pub ticks: u64,
    pub casualties: usize,
    pub ally_left: usize,
    pub enemy_left: usize,
    /// Steps undone by landing arbitration.
    pub reverted: usize,
    /// Ticks that needed the resolver's fallback.
    pub fallbacks: u64,
    /// Hash of the final board, for reproducibility checks.
    pub state_hash: u64,
}

/// Places both armies. The ally deploys along the bottom rows facing +y, the
/// enemy mirrors it along the top rows.
pub fn deploy(engine: &mut Engine, width: i32, height: i32) -> Result<(), SkirmishError> {
    if width < MIN_WIDTH || height < MIN_HEIGHT {
        return Err(SkirmishError::BoardTooSmall { width, height });
    }
    let mid = width / 2;
    let mut layout = vec![
        (UnitKind::Commander, Coord::new(mid, 0)),
        (UnitKind::Archer, Coord::new(mid - 2, 0)),
        (UnitKind::Archer, Coord::new(mid + 2, 0)),
        (UnitKind::Spearman, Coord::new(mid - 1, 1)),
        (UnitKind::Spearman, Coord::new(mid + 1, 1)),
    ];
    layout.extend((0..width).step_by(2).map(|x| (UnitKind::Infantry, Coord::new(x, 2))));

    for faction in [Faction::Ally, Faction::Enemy] {
        for &(kind, at) in &layout {
            let at = match faction {
                Faction::Ally => at,
                Faction::Enemy => Coord::new(at.x, height - 1 - at.y),
            };
            engine.spawn(kind, faction, at)?;
        }
    }
    Ok(())
}

/// Gives every idle unit a fresh random command.
pub fn issue_commands(engine: &mut Engine, rng: &mut SmallRng) {
    for id in engine.registry().ids() {
        let command = match engine.unit(id) {
            Some(unit)
                if unit.action() == Action::Wait
                    && unit.cooldown() == 0
                    && unit.path().next().is_none() =>
            {
                random_command(unit, engine.registry(), engine.tiles(), rng)
            }
            _ => None,
        };
        let result = match command {
            Some(Command::Attack(target)) => engine.set_attack_intent(id, target),
            Some(Command::Move(target)) => engine.set_move_intent(id, target),
            None => Ok(()),
        };
        if let Err(e) = result {
            debug!(unit = %id, error = %e, "command rejected");
        }
    }
}

/// Hash of the board: every unit's identity, kind, side and tile.
pub fn state_hash(engine: &Engine) -> u64 {
    let mut hasher = DefaultHasher::new();
    for unit in engine.registry().units() {
        unit.id.hash(&mut hasher);
        unit.kind.hash(&mut hasher);
        unit.faction.hash(&mut hasher);
        unit.pos().hash(&mut hasher);
    }
    hasher.finish()
}

/// Plays one game from `seed`.
pub fn play_game(
    config: &SkirmishConfig,
    game_id: usize,
    seed: u64,
) -> Result<GameRecord, SkirmishError> {
    let engine_config = EngineConfig {
        automatic_ticks: false,
        ..config.engine.clone()
    };
    let mut engine = Engine::new(engine_config, TileMap::rectangle(config.width, config.height));
    deploy(&mut engine, config.width, config.height)?;
    engine.drain_events();

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut casualties = 0;
    let mut reverted = 0;
    let mut fallbacks = 0;

    while engine.tick_count() < config.max_ticks {
        issue_commands(&mut engine, &mut rng);
        let Some(report) = engine.request_manual_tick()? else {
            break;
        };
        casualties += report.casualties.len();
        reverted += report.reverted.len();
        if !report.converged {
            fallbacks += 1;
        }
        if report.winner.is_some() {
            break;
        }
    }

    let record = GameRecord {
        game_id,
        seed,
        winner: engine.winner(),
        ticks: engine.tick_count(),
        casualties,
        ally_left: engine.registry().by_faction(Faction::Ally).count(),
        enemy_left: engine.registry().by_faction(Faction::Enemy).count(),
        reverted,
        fallbacks,
        state_hash: state_hash(&engine),
    };
    debug!(game_id, ticks = record.ticks, winner = ?record.winner, "game finished");
    Ok(record)
}

/// Plays `config.games` games, in parallel when `config.threads > 1`.
///
/// Records come back in game order regardless of which thread played them.
pub fn run_batch(config: &SkirmishConfig) -> Result<Vec<GameRecord>, SkirmishError> {
    use rayon::prelude::*;

    let base = if config.seed != 0 {
        config.seed
    } else {
        rand::random()
    };
    let seeds: Vec<u64> = (0..config.games)
        .map(|i| base.wrapping_add(i as u64))
        .collect();
    info!(games = config.games, threads = config.threads, base_seed = base, "starting batch");

    if config.threads <= 1 {
        return seeds
            .iter()
            .enumerate()
            .map(|(i, &seed)| play_game(config, i, seed))
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    pool.install(|| {
        seeds
            .par_iter()
            .enumerate()
            .map(|(i, &seed)| play_game(config, i, seed))
            .collect()
    })
}

/// Writes records as JSONL, one game per line.
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub games: usize,
    pub ally_wins: usize,
    pub enemy_wins: usize,
    pub undecided: usize,
    pub mean_ticks: f64,
    pub mean_casualties: f64,
}

/// Tallies wins and averages over `games`. An empty batch averages to zero.
pub fn summarize(games: &[GameRecord]) -> Summary {
    let n = games.len().max(1) as f64;
    let wins = |f: Faction| games.iter().filter(|g| g.winner == Some(f)).count();
    Summary {
        games: games.len(),
        ally_wins: wins(Faction::Ally),
        enemy_wins: wins(Faction::Enemy),
        undecided: games.iter().filter(|g| g.winner.is_none()).count(),
        mean_ticks: games.iter().map(|g| g.ticks as f64).sum::<f64>() / n,
        mean_casualties: games.iter().map(|g| g.casualties as f64).sum::<f64>() / n,
    }
}

/// Prints a summary of a batch to stderr.
pub fn print_summary(games: &[GameRecord]) {
    let s = summarize(games);
    eprintln!("=== Skirmish Summary ===");
    eprintln!("Games: {}", s.games);
    eprintln!("Ally wins: {}", s.ally_wins);
    eprintln!("Enemy wins: {}", s.enemy_wins);
    eprintln!("Undecided: {}", s.undecided);
    eprintln!("Avg ticks/game: {:.1}", s.mean_ticks);
    eprintln!("Avg casualties/game: {:.1}", s.mean_casualties);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SkirmishConfig {
        SkirmishConfig {
            games: 4,
            max_ticks: 120,
            seed: 17,
            threads: 1,
            ..SkirmishConfig::default()
        }
    }

    #[test]
    fn deployment_is_mirrored() {
        let mut engine = Engine::new(small().engine, TileMap::rectangle(9, 12));
        deploy(&mut engine, 9, 12).unwrap();
        let allies = engine.registry().by_faction(Faction::Ally).count();
        let enemies = engine.registry().by_faction(Faction::Enemy).count();
        assert_eq!(allies, 10);
        assert_eq!(allies, enemies);
        let commander = engine.registry().unit_at(Coord::new(4, 11)).unwrap();
        assert_eq!(commander.kind, UnitKind::Commander);
        assert_eq!(commander.faction, Faction::Enemy);
    }

    #[test]
    fn tiny_board_is_rejected() {
        let mut engine = Engine::new(small().engine, TileMap::rectangle(3, 3));
        assert!(matches!(
            deploy(&mut engine, 3, 3),
            Err(SkirmishError::BoardTooSmall { .. })
        ));
    }

    #[test]
    fn single_game_completes() {
        let config = small();
        let record = play_game(&config, 0, 5).unwrap();
        assert!(record.ticks >= 1);
        assert!(record.ticks <= config.max_ticks);
        assert_eq!(record.ally_left + record.enemy_left + record.casualties, 20);
        if record.winner.is_none() {
            assert_eq!(record.ticks, config.max_ticks);
        }
    }

    #[test]
    fn same_seed_same_game() {
        let config = small();
        assert_eq!(
            play_game(&config, 0, 99).unwrap(),
            play_game(&config, 0, 99).unwrap()
        );
    }

    #[test]
    fn parallel_batch_matches_sequential() {
        let sequential = run_batch(&small()).unwrap();
        let parallel = run_batch(&SkirmishConfig {
            threads: 3,
            ..small()
        })
        .unwrap();
        assert_eq!(sequential.len(), 4);
        assert_eq!(sequential, parallel);
        assert_eq!(
            sequential.iter().map(|g| g.seed).collect::<Vec<_>>(),
            vec![17, 18, 19, 20]
        );
    }

    #[test]
    fn jsonl_output_is_valid() {
        let games = run_batch(&SkirmishConfig {
            games: 2,
            ..small()
        })
        .unwrap();
        let mut buf = Vec::new();
        write_jsonl(&games, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(v.get("state_hash").is_some());
            assert!(v.get("winner").is_some());
        }
    }

    #[test]
    fn summary_counts_outcomes() {
        let mk = |winner, ticks| GameRecord {
            game_id: 0,
            seed: 0,
            winner,
            ticks,
            casualties: 2,
            ally_left: 0,
            enemy_left: 0,
            reverted: 0,
            fallbacks: 0,
            state_hash: 0,
        };
        let s = summarize(&[
            mk(Some(Faction::Ally), 10),
            mk(Some(Faction::Enemy), 20),
            mk(None, 30),
        ]);
        assert_eq!((s.ally_wins, s.enemy_wins, s.undecided), (1, 1, 1));
        assert!((s.mean_ticks - 20.0).abs() < 1e-9);
        assert!((s.mean_casualties - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary_is_zero() {
        let s = summarize(&[]);
        assert_eq!(s.games, 0);
        assert_eq!(s.mean_ticks, 0.0);
        assert_eq!(s.mean_casualties, 0.0);
    }
}

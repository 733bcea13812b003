//! Headless skirmish CLI.
//!
//! Plays seeded random skirmishes and writes one JSON record per game.
//!
//! Usage:
//!   cargo run --release --bin skirmish -- [OPTIONS]
//!
//! Options:
//!   --games N        Number of games to play (default: 10)
//!   --width W        Map width (default: 9)
//!   --height H       Map height (default: 12)
//!   --max-ticks N    Ticks before a game is abandoned (default: 500)
//!   --threads N      Number of parallel threads (default: 4)
//!   --seed N         Base seed, 0 for entropy (default: 0)
//!   --config FILE    Engine configuration as JSON
//!   --head-on        Fight out head-on swaps
//!   --output FILE    Output file path (default: stdout)
//!   --quiet          Suppress summary output
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `tactica=info`).

use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::process;
use std::str::FromStr;
use std::time::Instant;

use tactica::config::EngineConfig;
use tactica::skirmish::{self, SkirmishConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tactica=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = SkirmishConfig::default();
    let mut output_path: Option<String> = None;
    let mut head_on = false;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => {
                i += 1;
                config.games = value(&args, i, "--games");
            }
            "--width" => {
                i += 1;
                config.width = value(&args, i, "--width");
            }
            "--height" => {
                i += 1;
                config.height = value(&args, i, "--height");
            }
            "--max-ticks" => {
                i += 1;
                config.max_ticks = value(&args, i, "--max-ticks");
            }
            "--threads" => {
                i += 1;
                config.threads = value(&args, i, "--threads");
            }
            "--seed" => {
                i += 1;
                config.seed = value(&args, i, "--seed");
            }
            "--config" => {
                i += 1;
                let path: String = value(&args, i, "--config");
                config.engine = load_engine_config(&path);
            }
            "--head-on" => {
                head_on = true;
            }
            "--output" => {
                i += 1;
                output_path = Some(value(&args, i, "--output"));
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if head_on {
        config.engine.head_on_combat = true;
    }

    let start = Instant::now();
    let games = match skirmish::run_batch(&config) {
        Ok(games) => games,
        Err(e) => {
            tracing::error!(error = %e, "skirmish batch failed");
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!(
            "Completed {} games in {:.2}s on a {}x{} map",
            games.len(),
            elapsed.as_secs_f64(),
            config.width,
            config.height
        );
        skirmish::print_summary(&games);
    }

    let written = match output_path {
        Some(path) => File::create(&path).and_then(|file| {
            let mut writer = BufWriter::new(file);
            skirmish::write_jsonl(&games, &mut writer)
        }),
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            skirmish::write_jsonl(&games, &mut writer)
        }
    };
    if let Err(e) = written {
        eprintln!("failed to write output: {}", e);
        process::exit(1);
    }
}

/// Parses the value following a flag, exiting with a message if it is
/// missing or malformed.
fn value<T: FromStr>(args: &[String], i: usize, flag: &str) -> T {
    match args.get(i).map(|s| s.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => {
            eprintln!("invalid or missing {} value", flag);
            process::exit(1);
        }
    }
}

fn load_engine_config(path: &str) -> EngineConfig {
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| EngineConfig::from_json(&text).map_err(|e| e.to_string()));
    match parsed {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load {}: {}", path, e);
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: skirmish [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N        Number of games to play (default: 10)");
    eprintln!("  --width W        Map width (default: 9)");
    eprintln!("  --height H       Map height (default: 12)");
    eprintln!("  --max-ticks N    Ticks before a game is abandoned (default: 500)");
    eprintln!("  --threads N      Number of parallel threads (default: 4)");
    eprintln!("  --seed N         Base seed, 0 for entropy (default: 0)");
    eprintln!("  --config FILE    Engine configuration as JSON");
    eprintln!("  --head-on        Fight out head-on swaps");
    eprintln!("  --output FILE    Output file path (default: stdout)");
    eprintln!("  --quiet          Suppress summary output");
    eprintln!("  --help           Show this help");
}

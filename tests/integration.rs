//! Integration tests for the skirmish binary.
//!
//! Spawns the binary with a small batch and checks the JSONL it writes.

use std::process::{Command, Output};

/// Runs the skirmish binary with `args` and returns its output.
fn run_skirmish(args: &[&str]) -> Output {
    let exe = env!("CARGO_BIN_EXE_skirmish");
    Command::new(exe)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to start skirmish")
}

/// Runs a batch that must succeed and returns its stdout lines.
fn run_batch(args: &[&str]) -> Vec<String> {
    let output = run_skirmish(args);
    assert!(
        output.status.success(),
        "skirmish failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .expect("stdout is utf-8")
        .lines()
        .map(str::to_string)
        .collect()
}

const SMALL: &[&str] = &[
    "--games",
    "3",
    "--seed",
    "7",
    "--threads",
    "1",
    "--max-ticks",
    "50",
    "--quiet",
];

#[test]
fn writes_one_record_per_game() {
    let lines = run_batch(SMALL);
    assert_eq!(lines.len(), 3);

    for (i, line) in lines.iter().enumerate() {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["game_id"], i as u64);
        assert_eq!(record["seed"], 7 + i as u64);
        for field in ["winner", "ticks", "casualties", "ally_left", "enemy_left", "state_hash"] {
            assert!(record.get(field).is_some(), "missing {} in {}", field, line);
        }
        let ticks = record["ticks"].as_u64().unwrap();
        assert!((1..=50).contains(&ticks));
    }
}

#[test]
fn same_seed_same_output() {
    assert_eq!(run_batch(SMALL), run_batch(SMALL));
}

#[test]
fn thread_count_does_not_change_output() {
    let sequential = run_batch(SMALL);
    let mut args = SMALL.to_vec();
    args[5] = "3";
    assert_eq!(run_batch(&args), sequential);
}

#[test]
fn output_file_matches_stdout() {
    let path = std::env::temp_dir()
        .join(format!("tactica-skirmish-{}.jsonl", std::process::id()));
    let path_str = path.to_str().unwrap();
    let mut args = SMALL.to_vec();
    args.extend(["--output", path_str]);

    let stdout = run_batch(&args);
    assert!(stdout.is_empty());
    let written = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(written.lines().collect::<Vec<_>>(), run_batch(SMALL));
}

#[test]
fn config_file_is_applied() {
    let path = std::env::temp_dir()
        .join(format!("tactica-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "head_on_combat": true, "vision_radius": 2 }"#).unwrap();
    let mut args = SMALL.to_vec();
    args.extend(["--config", path.to_str().unwrap()]);

    let lines = run_batch(&args);
    std::fs::remove_file(&path).ok();
    assert_eq!(lines.len(), 3);
}

#[test]
fn summary_goes_to_stderr() {
    let output = run_skirmish(&[
        "--games",
        "1",
        "--seed",
        "3",
        "--threads",
        "1",
        "--max-ticks",
        "20",
    ]);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("=== Skirmish Summary ==="));
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 1);
}

#[test]
fn unknown_argument_fails() {
    let output = run_skirmish(&["--bogus"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown argument"));
}

#[test]
fn malformed_value_fails() {
    let output = run_skirmish(&["--games", "many"]);
    assert!(!output.status.success());
}

#[test]
fn too_small_board_fails() {
    let output = run_skirmish(&["--games", "1", "--width", "3", "--seed", "1", "--quiet"]);
    assert!(!output.status.success());
}

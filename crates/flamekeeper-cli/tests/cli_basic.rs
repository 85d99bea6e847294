//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME, so the
//! config file and database never leak between tests.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_flamekeeper-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("FLAMEKEEPER_ENV")
        .env_remove("FLAMEKEEPER_USER")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn run_json(home: &Path, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(home, args);
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

fn write_series(home: &Path, body: &str) -> String {
    let path = home.join("series.json");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_config_roundtrip() {
    let home = TempDir::new().unwrap();
    assert_eq!(
        run_ok(home.path(), &["config", "get", "flame.window_size"]).trim(),
        "5"
    );
    run_ok(home.path(), &["config", "set", "flame.window_size", "3"]);
    assert_eq!(
        run_ok(home.path(), &["config", "get", "flame.window_size"]).trim(),
        "3"
    );

    let list = run_json(home.path(), &["config", "list"]);
    assert_eq!(list["flame"]["window_size"], 3);
    assert_eq!(list["api"]["values_path"], "api/values");
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "ui.dark_mode"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));

    let (_, _, code) = run_cli(home.path(), &["config", "set", "flame.window_size", "big"]);
    assert_eq!(code, 1);
}

#[test]
fn test_progress_commands() {
    let home = TempDir::new().unwrap();
    let show = run_json(home.path(), &["progress", "show", "--user", "p1"]);
    assert_eq!(show["key"]["level"], 1);
    assert_eq!(show["level"]["session"], 1);

    run_ok(home.path(), &["progress", "set-level", "--user", "p1", "3"]);
    run_ok(home.path(), &["progress", "select", "--user", "p1", "left"]);
    let next = run_json(home.path(), &["progress", "next-session", "--user", "p1"]);
    assert_eq!(next["key"]["level"], 3);
    assert_eq!(next["level"]["session"], 2);
    assert!(next["level"]["selected_option"].is_null());

    let modal = run_json(
        home.path(),
        &["progress", "modal", "--user", "p1", "last", "true"],
    );
    assert_eq!(modal["session"]["last_modal"], true);

    let other = run_json(home.path(), &["progress", "show", "--user", "p2"]);
    assert_eq!(other["key"]["level"], 1);

    let reset = run_json(home.path(), &["progress", "reset", "--user", "p1"]);
    assert_eq!(reset["removed"], 3);
    let show = run_json(home.path(), &["progress", "show", "--user", "p1"]);
    assert_eq!(show["key"]["level"], 1);
}

#[test]
fn test_progress_rejects_level_zero() {
    let home = TempDir::new().unwrap();
    let (_, _, code) = run_cli(home.path(), &["progress", "set-level", "--user", "p1", "0"]);
    assert_eq!(code, 1);
}

#[test]
fn test_flame_score_from_file() {
    let home = TempDir::new().unwrap();
    let series = write_series(home.path(), r#"[1, 2, 3, "4", 5, 6, 7, 8]"#);
    let out = run_json(
        home.path(),
        &[
            "flame", "score", "--series", &series, "--on", "2", "--off", "2", "--elapsed", "6",
            "--total", "10",
        ],
    );
    assert_eq!(out["score"], -4.0);
}

#[test]
fn test_flame_sample_saves_cursor() {
    let home = TempDir::new().unwrap();
    let series = write_series(home.path(), "[2, 4, 6, 8, 10]");
    let first = run_json(
        home.path(),
        &[
            "flame", "sample", "--series", &series, "--window", "2", "--steps", "1", "--user", "p1",
        ],
    );
    assert_eq!(first["samples"][0]["intensity"], 3.0);
    assert_eq!(first["cursor"], 2);

    let rest = run_json(
        home.path(),
        &["flame", "sample", "--series", &series, "--window", "2", "--user", "p1"],
    );
    assert_eq!(rest["samples"][0]["start"], 2);
    assert_eq!(rest["cursor"], 5);
    assert_eq!(rest["exhausted"], true);
}

#[test]
fn test_series_fetch_from_file() {
    let home = TempDir::new().unwrap();
    let series = write_series(home.path(), r#"{"values": ["1.5", null, 3]}"#);
    let out = run_json(home.path(), &["series", "fetch", "--series", &series]);
    assert_eq!(out["len"], 3);
    assert_eq!(out["values"], serde_json::json!([1.5, 0.0, 3.0]));
}

#[test]
fn test_timer_run_records_sessions() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "timer.tick_ms", "10"]);

    let stdout = run_ok(
        home.path(),
        &[
            "timer", "run", "--user", "p1", "--mode", "session", "--duration", "2", "--sessions",
            "2",
        ],
    );
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        [
            "TimerStarted",
            "TimerTicked",
            "TimerReseeded",
            "TimerTicked",
            "TimerReseeded"
        ]
    );

    let stats = run_json(home.path(), &["stats", "all", "--user", "p1"]);
    assert_eq!(stats["total_sessions"], 2);
    assert_eq!(stats["total_secs"], 4);
    assert_eq!(stats["forced_endings"], 0);

    let recent = run_json(home.path(), &["stats", "recent", "--user", "p1"]);
    let sessions: Vec<u64> = recent
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["session"].as_u64().unwrap())
        .collect();
    assert_eq!(sessions, [2, 1]);

    let show = run_json(home.path(), &["progress", "show", "--user", "p1"]);
    assert_eq!(show["level"]["played_sessions"], 2);
    assert_eq!(show["key"]["session"], 3);
    assert_eq!(show["level"]["session_time"], 2);
}

#[test]
fn test_timer_run_with_flame_scores_each_session() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "timer.tick_ms", "10"]);
    run_ok(home.path(), &["config", "set", "flame.window_size", "1"]);
    run_ok(home.path(), &["config", "set", "flame.on_duration", "2"]);
    run_ok(home.path(), &["config", "set", "flame.off_duration", "2"]);
    let squares: Vec<u64> = (0..40u64).map(|i| i * i).collect();
    let series = write_series(home.path(), &serde_json::to_string(&squares).unwrap());

    let stdout = run_ok(
        home.path(),
        &[
            "timer", "run", "--user", "p1", "--duration", "3", "--sessions", "2", "--flame",
            "--series", &series,
        ],
    );
    let sampled = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .filter(|event| event["type"] == "FlameSampled")
        .count();
    assert!(sampled > 0, "no flame samples in {stdout}");

    let recent = run_json(home.path(), &["stats", "recent", "--user", "p1"]);
    let rows = recent.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let (second, first) = (&rows[0], &rows[1]);
    assert_eq!(first["session"], 1);
    assert_eq!(second["session"], 2);
    // The first session reads the series from its start: 0 + 1 - 4 - 9.
    assert_eq!(first["score"], -12.0);
    // The second one starts where the flame stopped, further along the squares.
    assert!(second["score"].as_f64().unwrap() < -12.0);

    let show = run_json(home.path(), &["progress", "show", "--user", "p1"]);
    assert_eq!(show["key"]["session"], 3);
    let cursor = show["session"]["cursor"].as_u64().unwrap();
    assert!(cursor > 0 && cursor <= 40, "cursor {cursor}");
}

#[test]
fn test_timer_status_and_reset() {
    let home = TempDir::new().unwrap();
    run_ok(home.path(), &["config", "set", "timer.tick_ms", "10"]);
    run_ok(
        home.path(),
        &["timer", "run", "--user", "p1", "--duration", "3", "--sessions", "1"],
    );

    let status = run_json(home.path(), &["timer", "status", "--user", "p1"]);
    assert_eq!(status["session_time"], 3);

    run_ok(home.path(), &["timer", "reset", "--user", "p1"]);
    let status = run_json(home.path(), &["timer", "status", "--user", "p1"]);
    assert!(status["session_time"].is_null());
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();
    let script = run_ok(home.path(), &["completions", "bash"]);
    assert!(script.contains("flamekeeper-cli"));
}

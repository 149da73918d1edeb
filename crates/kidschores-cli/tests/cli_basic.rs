//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_kidschores-cli"))
        .args(args)
        .env("KIDSCHORES_DATA_DIR", data_dir)
        .env_remove("KIDSCHORES_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn ok(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn household(data_dir: &Path) {
    ok(data_dir, &["config", "set", "schedule.utc_offset_minutes", "0"]);
    ok(data_dir, &["kid", "add", "Alice"]);
    ok(data_dir, &["parent", "add", "Mom", "--kid", "Alice"]);
    ok(
        data_dir,
        &["chore", "add", "Dishes", "--points", "5", "--kid", "Alice"],
    );
}

#[test]
fn test_kid_add_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let out = ok(dir.path(), &["kid", "add", "Alice"]);
    assert!(out.contains("Kid created:"));

    let out = ok(dir.path(), &["kid", "list"]);
    let kids: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(kids[0]["name"], "Alice");
    assert_eq!(kids[0]["points"], 0.0);
}

#[test]
fn test_claim_and_approve_awards_points() {
    let dir = tempfile::tempdir().unwrap();
    household(dir.path());

    let out = ok(dir.path(), &["chore", "claim", "Alice", "Dishes"]);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["persisted"]["status"], "saved");

    ok(dir.path(), &["chore", "approve", "Mom", "Alice", "Dishes"]);
    let out = ok(dir.path(), &["kid", "show", "Alice"]);
    let kid: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(kid["points"], 5.0);

    let out = ok(dir.path(), &["points", "history", "Alice"]);
    let history: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn test_unknown_kid_fails() {
    let dir = tempfile::tempdir().unwrap();
    household(dir.path());
    let (_, stderr, code) = run_cli(dir.path(), &["chore", "claim", "Bob", "Dishes"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_negative_adjustment() {
    let dir = tempfile::tempdir().unwrap();
    household(dir.path());
    ok(dir.path(), &["points", "adjust", "Mom", "Alice", "-2"]);
    let out = ok(dir.path(), &["kid", "show", "Alice"]);
    let kid: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(kid["points"], -2.0);
}

#[test]
fn test_reset_all_data_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    household(dir.path());
    let (_, _, code) = run_cli(dir.path(), &["reset-all-data"]);
    assert_eq!(code, 1);

    ok(dir.path(), &["reset-all-data", "--yes"]);
    let out = ok(dir.path(), &["kid", "list"]);
    let kids: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(kids.as_array().unwrap().is_empty());
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    ok(dir.path(), &["config", "set", "defaults.chore_points", "7"]);
    let out = ok(dir.path(), &["config", "get", "defaults.chore_points"]);
    assert_eq!(out.trim().parse::<f64>().unwrap(), 7.0);

    let (_, _, code) = run_cli(dir.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_list_by_section() {
    let dir = tempfile::tempdir().unwrap();
    ok(dir.path(), &["config", "set", "schedule.utc_offset_minutes", "60"]);
    let out = ok(dir.path(), &["config", "list", "schedule"]);
    assert!(out.lines().any(|l| l == "schedule.utc_offset_minutes = 60"));
    assert!(out.lines().all(|l| l.starts_with("schedule.")));

    let out = ok(dir.path(), &["config", "list"]);
    assert!(out.lines().any(|l| l.starts_with("defaults.chore_points = ")));

    let (_, _, code) = run_cli(dir.path(), &["config", "list", "nope"]);
    assert_eq!(code, 1);
}

#[test]
fn test_tick_and_status() {
    let dir = tempfile::tempdir().unwrap();
    household(dir.path());
    ok(dir.path(), &["tick"]);
    let out = ok(dir.path(), &["status"]);
    let status: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(status["chores"][0]["name"], "Dishes");
    assert_eq!(status["chores"][0]["global_state"], "pending");
}

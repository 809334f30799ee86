//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against an isolated data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command against `data_dir` and return (stdout, stderr, code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "streamtimer-cli", "--quiet", "--"])
        .args(args)
        .env("STREAMTIMER_DATA_DIR", data_dir)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn timer_status_on_fresh_tenant() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(tmp.path(), &["timer", "status", "streamer1"]);
    assert_eq!(code, 0, "status failed: {stderr}");
    assert!(stdout.contains("Tenant:      streamer1"));
    assert!(stdout.contains("Remaining:"));
}

#[test]
fn config_set_then_get_round_trips() {
    let tmp = TempDir::new().unwrap();

    let (_, stderr, code) = run_cli(
        tmp.path(),
        &["config", "set", "streamer1", "min_bits_to_trigger", "250"],
    );
    assert_eq!(code, 0, "config set failed: {stderr}");

    let (stdout, stderr, code) = run_cli(
        tmp.path(),
        &["config", "get", "streamer1", "min_bits_to_trigger"],
    );
    assert_eq!(code, 0, "config get failed: {stderr}");
    assert_eq!(stdout.trim(), "250");
}

#[test]
fn config_get_unknown_key_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(tmp.path(), &["config", "get", "streamer1", "bogus"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown config key"));
}

#[test]
fn manual_event_shows_up_in_list_and_status() {
    let tmp = TempDir::new().unwrap();

    let (_, stderr, code) = run_cli(
        tmp.path(),
        &["event", "add", "streamer1", "300", "charity goal met"],
    );
    assert_eq!(code, 0, "event add failed: {stderr}");

    let (stdout, _, code) = run_cli(tmp.path(), &["event", "list", "streamer1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("charity goal met"));
    assert!(stdout.contains("300"));

    let (stdout, _, code) = run_cli(tmp.path(), &["timer", "status", "streamer1"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Added:       300s"));
}

#[test]
fn simulated_sub_rewards_default_rate() {
    let tmp = TempDir::new().unwrap();

    let (_, stderr, code) = run_cli(tmp.path(), &["simulate", "sub", "streamer1"]);
    assert_eq!(code, 0, "simulate sub failed: {stderr}");

    let (stdout, _, code) = run_cli(tmp.path(), &["timer", "status", "streamer1", "--json"]);
    assert_eq!(code, 0);
    let snapshot: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(snapshot["state"]["total_added_seconds"], 60);
}

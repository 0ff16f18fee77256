//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own throwaway home directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `home` as HOME and return (stdout, stderr, code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_somnus"))
        .args(args)
        .env("HOME", home)
        .env_remove("SOMNUS_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn config_get_returns_default() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "timer.duration_min"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "60");
}

#[test]
fn config_set_persists_between_runs() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "alarm.enabled", "true"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "alarm.enabled"]);
    assert_eq!(stdout.trim(), "true");
    assert!(home.path().join(".config/somnus/config.toml").exists());
}

#[test]
fn config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "timer.colour", "blue"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown config key"), "stderr: {stderr}");
}

#[test]
fn config_set_rejects_out_of_range_volume() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "audio.master_volume", "1.5"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("audio.master_volume"), "stderr: {stderr}");

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "audio.master_volume"]);
    assert_eq!(stdout.trim(), "0.5");
}

#[test]
fn config_list_is_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["playback"]["max_attempts"], 3);
    assert_eq!(parsed["alarm"]["enabled"], false);
}

#[test]
fn session_settings_follow_config() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "timer.duration_min", "20"]);

    let (stdout, _, code) = run_cli(home.path(), &["session", "settings"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["duration_min"], 20);
    assert_eq!(parsed["meditation_enabled"], true);
}

#[test]
fn history_starts_empty() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["history", "total"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["total"], 0);

    let (stdout, _, code) = run_cli(home.path(), &["history", "list"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(0));
}

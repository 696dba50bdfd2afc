//! Basic CLI E2E tests.
//!
//! Each test points the CLI at its own config directory so runs don't touch
//! the user's real configuration.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(config_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_autohangup-cli"))
        .args(args)
        .env("AUTOHANGUP_CONFIG_DIR", config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn json_lines(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("Failed to parse JSON line"))
        .collect()
}

#[test]
fn test_convert_duration_to_ms() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["convert", "1:02:03"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3723000");
}

#[test]
fn test_convert_ms_to_duration() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["convert", "--ms", "3723000"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "01:02:03");

    let (stdout, _, code) = run_cli(dir.path(), &["convert", "--ms", "-10"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "00:00:00");
}

#[test]
fn test_convert_json() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["convert", "5:30", "--json"]);
    assert_eq!(code, 0);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["ms"], 330_000);
    assert_eq!(value["display"], "00:05:30");
}

#[test]
fn test_convert_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["convert", "1:75"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "countdown.tick_ms", "250"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "countdown.tick_ms"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "250");
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "countdown.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_start_simulated_call_is_terminated() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &["start", "2", "--simulate", "active", "--json"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let events = json_lines(&stdout);
    // the first progress sample may be printed before the armed event
    let armed = events
        .iter()
        .find(|e| e["type"] == "countdown_armed")
        .expect("armed event");
    assert_eq!(armed["duration_ms"], 2_000);
    assert!(events.iter().any(|e| e["type"] == "progress"));

    let last = events.last().unwrap();
    assert_eq!(last["type"], "countdown_finished");
    assert_eq!(last["outcome"], "expired_action_succeeded");
}

#[test]
fn test_start_without_call() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["start", "1", "--simulate", "idle", "--quiet"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No call running."));
}

#[test]
fn test_start_denied_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let (stdout, _, code) = run_cli(
        dir.path(),
        &["start", "1", "--simulate", "denied", "--json", "--quiet"],
    );
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    assert_eq!(events.last().unwrap()["outcome"], "expired_action_failed");
}

#[test]
fn test_start_requires_configured_telephony() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["start", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("telephony is not configured"));
}

#[test]
fn test_start_refuses_missing_permissions() {
    let dir = TempDir::new().unwrap();
    let (_, _, code) = run_cli(
        dir.path(),
        &["config", "set", "permissions.granted", r#"["post_notifications"]"#],
    );
    assert_eq!(code, 0);

    let (_, stderr, code) = run_cli(dir.path(), &["start", "1", "--simulate", "active"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("insufficient permissions"));

    let (stdout, _, code) = run_cli(
        dir.path(),
        &[
            "start",
            "1",
            "--simulate",
            "active",
            "--allow-missing-permissions",
            "--json",
        ],
    );
    assert_eq!(code, 0);
    let events = json_lines(&stdout);
    assert_eq!(events.last().unwrap()["outcome"], "expired_action_failed");
}

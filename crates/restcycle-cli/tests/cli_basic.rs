//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_restcycle"))
        .args(args)
        .env("RESTCYCLE_DATA_DIR", data_dir)
        .env_remove("RESTCYCLE_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_cli_success(data_dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "command {args:?} failed: {stderr}");
    stdout
}

#[test]
fn test_config_get_default() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(dir.path(), &["config", "get", "cycle.mode"]);
    assert_eq!(out.trim(), "twenty_twenty_twenty");
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_config_set_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(dir.path(), &["config", "set", "skip.difficulty", "hardcore"]);
    assert_eq!(out.trim(), "ok");
    let out = run_cli_success(dir.path(), &["config", "get", "skip.difficulty"]);
    assert_eq!(out.trim(), "hardcore");
}

#[test]
fn test_config_set_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "set", "cycle.nope", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_list_json() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(dir.path(), &["config", "list", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["overtime"]["enabled"], true);
    assert_eq!(parsed["work_hours"]["start_hour"], 9);
}

#[test]
fn test_status_without_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(dir.path(), &["status", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["state"], "idle");
}

#[test]
fn test_simulate_prints_json_events() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_cli_success(
        dir.path(),
        &[
            "simulate", "--work", "4", "--pre-break", "0", "--break", "2", "--ticks", "6",
        ],
    );
    let types: Vec<String> = out
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types.first().map(String::as_str), Some("started"));
    assert!(types.iter().any(|t| t == "break_started"));
    assert!(types.iter().any(|t| t == "break_completed"));
}

#[test]
fn test_run_console_persists_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_restcycle"))
        .arg("run")
        .env("RESTCYCLE_DATA_DIR", dir.path())
        .env_remove("RESTCYCLE_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn restcycle run");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"pause\nstatus\nquit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("state:     work"), "stdout: {stdout}");
    assert!(stdout.contains("paused:    by user"), "stdout: {stdout}");

    let out = run_cli_success(dir.path(), &["status", "--json"]);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["state"], "work");
    assert_eq!(parsed["pause"]["source"], "user");
}

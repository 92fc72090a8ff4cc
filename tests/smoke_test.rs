//! Smoke tests for the iz CLI.
//!
//! These tests verify basic CLI functionality:
//! - `iz --version` and `iz version` output version info
//! - `iz --help` outputs help text
//! - `iz` (no args) is a usage error

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    let env = TestEnv::new();
    env.iz()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("iz"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_command() {
    let env = TestEnv::new();
    env.iz()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Version: {}",
            env!("CARGO_PKG_VERSION")
        )))
        .stdout(predicate::str::contains("Commit:"));
}

#[test]
fn test_version_json() {
    let env = TestEnv::new();
    let output = env.iz().args(["-o", "json", "version"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_help_flag() {
    let env = TestEnv::new();
    env.iz()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn test_no_args_is_usage_error() {
    let env = TestEnv::new();
    env.iz()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_config_path_uses_config_dir() {
    let env = TestEnv::new();
    env.iz()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            env.config_file().display().to_string(),
        ))
        .stdout(predicate::str::contains(
            env.sessions_file().display().to_string(),
        ));
}

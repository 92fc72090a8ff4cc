//! Common test utilities for iz integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch
//! the user's `~/.config/iz/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated config directory.
///
/// The `iz()` method returns a `Command` that sets `IZ_CONFIG_DIR`
/// per-invocation and clears any `IZ_*` variables inherited from the
/// developer's shell, making tests parallel-safe and reproducible.
pub struct TestEnv {
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an empty config directory.
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment with the given config.yaml contents.
    pub fn with_config(yaml: &str) -> Self {
        let env = Self::new();
        env.write_config(yaml);
        env
    }

    /// Get a Command for the iz binary with an isolated config directory.
    pub fn iz(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_iz"));
        for (name, _) in std::env::vars() {
            if name.starts_with("IZ_") {
                cmd.env_remove(name);
            }
        }
        cmd.env("IZ_CONFIG_DIR", self.config_dir.path());
        cmd
    }

    pub fn path(&self) -> &Path {
        self.config_dir.path()
    }

    pub fn config_file(&self) -> PathBuf {
        self.path().join("config.yaml")
    }

    pub fn sessions_file(&self) -> PathBuf {
        self.path().join("sessions.yaml")
    }

    pub fn write_config(&self, yaml: &str) {
        fs::write(self.config_file(), yaml).expect("Failed to write config file");
    }

    pub fn write_sessions(&self, yaml: &str) {
        fs::write(self.sessions_file(), yaml).expect("Failed to write sessions file");
    }

    pub fn read_config(&self) -> String {
        fs::read_to_string(self.config_file()).unwrap_or_default()
    }

    pub fn read_sessions(&self) -> String {
        fs::read_to_string(self.sessions_file()).unwrap_or_default()
    }

    /// Files in the config directory whose names start with `prefix`.
    pub fn files_starting_with(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with(prefix))
            .collect();
        names.sort();
        names
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

//! Command implementations for the iz CLI.
//!
//! Each command returns a result struct that renders as JSON or as human text.
//! Commands are organized by area:
//! - `config` - global keys, document paths, reset, explain
//! - `profile` - profiles, their workers and client keys
//! - `sessions` - stored sessions and logout

mod config;
mod profile;
mod sessions;

pub use config::*;
pub use profile::*;
pub use sessions::*;

use crate::Result;
use serde::Serialize;
use std::io::{BufRead, Write};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;

    /// Informational confirmations are hidden by `--quiet`; query output never is.
    fn is_informational(&self) -> bool {
        false
    }
}

/// Serialize a result struct, falling back to an empty object.
pub(crate) fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Outcome of a command that may ask for confirmation first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Done,
    Cancelled,
}

/// Ask a yes/no question. Only `y` or `yes` (any case) confirms.
pub fn confirm(input: &mut dyn BufRead, output: &mut dyn Write, prompt: &str) -> Result<bool> {
    write!(output, "{} [y/N]: ", prompt)?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Build metadata reported by `iz version`.
#[derive(Serialize)]
pub struct VersionResult {
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
}

impl Output for VersionResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Version: {}\nCommit:  {}\nBuilt:   {}",
            self.version, self.commit, self.built
        )
    }
}

pub fn version() -> VersionResult {
    VersionResult {
        version: crate::cli::package_version(),
        commit: crate::cli::git_commit(),
        built: crate::cli::build_timestamp(),
    }
}

//! iz - A command-line client for a remote feature-flag service.
//!
//! This library provides the core of the `iz` CLI tool: the layered
//! configuration and credential resolution engine, the persisted config and
//! session documents, and the diagnostics that explain where every resolved
//! value came from.

pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;

use std::path::PathBuf;


/// Library-level error type for iz operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to access {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Ambiguous input: {0}")]
    Ambiguous(String),

    #[error("Missing required {what}: {hint}")]
    MissingRequired { what: String, hint: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Nothing to reset: neither the config file nor the session file exists")]
    NothingToReset,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an I/O error with the document path it concerns.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Result type alias for iz operations.
pub type Result<T> = std::result::Result<T, Error>;

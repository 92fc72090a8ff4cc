//! YAML schema definitions for config.yaml and sessions.yaml.
//!
//! This module provides:
//! - Rust structs representing both persisted documents
//! - The client-key hierarchy (tenant -> project credentials)
//! - Enumerated global values (output format, color mode)
//! - Required file permissions

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Table,
    /// JSON output (machine-readable)
    Json,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal color preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" => Some(ColorMode::Always),
            "never" => Some(ColorMode::Never),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        }
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Project-scoped client credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectClientKeys {
    #[serde(rename = "client-id", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(rename = "client-secret", skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
}

impl ProjectClientKeys {
    /// A pair is usable only when both halves are present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Tenant-scoped client credentials with optional per-project overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantClientKeys {
    #[serde(rename = "client-id", skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(rename = "client-secret", skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectClientKeys>,
}

impl TenantClientKeys {
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// The client-key hierarchy: tenant name -> tenant credentials.
///
/// ```yaml
/// client-keys:
///   acme:
///     client-id: tenant-id
///     client-secret: tenant-secret
///     projects:
///       billing:
///         client-id: billing-id
///         client-secret: billing-secret
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientKeys(BTreeMap<String, TenantClientKeys>);

impl Deref for ClientKeys {
    type Target = BTreeMap<String, TenantClientKeys>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl ClientKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get or create the entry for a tenant.
    pub fn tenant_mut(&mut self, tenant: &str) -> &mut TenantClientKeys {
        self.0.entry(tenant.to_string()).or_default()
    }

    /// Whether a credential entry already exists at the given scope.
    pub fn has_entry(&self, tenant: &str, project: Option<&str>) -> bool {
        let Some(keys) = self.0.get(tenant) else {
            return false;
        };
        match project {
            Some(project) => keys.projects.contains_key(project),
            None => !keys.client_id.is_empty() || !keys.client_secret.is_empty(),
        }
    }

    /// Store a credential pair at tenant scope, or project scope when `project` is given.
    pub fn insert(&mut self, tenant: &str, project: Option<&str>, id: &str, secret: &str) {
        let keys = self.tenant_mut(tenant);
        match project {
            Some(project) => {
                keys.projects.insert(
                    project.to_string(),
                    ProjectClientKeys {
                        client_id: id.to_string(),
                        client_secret: secret.to_string(),
                    },
                );
            }
            None => {
                keys.client_id = id.to_string();
                keys.client_secret = secret.to_string();
            }
        }
    }
}

/// A named alternate endpoint attached to a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Worker {
    pub name: String,
    pub url: String,
    #[serde(rename = "client-keys", skip_serializing_if = "ClientKeys::is_empty")]
    pub client_keys: ClientKeys,
}

/// A named deployment context.
///
/// The flat `client_id` / `client_secret` fields are kept so that older
/// documents still load; they are never shown by display helpers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub leader_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_base_url: String,
    /// Name of a session in sessions.yaml
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tenant: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default_worker: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<Worker>,
    #[serde(rename = "client-keys", skip_serializing_if = "ClientKeys::is_empty")]
    pub client_keys: ClientKeys,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_secret: String,
}

/// Root of config.yaml.
///
/// Unknown top-level keys are kept in `extra` so a rewrite never drops them.
///
/// # YAML Schema
///
/// ```yaml
/// timeout: 30
/// verbose: false
/// output-format: table
/// color: auto
/// active_profile: sandbox
/// profiles:
///   sandbox:
///     leader_url: http://sandbox.example.com
///     tenant: sandbox-tenant
/// client-keys: {}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(
        rename = "output-format",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_format: Option<OutputFormat>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorMode>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub active_profile: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
    #[serde(rename = "client-keys", skip_serializing_if = "ClientKeys::is_empty")]
    pub client_keys: ClientKeys,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Read a global value, dropping it with a warning when it does not parse.
///
/// `iz config set` can then overwrite a bad value instead of failing to load.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match serde_yaml::from_value::<Option<T>>(value.clone()) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            tracing::warn!(?value, error = %e, "ignoring invalid global value in config.yaml");
            Ok(None)
        }
    }
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active profile, if the active name references an existing entry.
    ///
    /// A dangling `active_profile` is treated as "no profile".
    pub fn active_profile(&self) -> Option<(&str, &Profile)> {
        if self.active_profile.is_empty() {
            return None;
        }
        self.profiles
            .get_key_value(&self.active_profile)
            .map(|(name, profile)| (name.as_str(), profile))
    }
}

/// A named authentication context stored in sessions.yaml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub url: String,
    pub username: String,
    /// Bearer credential; empty means logged out
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jwt_token: String,
    /// `None` once the token has been cleared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        !self.jwt_token.is_empty()
    }

    /// Drop the bearer token but keep the entry.
    pub fn clear_token(&mut self) {
        self.jwt_token.clear();
        self.created_at = None;
    }
}

/// Root of sessions.yaml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDocument {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub active: String,
    pub sessions: BTreeMap<String, Session>,
}

/// Required permissions for both documents (Unix: 0600, owner read/write only).
///
/// Both files can hold secrets: client keys in config.yaml, bearer tokens in sessions.yaml.
#[cfg(unix)]
pub const DOCUMENT_FILE_MODE: u32 = 0o600;

//! `iz config` commands.

use super::{Output, Status, confirm, json_of};
use crate::Result;
use crate::config::credentials::{CredentialRequest, ResolvedWorker, resolve_worker_from_profile};
use crate::config::env::EnvSnapshot;
use crate::config::globals::{self, GlobalKey, GlobalValue};
use crate::config::resolver::Resolution;
use crate::config::store::{BackupRecord, ConfigPaths};
use crate::diagnostics::{
    AdminAuth, ConfigLine, EnvLine, FeatureAuth, admin_auth_mode, effective_config_lines,
    environment_lines, feature_auth_mode, write_authentication_mode, write_config_lines,
    write_environment_lines,
};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;

// ==================== Global Keys ====================

#[derive(Serialize)]
pub struct ConfigGet {
    #[serde(flatten)]
    pub value: GlobalValue,
}

impl Output for ConfigGet {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("{} (source: {})", self.value.value, self.value.source)
    }
}

pub fn config_get(paths: &ConfigPaths, env: &EnvSnapshot, key: &str) -> Result<ConfigGet> {
    Ok(ConfigGet {
        value: globals::get_config_value(paths, env, key)?,
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub path: PathBuf,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Set {} = {}", self.key, self.value)
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn config_set(paths: &ConfigPaths, key: &str, value: &str) -> Result<ConfigSet> {
    globals::set_config_value(paths, key, value)?;
    let global = GlobalKey::require(key)?;
    let stored = global
        .file_value(&paths.load_config()?)
        .unwrap_or_default();
    Ok(ConfigSet {
        key: global.to_string(),
        value: stored,
        path: paths.config_file.clone(),
    })
}

#[derive(Serialize)]
pub struct ConfigUnset {
    pub key: String,
    pub removed: bool,
}

impl Output for ConfigUnset {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.removed {
            format!("Unset {}", self.key)
        } else {
            format!("{} was not set in the config file", self.key)
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn config_unset(paths: &ConfigPaths, key: &str) -> Result<ConfigUnset> {
    let removed = globals::unset_config_value(paths, key)?;
    Ok(ConfigUnset {
        key: key.to_string(),
        removed,
    })
}

#[derive(Serialize)]
pub struct ConfigList {
    pub values: Vec<GlobalValue>,
}

impl Output for ConfigList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        self.values
            .iter()
            .map(|v| format!("{} = {} (source: {})", v.key, v.value, v.source))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn config_list(paths: &ConfigPaths, env: &EnvSnapshot) -> Result<ConfigList> {
    let doc = paths.load_config()?;
    Ok(ConfigList {
        values: globals::list_config_values(&doc, env),
    })
}

// ==================== Paths & Reset ====================

#[derive(Serialize)]
pub struct ConfigPathResult {
    pub config_file: PathBuf,
    pub sessions_file: PathBuf,
}

impl Output for ConfigPathResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Config:   {}\nSessions: {}",
            self.config_file.display(),
            self.sessions_file.display()
        )
    }
}

pub fn config_path(paths: &ConfigPaths) -> ConfigPathResult {
    ConfigPathResult {
        config_file: paths.config_file.clone(),
        sessions_file: paths.sessions_file.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub backups: Vec<BackupRecord>,
}

impl Output for ResetResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.status == Status::Cancelled {
            return "Reset cancelled".to_string();
        }
        let mut lines: Vec<String> = self
            .backups
            .iter()
            .map(|b| {
                format!(
                    "Backed up {} to {}",
                    b.original.display(),
                    b.backup.display()
                )
            })
            .collect();
        lines.push("Local configuration reset".to_string());
        lines.join("\n")
    }

    fn is_informational(&self) -> bool {
        true
    }
}

/// Back up and delete both documents, asking first unless `force` is set.
pub fn config_reset(
    paths: &ConfigPaths,
    force: bool,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<ResetResult> {
    let existing = paths.existing_documents();
    if existing.is_empty() {
        return Err(crate::Error::NothingToReset);
    }

    if !force {
        for path in &existing {
            writeln!(prompt, "Will back up and remove {}", path.display())?;
        }
        if !confirm(input, prompt, "Reset local configuration?")? {
            return Ok(ResetResult {
                status: Status::Cancelled,
                timestamp: None,
                backups: Vec::new(),
            });
        }
    }

    let outcome = paths.reset()?;
    tracing::info!(timestamp = %outcome.timestamp, "reset local configuration");
    Ok(ResetResult {
        status: Status::Done,
        timestamp: Some(outcome.timestamp),
        backups: outcome.backups,
    })
}

// ==================== Explain ====================

#[derive(Serialize)]
pub struct ExplainResult {
    pub profile: Option<String>,
    pub session: Option<String>,
    pub endpoint: ResolvedWorker,
    pub config: Vec<ConfigLine>,
    pub environment: Vec<EnvLine>,
    pub admin_auth: AdminAuth,
    pub feature_auth: FeatureAuth,
}

impl Output for ExplainResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = Vec::new();
        let _ = writeln!(
            out,
            "Profile:  {}",
            self.profile.as_deref().unwrap_or("(none)")
        );
        let _ = writeln!(
            out,
            "Session:  {}",
            self.session.as_deref().unwrap_or("(none)")
        );
        let endpoint = if self.endpoint.url.is_empty() {
            "(none)"
        } else {
            self.endpoint.url.as_str()
        };
        let _ = match &self.endpoint.name {
            Some(name) => writeln!(out, "Endpoint: {} (worker '{}')", endpoint, name),
            None => writeln!(out, "Endpoint: {}", endpoint),
        };
        write_config_lines(&mut out, &self.config);
        write_environment_lines(&mut out, &self.environment);
        write_authentication_mode(&mut out, self.admin_auth, self.feature_auth);
        String::from_utf8_lossy(&out).trim_end().to_string()
    }
}

/// Resolve everything a remote call would use, including worker and
/// client credentials, and report it with sources.
///
/// `--project` may be repeated; all values are tried, in order, against the
/// client-key hierarchy.
pub fn config_explain(resolution: &mut Resolution, verbose_out: &mut dyn Write) -> Result<ExplainResult> {
    let flags = resolution.flags().clone();
    let worker = resolve_worker_from_profile(resolution, true)?;
    let request = CredentialRequest {
        flag_client_id: flags.value("client-id"),
        flag_client_secret: flags.value("client-secret"),
        worker_keys: worker.client_keys.as_ref(),
        projects: flags.values("project"),
    };
    resolution.resolve_client_credentials(verbose_out, &request)?;

    Ok(ExplainResult {
        profile: resolution.profile_name.clone(),
        session: resolution.session_name.clone(),
        endpoint: worker,
        config: effective_config_lines(resolution),
        environment: environment_lines(resolution.env()),
        admin_auth: admin_auth_mode(&resolution.config),
        feature_auth: feature_auth_mode(&resolution.config),
    })
}

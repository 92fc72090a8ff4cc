//! `iz profile` commands, including workers and client keys.

use super::{Output, Status, confirm, json_of};
use crate::config::globals::parse_bool;
use crate::config::registry::{FIELD_REGISTRY, get_profile_field_value};
use crate::config::resolver::{FlagValues, InvocationContext, Resolution};
use crate::config::schema::{ClientKeys, ConfigDocument, Profile, Worker};
use crate::config::store::ConfigPaths;
use crate::diagnostics::REDACTED;
use crate::{Error, Result};
use serde::Serialize;
use std::io::{BufRead, Write};

/// The profile a profile-scoped command acts on: `--profile` / `IZ_PROFILE`,
/// otherwise the active profile.
fn target_profile_name(ctx: &InvocationContext, doc: &ConfigDocument) -> Result<String> {
    let name = match ctx.profile_override() {
        Some(name) => name.to_string(),
        None if !doc.active_profile.is_empty() => doc.active_profile.clone(),
        None => {
            return Err(Error::MissingRequired {
                what: "profile".to_string(),
                hint: "pass --profile, set IZ_PROFILE or run `iz profile use <name>`".to_string(),
            });
        }
    };
    if !doc.profiles.contains_key(&name) {
        return Err(Error::not_found("Profile", name));
    }
    Ok(name)
}

fn profile_mut<'a>(doc: &'a mut ConfigDocument, name: &str) -> Result<&'a mut Profile> {
    doc.profiles
        .get_mut(name)
        .ok_or_else(|| Error::not_found("Profile", name))
}

// ==================== Profiles ====================

#[derive(Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub active: bool,
    pub leader_url: String,
    pub tenant: String,
}

#[derive(Serialize)]
pub struct ProfileList {
    pub active: Option<String>,
    pub profiles: Vec<ProfileSummary>,
}

impl Output for ProfileList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.profiles.is_empty() {
            return "No profiles configured".to_string();
        }
        self.profiles
            .iter()
            .map(|p| {
                let marker = if p.active { "*" } else { " " };
                let mut line = format!("{} {}", marker, p.name);
                if !p.leader_url.is_empty() {
                    line.push_str(&format!("  {}", p.leader_url));
                }
                if !p.tenant.is_empty() {
                    line.push_str(&format!("  (tenant: {})", p.tenant));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn profile_list(paths: &ConfigPaths) -> Result<ProfileList> {
    let doc = paths.load_config()?;
    let active = doc.active_profile().map(|(name, _)| name.to_string());
    let profiles = doc
        .profiles
        .iter()
        .map(|(name, profile)| ProfileSummary {
            name: name.clone(),
            active: active.as_deref() == Some(name.as_str()),
            leader_url: profile.leader_url.clone(),
            tenant: profile.tenant.clone(),
        })
        .collect();
    Ok(ProfileList { active, profiles })
}

#[derive(Serialize)]
pub struct ProfileCurrent {
    pub name: Option<String>,
}

impl Output for ProfileCurrent {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "No active profile".to_string())
    }
}

pub fn profile_current(resolution: &Resolution) -> ProfileCurrent {
    ProfileCurrent {
        name: resolution.profile_name.clone(),
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUse {
    pub name: String,
}

impl Output for ProfileUse {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        format!("Switched to profile '{}'", self.name)
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn profile_use(paths: &ConfigPaths, name: &str) -> Result<ProfileUse> {
    let mut doc = paths.load_config()?;
    if !doc.profiles.contains_key(name) {
        return Err(Error::not_found("Profile", name));
    }
    doc.active_profile = name.to_string();
    paths.save_config(&doc)?;
    Ok(ProfileUse {
        name: name.to_string(),
    })
}

/// Attributes for a new profile taken from the explicitly given global flags.
pub fn profile_from_flags(flags: &FlagValues) -> Profile {
    let text = |name: &str| flags.value(name).unwrap_or_default().to_string();
    Profile {
        leader_url: text("url"),
        tenant: text("tenant"),
        project: text("project"),
        context: text("context"),
        insecure: flags.is_explicit("insecure"),
        ..Default::default()
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileAdd {
    pub name: String,
    pub active: bool,
}

impl Output for ProfileAdd {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.active {
            format!("Added profile '{}' (active)", self.name)
        } else {
            format!("Added profile '{}'", self.name)
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

/// Create a profile. It becomes active when asked to, or when no profile is active yet.
pub fn profile_add(
    paths: &ConfigPaths,
    name: &str,
    profile: Profile,
    activate: bool,
) -> Result<ProfileAdd> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("profile name cannot be empty".to_string()));
    }
    let mut doc = paths.load_config()?;
    if doc.profiles.contains_key(name) {
        return Err(Error::InvalidInput(format!(
            "profile '{}' already exists",
            name
        )));
    }
    doc.profiles.insert(name.to_string(), profile);
    let active = activate || doc.active_profile().is_none();
    if active {
        doc.active_profile = name.to_string();
    }
    paths.save_config(&doc)?;
    Ok(ProfileAdd {
        name: name.to_string(),
        active,
    })
}

#[derive(Serialize)]
pub struct ProfileDelete {
    pub name: String,
    pub status: Status,
}

impl Output for ProfileDelete {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        match self.status {
            Status::Done => format!("Deleted profile '{}'", self.name),
            Status::Cancelled => "Delete cancelled".to_string(),
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn profile_delete(
    paths: &ConfigPaths,
    name: &str,
    force: bool,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<ProfileDelete> {
    let mut doc = paths.load_config()?;
    if !doc.profiles.contains_key(name) {
        return Err(Error::not_found("Profile", name));
    }
    if !force && !confirm(input, prompt, &format!("Delete profile '{}'?", name))? {
        return Ok(ProfileDelete {
            name: name.to_string(),
            status: Status::Cancelled,
        });
    }
    doc.profiles.remove(name);
    if doc.active_profile == name {
        doc.active_profile.clear();
    }
    paths.save_config(&doc)?;
    Ok(ProfileDelete {
        name: name.to_string(),
        status: Status::Done,
    })
}

#[derive(Serialize)]
pub struct ProfileSetting {
    pub key: &'static str,
    pub value: String,
}

#[derive(Serialize)]
pub struct ProfileShow {
    pub name: String,
    pub active: bool,
    pub settings: Vec<ProfileSetting>,
    pub workers: Vec<String>,
}

impl Output for ProfileShow {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![if self.active {
            format!("Profile: {} (active)", self.name)
        } else {
            format!("Profile: {}", self.name)
        }];
        for setting in &self.settings {
            lines.push(format!("  {}: {}", setting.key, setting.value));
        }
        if !self.workers.is_empty() {
            lines.push(format!("  workers: {}", self.workers.join(", ")));
        }
        lines.join("\n")
    }
}

/// Display a profile. Legacy flat credentials are never shown.
pub fn profile_show(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    name: Option<&str>,
) -> Result<ProfileShow> {
    let doc = paths.load_config()?;
    let name = match name {
        Some(name) => name.to_string(),
        None => target_profile_name(ctx, &doc)?,
    };
    let profile = doc
        .profiles
        .get(&name)
        .ok_or_else(|| Error::not_found("Profile", name.as_str()))?;

    let mut settings: Vec<ProfileSetting> = FIELD_REGISTRY
        .iter()
        .filter(|info| info.profile_accessor.is_some())
        .filter(|info| info.is_set_by_profile(profile))
        .map(|info| ProfileSetting {
            key: info.key,
            value: get_profile_field_value(profile, info.key),
        })
        .collect();
    if !profile.session.is_empty() {
        settings.push(ProfileSetting {
            key: "session",
            value: profile.session.clone(),
        });
    }
    if !profile.default_worker.is_empty() {
        settings.push(ProfileSetting {
            key: "default-worker",
            value: profile.default_worker.clone(),
        });
    }

    Ok(ProfileShow {
        active: doc.active_profile == name,
        workers: profile.workers.iter().map(|w| w.name.clone()).collect(),
        name,
        settings,
    })
}

/// Attributes that `iz profile set` can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKey {
    LeaderUrl,
    ClientBaseUrl,
    Tenant,
    Project,
    Context,
    Session,
    DefaultWorker,
    Insecure,
}

impl ProfileKey {
    pub const ALL: [ProfileKey; 8] = [
        ProfileKey::LeaderUrl,
        ProfileKey::ClientBaseUrl,
        ProfileKey::Tenant,
        ProfileKey::Project,
        ProfileKey::Context,
        ProfileKey::Session,
        ProfileKey::DefaultWorker,
        ProfileKey::Insecure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKey::LeaderUrl => "leader-url",
            ProfileKey::ClientBaseUrl => "client-base-url",
            ProfileKey::Tenant => "tenant",
            ProfileKey::Project => "project",
            ProfileKey::Context => "context",
            ProfileKey::Session => "session",
            ProfileKey::DefaultWorker => "default-worker",
            ProfileKey::Insecure => "insecure",
        }
    }

    pub fn require(key: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                Error::InvalidInput(format!(
                    "'{}' is not a profile key (valid keys: {})",
                    key,
                    valid.join(", ")
                ))
            })
    }

    /// Store `value`; an empty value clears the attribute.
    pub fn apply(&self, profile: &mut Profile, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        match self {
            ProfileKey::LeaderUrl => profile.leader_url = value,
            ProfileKey::ClientBaseUrl => profile.client_base_url = value,
            ProfileKey::Tenant => profile.tenant = value,
            ProfileKey::Project => profile.project = value,
            ProfileKey::Context => profile.context = value,
            ProfileKey::Session => profile.session = value,
            ProfileKey::DefaultWorker => {
                if !value.is_empty() && !profile.workers.iter().any(|w| w.name == value) {
                    return Err(Error::not_found("Worker", value));
                }
                profile.default_worker = value;
            }
            ProfileKey::Insecure => {
                profile.insecure = if value.is_empty() {
                    false
                } else {
                    parse_bool(&value).ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "insecure must be true or false, got '{}'",
                            value
                        ))
                    })?
                };
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileSet {
    pub profile: String,
    pub key: String,
    pub value: String,
}

impl Output for ProfileSet {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.value.is_empty() {
            format!("Cleared {} on profile '{}'", self.key, self.profile)
        } else {
            format!("Set {} = {} on profile '{}'", self.key, self.value, self.profile)
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn profile_set(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    key: &str,
    value: &str,
) -> Result<ProfileSet> {
    let key = ProfileKey::require(key)?;
    let mut doc = paths.load_config()?;
    let name = target_profile_name(ctx, &doc)?;
    let profile = profile_mut(&mut doc, &name)?;
    key.apply(profile, value)?;
    let stored = match key {
        ProfileKey::Session => profile.session.clone(),
        ProfileKey::DefaultWorker => profile.default_worker.clone(),
        _ => get_profile_field_value(profile, key.as_str()),
    };
    paths.save_config(&doc)?;
    Ok(ProfileSet {
        profile: name,
        key: key.as_str().to_string(),
        value: if key == ProfileKey::Insecure && stored == "false" {
            String::new()
        } else {
            stored
        },
    })
}

// ==================== Workers ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerAction {
    Added,
    Removed,
    Default,
}

#[derive(Debug, Serialize)]
pub struct WorkerChange {
    pub profile: String,
    pub name: String,
    pub action: WorkerAction,
}

impl Output for WorkerChange {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        match self.action {
            WorkerAction::Added => {
                format!("Added worker '{}' to profile '{}'", self.name, self.profile)
            }
            WorkerAction::Removed => format!(
                "Removed worker '{}' from profile '{}'",
                self.name, self.profile
            ),
            WorkerAction::Default => format!(
                "Worker '{}' is now the default for profile '{}'",
                self.name, self.profile
            ),
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

pub fn worker_add(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    name: &str,
    url: &str,
    make_default: bool,
) -> Result<WorkerChange> {
    if name.trim().is_empty() || url.trim().is_empty() {
        return Err(Error::InvalidInput(
            "worker name and url cannot be empty".to_string(),
        ));
    }
    let mut doc = paths.load_config()?;
    let profile_name = target_profile_name(ctx, &doc)?;
    let profile = profile_mut(&mut doc, &profile_name)?;
    if profile.workers.iter().any(|w| w.name == name) {
        return Err(Error::InvalidInput(format!(
            "worker '{}' already exists on profile '{}'",
            name, profile_name
        )));
    }
    profile.workers.push(Worker {
        name: name.to_string(),
        url: url.trim().to_string(),
        client_keys: ClientKeys::new(),
    });
    if make_default {
        profile.default_worker = name.to_string();
    }
    paths.save_config(&doc)?;
    Ok(WorkerChange {
        profile: profile_name,
        name: name.to_string(),
        action: WorkerAction::Added,
    })
}

#[derive(Debug, Serialize)]
pub struct WorkerSummary {
    pub name: String,
    pub url: String,
    pub default: bool,
    pub has_client_keys: bool,
}

#[derive(Debug, Serialize)]
pub struct WorkerList {
    pub profile: String,
    pub workers: Vec<WorkerSummary>,
}

impl Output for WorkerList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.workers.is_empty() {
            return format!("Profile '{}' has no workers", self.profile);
        }
        self.workers
            .iter()
            .map(|w| {
                let marker = if w.default { "*" } else { " " };
                let keys = if w.has_client_keys { "  (client keys)" } else { "" };
                format!("{} {}  {}{}", marker, w.name, w.url, keys)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn worker_list(paths: &ConfigPaths, ctx: &InvocationContext) -> Result<WorkerList> {
    let doc = paths.load_config()?;
    let profile_name = target_profile_name(ctx, &doc)?;
    let profile = &doc.profiles[&profile_name];
    let workers = profile
        .workers
        .iter()
        .map(|w| WorkerSummary {
            name: w.name.clone(),
            url: w.url.clone(),
            default: w.name == profile.default_worker,
            has_client_keys: !w.client_keys.is_empty(),
        })
        .collect();
    Ok(WorkerList {
        profile: profile_name,
        workers,
    })
}

pub fn worker_remove(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    name: &str,
) -> Result<WorkerChange> {
    let mut doc = paths.load_config()?;
    let profile_name = target_profile_name(ctx, &doc)?;
    let profile = profile_mut(&mut doc, &profile_name)?;
    let before = profile.workers.len();
    profile.workers.retain(|w| w.name != name);
    if profile.workers.len() == before {
        return Err(Error::not_found("Worker", name));
    }
    if profile.default_worker == name {
        profile.default_worker.clear();
    }
    paths.save_config(&doc)?;
    Ok(WorkerChange {
        profile: profile_name,
        name: name.to_string(),
        action: WorkerAction::Removed,
    })
}

pub fn worker_default(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    name: &str,
) -> Result<WorkerChange> {
    let mut doc = paths.load_config()?;
    let profile_name = target_profile_name(ctx, &doc)?;
    let profile = profile_mut(&mut doc, &profile_name)?;
    ProfileKey::DefaultWorker.apply(profile, name)?;
    paths.save_config(&doc)?;
    Ok(WorkerChange {
        profile: profile_name,
        name: name.to_string(),
        action: WorkerAction::Default,
    })
}

// ==================== Client Keys ====================

/// Where a client-key pair is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
    /// Root `client-keys` of config.yaml
    Root,
    /// The target profile's own keys
    Profile,
    /// A worker of the target profile
    Worker(String),
}

/// A client-key pair to store.
#[derive(Debug, Clone)]
pub struct NewClientKeys<'a> {
    pub tenant: &'a str,
    pub project: Option<&'a str>,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub scope: KeyScope,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct ClientKeysAdd {
    pub scope: String,
    pub tenant: String,
    pub project: Option<String>,
    pub status: Status,
}

impl Output for ClientKeysAdd {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.status == Status::Cancelled {
            return "Client keys unchanged".to_string();
        }
        match &self.project {
            Some(project) => format!(
                "Stored client keys for tenant '{}', project '{}' in {}",
                self.tenant, project, self.scope
            ),
            None => format!(
                "Stored client keys for tenant '{}' in {}",
                self.tenant, self.scope
            ),
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

fn scope_label(scope: &KeyScope, profile: Option<&str>) -> String {
    match (scope, profile) {
        (KeyScope::Root, _) => "config".to_string(),
        (KeyScope::Profile, Some(p)) => format!("profile:{}", p),
        (KeyScope::Worker(w), Some(p)) => format!("worker:{}/{}", p, w),
        (_, None) => "config".to_string(),
    }
}

/// Store a client-key pair, asking before an existing entry is overwritten.
pub fn client_keys_add(
    paths: &ConfigPaths,
    ctx: &InvocationContext,
    keys: &NewClientKeys<'_>,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<ClientKeysAdd> {
    if keys.tenant.is_empty() {
        return Err(Error::MissingRequired {
            what: "tenant".to_string(),
            hint: "pass --tenant or set IZ_TENANT".to_string(),
        });
    }
    if keys.client_id.is_empty() || keys.client_secret.is_empty() {
        return Err(Error::InvalidInput(
            "both --client-id and --client-secret are required".to_string(),
        ));
    }

    let mut doc = paths.load_config()?;
    let profile_name = match keys.scope {
        KeyScope::Root => None,
        _ => Some(target_profile_name(ctx, &doc)?),
    };
    let label = scope_label(&keys.scope, profile_name.as_deref());

    let store: &mut ClientKeys = match (&keys.scope, profile_name.as_deref()) {
        (KeyScope::Profile, Some(name)) => &mut profile_mut(&mut doc, name)?.client_keys,
        (KeyScope::Worker(worker), Some(name)) => {
            let profile = profile_mut(&mut doc, name)?;
            &mut profile
                .workers
                .iter_mut()
                .find(|w| &w.name == worker)
                .ok_or_else(|| Error::not_found("Worker", worker.as_str()))?
                .client_keys
        }
        _ => &mut doc.client_keys,
    };

    let result = |status| ClientKeysAdd {
        scope: label.clone(),
        tenant: keys.tenant.to_string(),
        project: keys.project.map(str::to_string),
        status,
    };

    if store.has_entry(keys.tenant, keys.project) && !keys.force {
        let what = match keys.project {
            Some(project) => format!("tenant '{}', project '{}'", keys.tenant, project),
            None => format!("tenant '{}'", keys.tenant),
        };
        if !confirm(
            input,
            prompt,
            &format!("Client keys for {} already exist in {}. Overwrite?", what, label),
        )? {
            return Ok(result(Status::Cancelled));
        }
    }

    store.insert(keys.tenant, keys.project, keys.client_id, keys.client_secret);
    paths.save_config(&doc)?;
    Ok(result(Status::Done))
}

#[derive(Serialize)]
pub struct ClientKeyEntry {
    pub scope: String,
    pub tenant: String,
    pub project: Option<String>,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Serialize)]
pub struct ClientKeysList {
    pub entries: Vec<ClientKeyEntry>,
}

impl Output for ClientKeysList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No client keys configured".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                let target = match &e.project {
                    Some(project) => format!("{}/{}", e.tenant, project),
                    None => e.tenant.clone(),
                };
                format!(
                    "{}  {}  client-id={} client-secret={}",
                    e.scope, target, e.client_id, e.client_secret
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        REDACTED.to_string()
    }
}

fn collect_entries(scope: &str, keys: &ClientKeys, entries: &mut Vec<ClientKeyEntry>) {
    for (tenant, tenant_keys) in keys.iter() {
        if !tenant_keys.client_id.is_empty() || !tenant_keys.client_secret.is_empty() {
            entries.push(ClientKeyEntry {
                scope: scope.to_string(),
                tenant: tenant.clone(),
                project: None,
                client_id: tenant_keys.client_id.clone(),
                client_secret: redact(&tenant_keys.client_secret),
            });
        }
        for (project, project_keys) in &tenant_keys.projects {
            entries.push(ClientKeyEntry {
                scope: scope.to_string(),
                tenant: tenant.clone(),
                project: Some(project.clone()),
                client_id: project_keys.client_id.clone(),
                client_secret: redact(&project_keys.client_secret),
            });
        }
    }
}

/// Every stored client-key pair with secrets redacted.
pub fn client_keys_list(paths: &ConfigPaths) -> Result<ClientKeysList> {
    let doc = paths.load_config()?;
    let mut entries = Vec::new();
    collect_entries("config", &doc.client_keys, &mut entries);
    for (name, profile) in &doc.profiles {
        collect_entries(&format!("profile:{}", name), &profile.client_keys, &mut entries);
        for worker in &profile.workers {
            collect_entries(
                &format!("worker:{}/{}", name, worker.name),
                &worker.client_keys,
                &mut entries,
            );
        }
    }
    Ok(ClientKeysList { entries })
}

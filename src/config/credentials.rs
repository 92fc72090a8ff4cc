//! Client API credentials and worker endpoints.
//!
//! Credentials are resolved after the field layering in [`crate::config::resolver`]:
//! flags and environment variables have already been merged, and this module
//! only fills what is still empty from the client-key hierarchy.

use crate::config::registry::FieldId;
use crate::config::resolver::{Resolution, ResolvedConfig, ValueSource};
use crate::config::schema::{ClientKeys, ConfigDocument, Profile, Worker};
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;

/// Inputs of a credential lookup beyond the resolved configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialRequest<'a> {
    pub flag_client_id: Option<&'a str>,
    pub flag_client_secret: Option<&'a str>,
    /// Scoped keys of the selected worker, consulted before any other store
    pub worker_keys: Option<&'a ClientKeys>,
    /// Projects to try, in order, before the tenant-level pair
    pub projects: &'a [String],
}

/// Which client-key store supplied a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStore {
    Worker,
    Profile,
    Root,
}

impl std::fmt::Display for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialStore::Worker => write!(f, "worker"),
            CredentialStore::Profile => write!(f, "profile"),
            CredentialStore::Root => write!(f, "config"),
        }
    }
}

/// A complete pair found in the client-key hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialMatch {
    pub store: CredentialStore,
    pub tenant: String,
    pub project: Option<String>,
    pub client_id: String,
    pub client_secret: String,
}

/// Look a tenant up in one store.
///
/// The first project in `projects` with a complete entry wins; otherwise the
/// tenant-level pair is used if complete.
pub fn lookup_client_keys(
    keys: &ClientKeys,
    store: CredentialStore,
    tenant: &str,
    projects: &[String],
) -> Option<CredentialMatch> {
    let tenant_keys = keys.get(tenant)?;

    let project_hit = projects.iter().find_map(|project| {
        tenant_keys
            .projects
            .get(project)
            .filter(|p| p.is_complete())
            .map(|p| (project, p))
    });
    if let Some((project, keys)) = project_hit {
        return Some(CredentialMatch {
            store,
            tenant: tenant.to_string(),
            project: Some(project.clone()),
            client_id: keys.client_id.clone(),
            client_secret: keys.client_secret.clone(),
        });
    }

    tenant_keys.is_complete().then(|| CredentialMatch {
        store,
        tenant: tenant.to_string(),
        project: None,
        client_id: tenant_keys.client_id.clone(),
        client_secret: tenant_keys.client_secret.clone(),
    })
}

/// Fill the client id and secret of `cfg`.
///
/// Order: flags (field by field), values already in `cfg`, the client-key
/// hierarchy (worker keys, then profile keys, then root keys), and finally
/// the legacy flat fields of the profile. Finding nothing is not an error.
///
/// Only a half given by flag is completed from the stores. A half that came
/// from the environment leaves the pair as it is.
pub fn resolve_client_credentials(
    out: &mut dyn Write,
    cfg: &mut ResolvedConfig,
    document: &ConfigDocument,
    profile: Option<&Profile>,
    request: &CredentialRequest<'_>,
) -> Result<()> {
    if let Some(id) = request.flag_client_id.filter(|v| !v.is_empty()) {
        cfg.client_id = id.to_string();
    }
    if let Some(secret) = request.flag_client_secret.filter(|v| !v.is_empty()) {
        cfg.client_secret = secret.to_string();
    }
    if cfg.has_client_credentials() {
        return Ok(());
    }

    let from_flag = |flag: Option<&str>| flag.is_some_and(|v| !v.is_empty());
    if (!cfg.client_id.is_empty() && !from_flag(request.flag_client_id))
        || (!cfg.client_secret.is_empty() && !from_flag(request.flag_client_secret))
    {
        tracing::debug!("partial client credentials outside flags; stores not consulted");
        return Ok(());
    }

    if cfg.tenant.is_empty() {
        if !request.projects.is_empty() {
            return Err(Error::MissingRequired {
                what: "tenant".to_string(),
                hint: "project-scoped client keys are stored per tenant; pass --tenant or set IZ_TENANT"
                    .to_string(),
            });
        }
        fill_from_legacy(cfg, profile);
        return Ok(());
    }

    let fallback_project;
    let projects: &[String] = if !request.projects.is_empty() {
        request.projects
    } else if !cfg.project.is_empty() {
        fallback_project = [cfg.project.clone()];
        &fallback_project[..]
    } else {
        &[]
    };

    let stores = [
        request.worker_keys.map(|k| (k, CredentialStore::Worker)),
        profile.map(|p| (&p.client_keys, CredentialStore::Profile)),
        Some((&document.client_keys, CredentialStore::Root)),
    ];
    let hit = stores
        .into_iter()
        .flatten()
        .find_map(|(keys, store)| lookup_client_keys(keys, store, &cfg.tenant, projects));

    if let Some(hit) = hit {
        if cfg.client_id.is_empty() {
            cfg.client_id = hit.client_id.clone();
            cfg.record_source(FieldId::ClientId, ValueSource::File);
        }
        if cfg.client_secret.is_empty() {
            cfg.client_secret = hit.client_secret.clone();
            cfg.record_source(FieldId::ClientSecret, ValueSource::File);
        }
        if cfg.verbose {
            let _ = match &hit.project {
                Some(project) => writeln!(
                    out,
                    "[verbose] Using client credentials from {} keys for tenant '{}', project '{}'",
                    hit.store, hit.tenant, project
                ),
                None => writeln!(
                    out,
                    "[verbose] Using client credentials from {} keys for tenant '{}'",
                    hit.store, hit.tenant
                ),
            };
        }
        tracing::debug!(store = %hit.store, tenant = %hit.tenant, "client credentials from hierarchy");
        return Ok(());
    }

    fill_from_legacy(cfg, profile);
    Ok(())
}

/// Flat `client_id` / `client_secret` kept on older profiles.
fn fill_from_legacy(cfg: &mut ResolvedConfig, profile: Option<&Profile>) {
    let Some(profile) = profile else {
        return;
    };
    if cfg.client_id.is_empty() && !profile.client_id.is_empty() {
        cfg.client_id = profile.client_id.clone();
        cfg.record_source(FieldId::ClientId, ValueSource::Profile);
    }
    if cfg.client_secret.is_empty() && !profile.client_secret.is_empty() {
        cfg.client_secret = profile.client_secret.clone();
        cfg.record_source(FieldId::ClientSecret, ValueSource::Profile);
    }
}

/// The endpoint a command talks to: a named worker or the primary URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedWorker {
    /// `None` when the primary leader URL is used
    pub name: Option<String>,
    pub url: String,
    #[serde(skip)]
    pub client_keys: Option<ClientKeys>,
}

impl ResolvedWorker {
    fn primary(leader_url: &str) -> Self {
        Self {
            name: None,
            url: leader_url.to_string(),
            client_keys: None,
        }
    }
}

fn find_worker<'a>(workers: &'a [Worker], name: &str) -> Result<&'a Worker> {
    let mut matches = workers.iter().filter(|w| w.name == name);
    let worker = matches
        .next()
        .ok_or_else(|| Error::not_found("Worker", name))?;
    if matches.next().is_some() {
        return Err(Error::Ambiguous(format!(
            "more than one worker is named '{}'",
            name
        )));
    }
    if worker.url.is_empty() {
        return Err(Error::InvalidInput(format!("worker '{}' has no url", name)));
    }
    Ok(worker)
}

/// Pick the endpoint for a command.
///
/// An explicit worker must exist. Without one, the default worker is only
/// used when `use_default` is set; otherwise the primary URL is returned.
pub fn resolve_worker(
    explicit: Option<&str>,
    workers: &[Worker],
    default_worker: &str,
    leader_url: &str,
    use_default: bool,
) -> Result<ResolvedWorker> {
    let name = match explicit.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None if use_default && !default_worker.is_empty() => default_worker,
        None => return Ok(ResolvedWorker::primary(leader_url)),
    };
    let worker = find_worker(workers, name)?;
    Ok(ResolvedWorker {
        name: Some(worker.name.clone()),
        url: worker.url.clone(),
        client_keys: (!worker.client_keys.is_empty()).then(|| worker.client_keys.clone()),
    })
}

/// Resolve the worker for a resolved invocation, recording the choice in its config.
pub fn resolve_worker_from_profile(
    resolution: &mut Resolution,
    use_default: bool,
) -> Result<ResolvedWorker> {
    let explicit = (!resolution.config.worker.is_empty()).then(|| resolution.config.worker.clone());

    if explicit.is_some() && resolution.flags.is_explicit("url") {
        return Err(Error::Ambiguous(
            "--url and --worker both select an endpoint; pass only one".to_string(),
        ));
    }

    let (workers, default_worker) = match &resolution.profile {
        Some(profile) => (profile.workers.as_slice(), profile.default_worker.as_str()),
        None => (&[][..], ""),
    };
    // An explicit --url wins over the profile's default worker.
    let use_default = use_default && !resolution.flags.is_explicit("url");
    let worker = resolve_worker(
        explicit.as_deref(),
        workers,
        default_worker,
        &resolution.config.leader_url,
        use_default,
    )?;

    if explicit.is_none() {
        if let Some(name) = &worker.name {
            resolution.config.worker = name.clone();
            resolution
                .config
                .record_source(FieldId::Worker, ValueSource::Profile);
        }
    }
    Ok(worker)
}

impl Resolution {
    /// Resolve client credentials in place using the loaded documents.
    pub fn resolve_client_credentials(
        &mut self,
        out: &mut dyn Write,
        request: &CredentialRequest<'_>,
    ) -> Result<()> {
        resolve_client_credentials(
            out,
            &mut self.config,
            &self.document,
            self.profile.as_ref(),
            request,
        )
    }
}

//! Unified precedence resolution for the effective configuration.
//!
//! Every field in the registry is resolved by walking an ordered list of
//! source strategies; the first one that yields a value wins, and the same
//! walk names the source used for diagnostics.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flag explicitly given on the invoked command
//! 2. Environment variable declared for the field
//! 3. Session URL (`leader-url` only, and only when the profile has no URL)
//! 4. Active profile (boolean attributes only when `true`)
//! 5. Values filled in after layering (client-key hierarchy, default worker)
//! 6. Global keys: config.yaml, then `IZ_<key>`, then the built-in default
//! 7. Built-in default (empty)

use crate::config::env::EnvSnapshot;
use crate::config::globals::{lookup_global, parse_bool};
use crate::config::registry::{ConfigFieldInfo, FieldId};
use crate::config::schema::{
    ColorMode, ConfigDocument, OutputFormat, Profile, Session, SessionDocument,
};
use crate::config::store::{ConfigPaths, Documents};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Environment variable that selects a profile, like `--profile`.
pub const PROFILE_ENV: &str = "IZ_PROFILE";

/// Tracks which layer produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Value from a CLI flag
    Flag,
    /// Value from an environment variable
    Env,
    /// Value from the active profile
    Profile,
    /// Value from the active session
    Session,
    /// Value from config.yaml
    File,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ValueSource::Flag => "flag",
            ValueSource::Env => "env",
            ValueSource::Profile => "profile",
            ValueSource::Session => "session",
            ValueSource::File => "file",
            ValueSource::Default => "default",
        };
        write!(f, "{}", label)
    }
}

/// Flags explicitly given on the command line, keyed by arg id.
///
/// Flags left at their defaults are absent, so a flag can only win when the
/// user actually typed it. Options that only name a storage target carry ids
/// of their own so they never reach the field registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagValues {
    values: BTreeMap<String, Vec<String>>,
}

impl FlagValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an explicitly set flag.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Collect every flag whose value came from the command line, walking
    /// down through the invoked subcommands.
    pub fn from_matches(cmd: &clap::Command, matches: &clap::ArgMatches) -> Self {
        let mut flags = Self::new();
        flags.collect(cmd, matches);
        flags
    }

    fn collect(&mut self, cmd: &clap::Command, matches: &clap::ArgMatches) {
        for arg in cmd.get_arguments() {
            if arg.get_long().is_none() {
                continue;
            }
            let id = arg.get_id().as_str();
            if matches.value_source(id) != Some(clap::parser::ValueSource::CommandLine) {
                continue;
            }
            let mut values: Vec<String> = matches
                .get_raw(id)
                .map(|raw| raw.map(|v| v.to_string_lossy().into_owned()).collect())
                .unwrap_or_default();
            if values.is_empty() {
                values.push("true".to_string());
            }
            self.values.insert(id.to_string(), values);
        }
        if let Some((name, sub_matches)) = matches.subcommand() {
            if let Some(sub) = cmd.find_subcommand(name) {
                self.collect(sub, sub_matches);
            }
        }
    }

    pub fn is_explicit(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// First value of an explicitly set flag.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Every value of an explicitly set flag.
    pub fn values(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Everything a single command execution needs to resolve configuration.
///
/// Built once in `main` and passed down; nothing reads ambient process state
/// after this point.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub paths: ConfigPaths,
    pub flags: FlagValues,
    pub env: EnvSnapshot,
}

impl InvocationContext {
    pub fn new(paths: ConfigPaths, flags: FlagValues, env: EnvSnapshot) -> Self {
        Self { paths, flags, env }
    }

    /// Capture the process environment and derive document paths from it.
    pub fn from_process(flags: FlagValues) -> Result<Self> {
        let env = EnvSnapshot::capture();
        let paths = ConfigPaths::resolve(&env)?;
        Ok(Self::new(paths, flags, env))
    }

    /// Explicit profile selection: `--profile`, then `IZ_PROFILE`.
    pub fn profile_override(&self) -> Option<&str> {
        self.flags
            .value("profile")
            .or_else(|| self.env.get(PROFILE_ENV))
    }

    pub fn quiet(&self) -> bool {
        self.flags.is_explicit("quiet")
    }
}

/// The effective configuration for one invocation.
///
/// Secrets live here in cleartext; only the diagnostics module renders this
/// struct, and it redacts sensitive fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub leader_url: String,
    pub client_base_url: String,
    pub tenant: String,
    pub project: String,
    pub context: String,
    pub worker: String,
    pub timeout: u64,
    pub verbose: bool,
    pub output_format: OutputFormat,
    pub color: ColorMode,
    pub insecure: bool,
    pub client_id: String,
    pub client_secret: String,
    pub personal_access_token_username: String,
    pub personal_access_token: String,
    /// Bearer token of the active session
    pub jwt_token: String,
    /// Sources of values filled in after layering
    pub provenance: BTreeMap<FieldId, ValueSource>,
}

impl ResolvedConfig {
    /// String rendering of a field's effective value.
    pub fn value(&self, id: FieldId) -> String {
        match id {
            FieldId::LeaderUrl => self.leader_url.clone(),
            FieldId::ClientBaseUrl => self.client_base_url.clone(),
            FieldId::Tenant => self.tenant.clone(),
            FieldId::Project => self.project.clone(),
            FieldId::Context => self.context.clone(),
            FieldId::Worker => self.worker.clone(),
            FieldId::Timeout => self.timeout.to_string(),
            FieldId::Verbose => self.verbose.to_string(),
            FieldId::OutputFormat => self.output_format.to_string(),
            FieldId::Color => self.color.to_string(),
            FieldId::Insecure => self.insecure.to_string(),
            FieldId::ClientId => self.client_id.clone(),
            FieldId::ClientSecret => self.client_secret.clone(),
            FieldId::PersonalAccessTokenUsername => self.personal_access_token_username.clone(),
            FieldId::PersonalAccessToken => self.personal_access_token.clone(),
        }
    }

    /// Both halves of the client API key are present.
    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Note where a value filled in after layering came from.
    pub fn record_source(&mut self, id: FieldId, source: ValueSource) {
        self.provenance.insert(id, source);
    }
}

/// A value together with the layer that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layered {
    pub source: ValueSource,
    pub value: String,
}

impl Layered {
    fn new(source: ValueSource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }
}

/// Inputs the source strategies look at.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub flags: &'a FlagValues,
    pub env: &'a EnvSnapshot,
    pub document: &'a ConfigDocument,
    pub config: &'a ResolvedConfig,
    pub profile: Option<&'a Profile>,
    pub session: Option<&'a Session>,
}

/// One layer of the precedence chain.
pub type SourceStrategy = fn(&SourceContext<'_>, &ConfigFieldInfo) -> Option<Layered>;

/// The precedence chain, highest first.
pub static SOURCE_PRECEDENCE: [(&str, SourceStrategy); 6] = [
    ("flag", from_flag),
    ("env", from_env),
    ("session", from_session),
    ("profile", from_profile),
    ("derived", from_derived),
    ("global", from_global),
];

fn from_flag(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    let value = ctx.flags.value(field.flag_name?)?;
    Some(Layered::new(ValueSource::Flag, value))
}

fn from_env(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    let value = ctx.env.get(field.env_var?)?;
    Some(Layered::new(ValueSource::Env, value))
}

/// A session URL only counts when the profile does not name a leader URL.
fn from_session(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    if field.id != FieldId::LeaderUrl {
        return None;
    }
    if ctx.profile.is_some_and(|p| !p.leader_url.is_empty()) {
        return None;
    }
    let session = ctx.session?;
    if session.url.is_empty() {
        return None;
    }
    Some(Layered::new(ValueSource::Session, session.url.as_str()))
}

fn from_profile(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    let profile = ctx.profile?;
    if !field.is_set_by_profile(profile) {
        return None;
    }
    Some(Layered::new(ValueSource::Profile, field.profile_value(profile)))
}

fn from_derived(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    let source = *ctx.config.provenance.get(&field.id)?;
    Some(Layered::new(source, ctx.config.value(field.id)))
}

fn from_global(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Option<Layered> {
    let global = lookup_global(ctx.document, ctx.env, field.global_key?);
    Some(Layered::new(global.source, global.value))
}

/// Walk the precedence chain for a field.
pub fn layered_value(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> Layered {
    SOURCE_PRECEDENCE
        .iter()
        .find_map(|(_, strategy)| strategy(ctx, field))
        .unwrap_or_else(|| Layered::new(ValueSource::Default, ""))
}

/// Which layer supplies a field.
pub fn determine_config_source(ctx: &SourceContext<'_>, field: &ConfigFieldInfo) -> ValueSource {
    layered_value(ctx, field).source
}

/// Result of resolving one invocation: the effective values plus the
/// profile and session they were drawn from.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub profile_name: Option<String>,
    pub profile: Option<Profile>,
    pub session_name: Option<String>,
    pub session: Option<Session>,
    pub(crate) flags: FlagValues,
    pub(crate) env: EnvSnapshot,
    pub(crate) document: ConfigDocument,
}

impl Resolution {
    pub fn source_context(&self) -> SourceContext<'_> {
        SourceContext {
            flags: &self.flags,
            env: &self.env,
            document: &self.document,
            config: &self.config,
            profile: self.profile.as_ref(),
            session: self.session.as_ref(),
        }
    }

    /// Which layer supplied a field's current value.
    pub fn source_of(&self, id: FieldId) -> ValueSource {
        determine_config_source(&self.source_context(), id.info())
    }

    pub fn flags(&self) -> &FlagValues {
        &self.flags
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }
}

/// Resolve the effective configuration for one invocation.
pub fn resolve(ctx: &InvocationContext, docs: &Documents) -> Result<Resolution> {
    let (profile_name, profile) = select_profile(ctx, &docs.config)?;
    let (session_name, session) = select_session(profile.as_ref(), &docs.sessions)?;

    let mut resolution = Resolution {
        config: ResolvedConfig::default(),
        profile_name,
        profile,
        session_name,
        session,
        flags: ctx.flags.clone(),
        env: ctx.env.clone(),
        document: docs.config.clone(),
    };

    let mut config = build_config(&resolution.source_context())?;
    if let Some(session) = &resolution.session {
        config.jwt_token = session.jwt_token.clone();
    }
    resolution.config = config;

    tracing::debug!(
        profile = resolution.profile_name.as_deref().unwrap_or("-"),
        session = resolution.session_name.as_deref().unwrap_or("-"),
        "resolved configuration"
    );
    Ok(resolution)
}

/// `--profile` / `IZ_PROFILE` must name an existing profile; a dangling
/// `active_profile` is treated as no profile.
fn select_profile(
    ctx: &InvocationContext,
    doc: &ConfigDocument,
) -> Result<(Option<String>, Option<Profile>)> {
    if let Some(name) = ctx.profile_override() {
        let profile = doc
            .profiles
            .get(name)
            .ok_or_else(|| Error::not_found("Profile", name))?;
        return Ok((Some(name.to_string()), Some(profile.clone())));
    }
    match doc.active_profile() {
        Some((name, profile)) => Ok((Some(name.to_string()), Some(profile.clone()))),
        None => {
            if !doc.active_profile.is_empty() {
                tracing::debug!(name = %doc.active_profile, "active profile does not exist, ignoring");
            }
            Ok((None, None))
        }
    }
}

/// A profile's session reference must exist; otherwise fall back to the
/// session document's active entry, ignoring it if dangling.
fn select_session(
    profile: Option<&Profile>,
    doc: &SessionDocument,
) -> Result<(Option<String>, Option<Session>)> {
    if let Some(name) = profile.map(|p| p.session.as_str()).filter(|n| !n.is_empty()) {
        let session = doc
            .sessions
            .get(name)
            .ok_or_else(|| Error::not_found("Session", name))?;
        return Ok((Some(name.to_string()), Some(session.clone())));
    }
    if !doc.active.is_empty() {
        if let Some(session) = doc.sessions.get(&doc.active) {
            return Ok((Some(doc.active.clone()), Some(session.clone())));
        }
    }
    Ok((None, None))
}

fn build_config(ctx: &SourceContext<'_>) -> Result<ResolvedConfig> {
    let text = |id: FieldId| layered_value(ctx, id.info()).value;

    let timeout = layered_value(ctx, FieldId::Timeout.info());
    let verbose = layered_value(ctx, FieldId::Verbose.info());
    let output_format = layered_value(ctx, FieldId::OutputFormat.info());
    let color = layered_value(ctx, FieldId::Color.info());
    let insecure = layered_value(ctx, FieldId::Insecure.info());

    Ok(ResolvedConfig {
        leader_url: text(FieldId::LeaderUrl),
        client_base_url: text(FieldId::ClientBaseUrl),
        tenant: text(FieldId::Tenant),
        project: text(FieldId::Project),
        context: text(FieldId::Context),
        worker: text(FieldId::Worker),
        timeout: timeout
            .value
            .trim()
            .parse()
            .map_err(|_| invalid_value(FieldId::Timeout, &timeout))?,
        verbose: parse_bool(&verbose.value).ok_or_else(|| invalid_value(FieldId::Verbose, &verbose))?,
        output_format: OutputFormat::parse(&output_format.value)
            .ok_or_else(|| invalid_value(FieldId::OutputFormat, &output_format))?,
        color: ColorMode::parse(&color.value).ok_or_else(|| invalid_value(FieldId::Color, &color))?,
        insecure: if insecure.value.is_empty() {
            false
        } else {
            parse_bool(&insecure.value).ok_or_else(|| invalid_value(FieldId::Insecure, &insecure))?
        },
        client_id: text(FieldId::ClientId),
        client_secret: text(FieldId::ClientSecret),
        personal_access_token_username: text(FieldId::PersonalAccessTokenUsername),
        personal_access_token: text(FieldId::PersonalAccessToken),
        jwt_token: String::new(),
        provenance: BTreeMap::new(),
    })
}

fn invalid_value(id: FieldId, layered: &Layered) -> Error {
    Error::InvalidInput(format!(
        "invalid {} value '{}' (source: {})",
        id.key(),
        layered.value,
        layered.source
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::SessionDocument;
    use crate::test_utils::{TestEnv, env_of};

    fn context(env: &TestEnv, flags: FlagValues, vars: &[(&str, &str)]) -> InvocationContext {
        InvocationContext::new(env.paths(), flags, env_of(vars))
    }

    fn sandbox_docs() -> Documents {
        let mut config = ConfigDocument {
            timeout: Some(45),
            active_profile: "sandbox".to_string(),
            ..Default::default()
        };
        config.profiles.insert(
            "sandbox".to_string(),
            Profile {
                leader_url: "http://sandbox.example.com".to_string(),
                tenant: "sandbox-tenant".to_string(),
                ..Default::default()
            },
        );
        Documents {
            config,
            sessions: SessionDocument::default(),
        }
    }

    fn docs_with_session(profile: Profile, session: Session) -> Documents {
        let mut docs = Documents::default();
        docs.config.active_profile = "p".to_string();
        docs.config.profiles.insert("p".to_string(), Profile {
            session: "s".to_string(),
            ..profile
        });
        docs.sessions.sessions.insert("s".to_string(), session);
        docs
    }

    // ==================== ValueSource Tests ====================

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::Flag.to_string(), "flag");
        assert_eq!(ValueSource::Env.to_string(), "env");
        assert_eq!(ValueSource::Profile.to_string(), "profile");
        assert_eq!(ValueSource::Session.to_string(), "session");
        assert_eq!(ValueSource::File.to_string(), "file");
        assert_eq!(ValueSource::Default.to_string(), "default");
    }

    #[test]
    fn test_precedence_chain_order() {
        let names: Vec<&str> = SOURCE_PRECEDENCE.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec!["flag", "env", "session", "profile", "derived", "global"]
        );
    }

    // ==================== Resolution Tests ====================

    #[test]
    fn test_resolve_defaults() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &Documents::default()).unwrap();
        let config = &resolution.config;

        assert!(resolution.profile.is_none());
        assert_eq!(config.leader_url, "");
        assert_eq!(config.timeout, 30);
        assert!(!config.verbose);
        assert_eq!(config.output_format, OutputFormat::Table);
        assert_eq!(config.color, ColorMode::Auto);
        assert!(!config.insecure);
        assert_eq!(resolution.source_of(FieldId::LeaderUrl), ValueSource::Default);
        assert_eq!(resolution.source_of(FieldId::Timeout), ValueSource::Default);
    }

    #[test]
    fn test_sandbox_scenario_sources() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[("IZ_CONTEXT", "staging/eu-west")]);
        let resolution = resolve(&ctx, &sandbox_docs()).unwrap();
        let config = &resolution.config;

        assert_eq!(config.leader_url, "http://sandbox.example.com");
        assert_eq!(resolution.source_of(FieldId::LeaderUrl), ValueSource::Profile);
        assert_eq!(config.tenant, "sandbox-tenant");
        assert_eq!(resolution.source_of(FieldId::Tenant), ValueSource::Profile);
        assert_eq!(config.context, "staging/eu-west");
        assert_eq!(resolution.source_of(FieldId::Context), ValueSource::Env);
        assert_eq!(config.timeout, 45);
        assert_eq!(resolution.source_of(FieldId::Timeout), ValueSource::File);
    }

    #[test]
    fn test_flag_always_wins() {
        let env = TestEnv::new();
        let flags = FlagValues::new()
            .with("url", "http://flag")
            .with("tenant", "flag-tenant")
            .with("timeout", "5")
            .with("insecure", "true");
        let ctx = context(
            &env,
            flags,
            &[
                ("IZ_LEADER_URL", "http://env"),
                ("IZ_TENANT", "env-tenant"),
                ("IZ_timeout", "9"),
            ],
        );
        let resolution = resolve(&ctx, &sandbox_docs()).unwrap();

        assert_eq!(resolution.config.leader_url, "http://flag");
        assert_eq!(resolution.config.tenant, "flag-tenant");
        assert_eq!(resolution.config.timeout, 5);
        assert!(resolution.config.insecure);
        for id in [
            FieldId::LeaderUrl,
            FieldId::Tenant,
            FieldId::Timeout,
            FieldId::Insecure,
        ] {
            assert_eq!(resolution.source_of(id), ValueSource::Flag, "{:?}", id);
        }
    }

    #[test]
    fn test_env_beats_profile() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[("IZ_TENANT", "env-tenant")]);
        let resolution = resolve(&ctx, &sandbox_docs()).unwrap();
        assert_eq!(resolution.config.tenant, "env-tenant");
        assert_eq!(resolution.source_of(FieldId::Tenant), ValueSource::Env);
    }

    #[test]
    fn test_unset_field_without_profile_is_default() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &Documents::default()).unwrap();
        for id in [FieldId::Tenant, FieldId::Project, FieldId::Context, FieldId::ClientId] {
            assert_eq!(resolution.source_of(id), ValueSource::Default, "{:?}", id);
        }
    }

    #[test]
    fn test_session_url_used_when_profile_has_none() {
        let env = TestEnv::new();
        let docs = docs_with_session(
            Profile::default(),
            Session {
                url: "http://session".to_string(),
                jwt_token: "jwt".to_string(),
                ..Default::default()
            },
        );
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();

        assert_eq!(resolution.config.leader_url, "http://session");
        assert_eq!(resolution.source_of(FieldId::LeaderUrl), ValueSource::Session);
        assert_eq!(resolution.config.jwt_token, "jwt");
    }

    #[test]
    fn test_profile_url_beats_session_url() {
        let env = TestEnv::new();
        let docs = docs_with_session(
            Profile {
                leader_url: "http://profile".to_string(),
                ..Default::default()
            },
            Session {
                url: "http://session".to_string(),
                ..Default::default()
            },
        );
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();

        assert_eq!(resolution.config.leader_url, "http://profile");
        assert_eq!(resolution.source_of(FieldId::LeaderUrl), ValueSource::Profile);
    }

    #[test]
    fn test_active_session_used_without_profile() {
        let env = TestEnv::new();
        let mut docs = Documents::default();
        docs.sessions.active = "s".to_string();
        docs.sessions.sessions.insert("s".to_string(), Session {
            url: "http://active".to_string(),
            ..Default::default()
        });
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();

        assert_eq!(resolution.session_name.as_deref(), Some("s"));
        assert_eq!(resolution.source_of(FieldId::LeaderUrl), ValueSource::Session);
    }

    #[test]
    fn test_insecure_false_never_attributed_to_profile() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &sandbox_docs()).unwrap();
        assert!(!resolution.config.insecure);
        assert_eq!(resolution.source_of(FieldId::Insecure), ValueSource::Default);
    }

    #[test]
    fn test_insecure_true_attributed_to_profile() {
        let env = TestEnv::new();
        let mut docs = sandbox_docs();
        docs.config.profiles.get_mut("sandbox").unwrap().insecure = true;
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();
        assert!(resolution.config.insecure);
        assert_eq!(resolution.source_of(FieldId::Insecure), ValueSource::Profile);
    }

    #[test]
    fn test_global_key_from_derived_env_name() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[("IZ_output_format", "json")]);
        let resolution = resolve(&ctx, &Documents::default()).unwrap();
        assert_eq!(resolution.config.output_format, OutputFormat::Json);
        assert_eq!(resolution.source_of(FieldId::OutputFormat), ValueSource::Env);
    }

    #[test]
    fn test_profile_flag_selects_profile() {
        let env = TestEnv::new();
        let mut docs = sandbox_docs();
        docs.config.profiles.insert("prod".to_string(), Profile {
            tenant: "prod-tenant".to_string(),
            ..Default::default()
        });
        let ctx = context(&env, FlagValues::new().with("profile", "prod"), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();
        assert_eq!(resolution.profile_name.as_deref(), Some("prod"));
        assert_eq!(resolution.config.tenant, "prod-tenant");
    }

    #[test]
    fn test_profile_env_selects_profile() {
        let env = TestEnv::new();
        let mut docs = sandbox_docs();
        docs.config.profiles.insert("prod".to_string(), Profile::default());
        let ctx = context(&env, FlagValues::new(), &[(PROFILE_ENV, "prod")]);
        let resolution = resolve(&ctx, &docs).unwrap();
        assert_eq!(resolution.profile_name.as_deref(), Some("prod"));
    }

    #[test]
    fn test_missing_explicit_profile_is_not_found() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new().with("profile", "ghost"), &[]);
        let err = resolve(&ctx, &sandbox_docs()).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Profile", .. }));
    }

    #[test]
    fn test_dangling_active_profile_tolerated() {
        let env = TestEnv::new();
        let mut docs = Documents::default();
        docs.config.active_profile = "ghost".to_string();
        let ctx = context(&env, FlagValues::new(), &[]);
        let resolution = resolve(&ctx, &docs).unwrap();
        assert!(resolution.profile.is_none());
    }

    #[test]
    fn test_dangling_session_reference_is_not_found() {
        let env = TestEnv::new();
        let mut docs = sandbox_docs();
        docs.config.profiles.get_mut("sandbox").unwrap().session = "gone".to_string();
        let ctx = context(&env, FlagValues::new(), &[]);
        let err = resolve(&ctx, &docs).unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "Session", .. }));
    }

    #[test]
    fn test_invalid_env_timeout_names_source() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[("IZ_timeout", "soon")]);
        let err = resolve(&ctx, &Documents::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("timeout"));
        assert!(message.contains("source: env"));
    }

    #[test]
    fn test_derived_provenance_reported() {
        let env = TestEnv::new();
        let ctx = context(&env, FlagValues::new(), &[]);
        let mut resolution = resolve(&ctx, &Documents::default()).unwrap();
        resolution.config.client_id = "from-store".to_string();
        resolution
            .config
            .record_source(FieldId::ClientId, ValueSource::File);
        assert_eq!(resolution.source_of(FieldId::ClientId), ValueSource::File);
    }

    // ==================== FlagValues Tests ====================

    #[test]
    fn test_flag_values_from_matches_only_explicit() {
        use clap::{Arg, ArgAction, Command};

        let cmd = Command::new("iz")
            .arg(Arg::new("timeout").long("timeout").default_value("30"))
            .arg(Arg::new("insecure").long("insecure").action(ArgAction::SetTrue))
            .subcommand(Command::new("explain").arg(Arg::new("client-id").long("client-id")));

        let matches = cmd
            .clone()
            .try_get_matches_from(["iz", "--insecure", "explain", "--client-id", "abc"])
            .unwrap();
        let flags = FlagValues::from_matches(&cmd, &matches);

        assert!(!flags.is_explicit("timeout"));
        assert!(flags.is_explicit("insecure"));
        assert_eq!(flags.value("insecure"), Some("true"));
        assert_eq!(flags.value("client-id"), Some("abc"));
    }

    #[test]
    fn test_flag_values_keyed_by_arg_id() {
        use clap::{Arg, Command};

        let cmd = Command::new("iz").subcommand(
            Command::new("add").arg(Arg::new("target-worker").long("worker")),
        );
        let matches = cmd
            .clone()
            .try_get_matches_from(["iz", "add", "--worker", "eu"])
            .unwrap();
        let flags = FlagValues::from_matches(&cmd, &matches);

        assert!(!flags.is_explicit("worker"));
        assert_eq!(flags.value("target-worker"), Some("eu"));
    }
}

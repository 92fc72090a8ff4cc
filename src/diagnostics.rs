//! Verbose reports explaining the effective configuration.
//!
//! Three reports can be written independently: the resolved fields with their
//! sources, the `IZ_*` environment, and the authentication modes in effect.
//! Sensitive values are always replaced by [`REDACTED`]. Write failures are
//! ignored; diagnostics never fail a command.

use crate::config::env::EnvSnapshot;
use crate::config::registry::{DisplayRule, FIELD_REGISTRY};
use crate::config::resolver::{Resolution, ResolvedConfig, ValueSource};
use serde::Serialize;
use std::io::Write;

/// Marker printed in place of a secret.
pub const REDACTED: &str = "<redacted>";

/// Environment variable names containing any of these have their values redacted.
pub const SENSITIVE_ENV_PATTERNS: [&str; 3] = ["SECRET", "TOKEN", "PASSWORD"];

/// One resolved field as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigLine {
    pub key: &'static str,
    pub value: String,
    pub source: ValueSource,
}

/// Fields worth showing, already redacted, in registry order.
pub fn effective_config_lines(resolution: &Resolution) -> Vec<ConfigLine> {
    FIELD_REGISTRY
        .iter()
        .filter_map(|info| {
            let value = resolution.config.value(info.id);
            let shown = match info.display {
                DisplayRule::SkipEmpty => !value.is_empty(),
                DisplayRule::Always => true,
                DisplayRule::OnlyWhenTrue => value == "true",
            };
            if !shown {
                return None;
            }
            let value = if info.sensitive && !value.is_empty() {
                REDACTED.to_string()
            } else {
                value
            };
            Some(ConfigLine {
                key: info.key,
                value,
                source: resolution.source_of(info.id),
            })
        })
        .collect()
}

pub fn log_effective_config(out: &mut dyn Write, resolution: &Resolution) {
    write_config_lines(out, &effective_config_lines(resolution));
}

pub fn write_config_lines(out: &mut dyn Write, lines: &[ConfigLine]) {
    for line in lines {
        let _ = writeln!(
            out,
            "[verbose] Config: {}={} (source: {})",
            line.key, line.value, line.source
        );
    }
}

/// An `IZ_*` variable as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvLine {
    pub name: String,
    pub value: String,
}

pub fn is_sensitive_env_name(name: &str) -> bool {
    let upper = name.to_uppercase();
    SENSITIVE_ENV_PATTERNS.iter().any(|p| upper.contains(p))
}

/// Every captured variable in lexicographic order, secrets redacted.
pub fn environment_lines(env: &EnvSnapshot) -> Vec<EnvLine> {
    env.iter()
        .map(|(name, value)| EnvLine {
            name: name.to_string(),
            value: if is_sensitive_env_name(name) && !value.is_empty() {
                REDACTED.to_string()
            } else {
                value.to_string()
            },
        })
        .collect()
}

pub fn log_environment_variables(out: &mut dyn Write, env: &EnvSnapshot) {
    write_environment_lines(out, &environment_lines(env));
}

pub fn write_environment_lines(out: &mut dyn Write, lines: &[EnvLine]) {
    if lines.is_empty() {
        let _ = writeln!(out, "[verbose] Environment: no IZ_* variables set");
        return;
    }
    for line in lines {
        let _ = writeln!(out, "[verbose] Environment: {}={}", line.name, line.value);
    }
}

/// Authentication used for admin API calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAuth {
    None,
    PersonalAccessToken,
    JwtSession,
}

impl std::fmt::Display for AdminAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAuth::None => write!(f, "none"),
            AdminAuth::PersonalAccessToken => write!(f, "Personal Access Token"),
            AdminAuth::JwtSession => write!(f, "JWT session"),
        }
    }
}

/// Authentication used for feature checks against the client API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureAuth {
    None,
    ClientApiKey,
}

impl std::fmt::Display for FeatureAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureAuth::None => write!(f, "none"),
            FeatureAuth::ClientApiKey => write!(f, "Client API key"),
        }
    }
}

/// A personal access token wins over a session token.
pub fn admin_auth_mode(cfg: &ResolvedConfig) -> AdminAuth {
    if !cfg.personal_access_token.is_empty() {
        AdminAuth::PersonalAccessToken
    } else if !cfg.jwt_token.is_empty() {
        AdminAuth::JwtSession
    } else {
        AdminAuth::None
    }
}

pub fn feature_auth_mode(cfg: &ResolvedConfig) -> FeatureAuth {
    if cfg.has_client_credentials() {
        FeatureAuth::ClientApiKey
    } else {
        FeatureAuth::None
    }
}

pub fn log_authentication_mode(out: &mut dyn Write, cfg: &ResolvedConfig) {
    write_authentication_mode(out, admin_auth_mode(cfg), feature_auth_mode(cfg));
}

pub fn write_authentication_mode(out: &mut dyn Write, admin: AdminAuth, feature: FeatureAuth) {
    let _ = writeln!(out, "[verbose] Admin operations: {}", admin);
    let _ = writeln!(out, "[verbose] Feature checks: {}", feature);
}

/// All three reports, in the order printed before a verbose command runs.
pub fn log_all(out: &mut dyn Write, resolution: &Resolution) {
    log_effective_config(out, resolution);
    log_environment_variables(out, resolution.env());
    log_authentication_mode(out, &resolution.config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolver::{FlagValues, InvocationContext, resolve};
    use crate::config::schema::{ConfigDocument, Profile};
    use crate::config::store::Documents;
    use crate::test_utils::{TestEnv, env_of};

    fn resolved(docs: &Documents, flags: FlagValues, vars: &[(&str, &str)]) -> Resolution {
        let env = TestEnv::new();
        let ctx = InvocationContext::new(env.paths(), flags, env_of(vars));
        resolve(&ctx, docs).unwrap()
    }

    fn render(f: impl FnOnce(&mut dyn Write)) -> String {
        let mut out = Vec::new();
        f(&mut out);
        String::from_utf8(out).unwrap()
    }

    fn sandbox() -> Documents {
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
            ..Default::default()
        }
    }

    // ==================== Effective Config Tests ====================

    #[test]
    fn test_sandbox_scenario_lines() {
        let resolution = resolved(&sandbox(), FlagValues::new(), &[("IZ_CONTEXT", "staging/eu-west")]);
        let text = render(|out| log_effective_config(out, &resolution));

        assert!(text.contains(
            "[verbose] Config: leader-url=http://sandbox.example.com (source: profile)"
        ));
        assert!(text.contains("[verbose] Config: tenant=sandbox-tenant (source: profile)"));
        assert!(text.contains("[verbose] Config: context=staging/eu-west (source: env)"));
        assert!(text.contains("[verbose] Config: timeout=45 (source: file)"));
    }

    #[test]
    fn test_empty_fields_skipped() {
        let resolution = resolved(&Documents::default(), FlagValues::new(), &[]);
        let text = render(|out| log_effective_config(out, &resolution));
        assert!(!text.contains("tenant="));
        assert!(!text.contains("leader-url="));
    }

    #[test]
    fn test_zero_timeout_is_printed() {
        let resolution = resolved(&Documents::default(), FlagValues::new().with("timeout", "0"), &[]);
        let text = render(|out| log_effective_config(out, &resolution));
        assert!(text.contains("[verbose] Config: timeout=0 (source: flag)"));
    }

    #[test]
    fn test_insecure_only_printed_when_true() {
        let resolution = resolved(&Documents::default(), FlagValues::new(), &[]);
        let text = render(|out| log_effective_config(out, &resolution));
        assert!(!text.contains("insecure"));

        let resolution = resolved(&Documents::default(), FlagValues::new().with("insecure", "true"), &[]);
        let text = render(|out| log_effective_config(out, &resolution));
        assert!(text.contains("[verbose] Config: insecure=true (source: flag)"));
    }

    #[test]
    fn test_secrets_redacted_regardless_of_value() {
        for secret in ["Zq9", "a-much-longer-secret-value-with-symbols!@#"] {
            let resolution = resolved(
                &Documents::default(),
                FlagValues::new(),
                &[
                    ("IZ_CLIENT_ID", "visible-id"),
                    ("IZ_CLIENT_SECRET", secret),
                    ("IZ_PERSONAL_ACCESS_TOKEN", secret),
                ],
            );
            let text = render(|out| log_effective_config(out, &resolution));

            assert!(text.contains("client-id=visible-id (source: env)"));
            assert!(text.contains("client-secret=<redacted> (source: env)"));
            assert!(text.contains("personal-access-token=<redacted> (source: env)"));
            assert!(!text.contains(secret));
        }
    }

    // ==================== Environment Tests ====================

    #[test]
    fn test_no_environment_variables() {
        let text = render(|out| log_environment_variables(out, &env_of(&[])));
        assert_eq!(text, "[verbose] Environment: no IZ_* variables set\n");
    }

    #[test]
    fn test_environment_sorted_and_redacted() {
        let env = env_of(&[
            ("IZ_TENANT", "acme"),
            ("IZ_CLIENT_SECRET", "shh"),
            ("IZ_CONTEXT", "prod"),
            ("IZ_PERSONAL_ACCESS_TOKEN", "pat"),
        ]);
        let text = render(|out| log_environment_variables(out, &env));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "[verbose] Environment: IZ_CLIENT_SECRET=<redacted>",
                "[verbose] Environment: IZ_CONTEXT=prod",
                "[verbose] Environment: IZ_PERSONAL_ACCESS_TOKEN=<redacted>",
                "[verbose] Environment: IZ_TENANT=acme",
            ]
        );
    }

    // ==================== Authentication Mode Tests ====================

    #[test]
    fn test_fresh_defaults_report_no_auth() {
        let resolution = resolved(&Documents::default(), FlagValues::new(), &[]);
        let text = render(|out| log_authentication_mode(out, &resolution.config));
        assert!(text.contains("[verbose] Admin operations: none"));
        assert!(text.contains("[verbose] Feature checks: none"));
    }

    #[test]
    fn test_pat_beats_jwt() {
        let cfg = ResolvedConfig {
            personal_access_token: "pat".to_string(),
            jwt_token: "jwt".to_string(),
            ..Default::default()
        };
        assert_eq!(admin_auth_mode(&cfg), AdminAuth::PersonalAccessToken);

        let cfg = ResolvedConfig {
            jwt_token: "jwt".to_string(),
            ..Default::default()
        };
        assert_eq!(admin_auth_mode(&cfg), AdminAuth::JwtSession);
    }

    #[test]
    fn test_feature_checks_need_both_halves() {
        let mut cfg = ResolvedConfig {
            client_id: "id".to_string(),
            ..Default::default()
        };
        assert_eq!(feature_auth_mode(&cfg), FeatureAuth::None);
        cfg.client_secret = "secret".to_string();
        assert_eq!(feature_auth_mode(&cfg), FeatureAuth::ClientApiKey);

        let text = render(|out| log_authentication_mode(out, &cfg));
        assert!(text.contains("[verbose] Feature checks: Client API key"));
    }
}

//! Static table of every resolvable configuration field.
//!
//! Each entry ties a canonical key to the CLI flag and environment variable
//! that can override it, says whether the value is a secret, and carries a
//! typed accessor for the matching profile attribute.

use crate::config::globals::GlobalKey;
use crate::config::schema::Profile;

/// Identifier of a resolvable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldId {
    LeaderUrl,
    ClientBaseUrl,
    Tenant,
    Project,
    Context,
    Worker,
    Timeout,
    Verbose,
    OutputFormat,
    Color,
    Insecure,
    ClientId,
    ClientSecret,
    PersonalAccessTokenUsername,
    PersonalAccessToken,
}

/// How the diagnostics reporter treats a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayRule {
    /// Printed when non-empty.
    SkipEmpty,
    /// Printed even when zero.
    Always,
    /// Printed only when `"true"`.
    OnlyWhenTrue,
}

/// Static descriptor of one resolvable field.
#[derive(Debug, Clone, Copy)]
pub struct ConfigFieldInfo {
    pub id: FieldId,
    pub key: &'static str,
    /// Arg id of the CLI flag
    pub flag_name: Option<&'static str>,
    pub env_var: Option<&'static str>,
    pub sensitive: bool,
    pub display: DisplayRule,
    /// Set when the field is also a global key of config.yaml
    pub global_key: Option<GlobalKey>,
    /// Boolean profile attributes only count as set when `true`
    pub boolean: bool,
    pub profile_accessor: Option<fn(&Profile) -> String>,
}

const fn field(id: FieldId, key: &'static str) -> ConfigFieldInfo {
    ConfigFieldInfo {
        id,
        key,
        flag_name: None,
        env_var: None,
        sensitive: false,
        display: DisplayRule::SkipEmpty,
        global_key: None,
        boolean: false,
        profile_accessor: None,
    }
}

/// Every resolvable field, in display order.
pub static FIELD_REGISTRY: [ConfigFieldInfo; 15] = [
    ConfigFieldInfo {
        flag_name: Some("url"),
        env_var: Some("IZ_LEADER_URL"),
        profile_accessor: Some(|p: &Profile| p.leader_url.clone()),
        ..field(FieldId::LeaderUrl, "leader-url")
    },
    ConfigFieldInfo {
        env_var: Some("IZ_CLIENT_BASE_URL"),
        profile_accessor: Some(|p: &Profile| p.client_base_url.clone()),
        ..field(FieldId::ClientBaseUrl, "client-base-url")
    },
    ConfigFieldInfo {
        flag_name: Some("tenant"),
        env_var: Some("IZ_TENANT"),
        profile_accessor: Some(|p: &Profile| p.tenant.clone()),
        ..field(FieldId::Tenant, "tenant")
    },
    ConfigFieldInfo {
        flag_name: Some("project"),
        env_var: Some("IZ_PROJECT"),
        profile_accessor: Some(|p: &Profile| p.project.clone()),
        ..field(FieldId::Project, "project")
    },
    ConfigFieldInfo {
        flag_name: Some("context"),
        env_var: Some("IZ_CONTEXT"),
        profile_accessor: Some(|p: &Profile| p.context.clone()),
        ..field(FieldId::Context, "context")
    },
    ConfigFieldInfo {
        flag_name: Some("worker"),
        env_var: Some("IZ_WORKER"),
        ..field(FieldId::Worker, "worker")
    },
    ConfigFieldInfo {
        flag_name: Some("timeout"),
        display: DisplayRule::Always,
        global_key: Some(GlobalKey::Timeout),
        ..field(FieldId::Timeout, "timeout")
    },
    ConfigFieldInfo {
        flag_name: Some("verbose"),
        global_key: Some(GlobalKey::Verbose),
        ..field(FieldId::Verbose, "verbose")
    },
    ConfigFieldInfo {
        flag_name: Some("output"),
        global_key: Some(GlobalKey::OutputFormat),
        ..field(FieldId::OutputFormat, "output-format")
    },
    ConfigFieldInfo {
        flag_name: Some("color"),
        global_key: Some(GlobalKey::Color),
        ..field(FieldId::Color, "color")
    },
    ConfigFieldInfo {
        flag_name: Some("insecure"),
        env_var: Some("IZ_INSECURE"),
        display: DisplayRule::OnlyWhenTrue,
        boolean: true,
        profile_accessor: Some(|p: &Profile| p.insecure.to_string()),
        ..field(FieldId::Insecure, "insecure")
    },
    ConfigFieldInfo {
        flag_name: Some("client-id"),
        env_var: Some("IZ_CLIENT_ID"),
        ..field(FieldId::ClientId, "client-id")
    },
    ConfigFieldInfo {
        flag_name: Some("client-secret"),
        env_var: Some("IZ_CLIENT_SECRET"),
        sensitive: true,
        ..field(FieldId::ClientSecret, "client-secret")
    },
    ConfigFieldInfo {
        env_var: Some("IZ_PERSONAL_ACCESS_TOKEN_USERNAME"),
        ..field(
            FieldId::PersonalAccessTokenUsername,
            "personal-access-token-username",
        )
    },
    ConfigFieldInfo {
        env_var: Some("IZ_PERSONAL_ACCESS_TOKEN"),
        sensitive: true,
        ..field(FieldId::PersonalAccessToken, "personal-access-token")
    },
];

impl FieldId {
    /// Registry entry for this field.
    pub fn info(self) -> &'static ConfigFieldInfo {
        // The registry is declared in enum order.
        &FIELD_REGISTRY[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.info().key
    }

    /// Look a field up by its canonical key.
    pub fn from_key(key: &str) -> Option<FieldId> {
        FIELD_REGISTRY.iter().find(|f| f.key == key).map(|f| f.id)
    }
}

impl ConfigFieldInfo {
    /// The profile's value for this field, or empty when the profile has no such attribute.
    pub fn profile_value(&self, profile: &Profile) -> String {
        self.profile_accessor.map(|get| get(profile)).unwrap_or_default()
    }

    /// Whether the profile supplies this field.
    ///
    /// Boolean attributes only count when `true`: `false` cannot be told apart from unset.
    pub fn is_set_by_profile(&self, profile: &Profile) -> bool {
        let value = self.profile_value(profile);
        if self.boolean {
            value == "true"
        } else {
            !value.is_empty()
        }
    }
}

/// The profile's value for a field key, stringifying booleans.
///
/// Unknown keys return the empty string.
pub fn get_profile_field_value(profile: &Profile, key: &str) -> String {
    FieldId::from_key(key)
        .map(|id| id.info().profile_value(profile))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_in_enum_order() {
        for (index, info) in FIELD_REGISTRY.iter().enumerate() {
            assert_eq!(info.id as usize, index, "{} out of order", info.key);
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = FIELD_REGISTRY.iter().map(|f| f.key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), FIELD_REGISTRY.len());
    }

    #[test]
    fn test_global_keys_declare_no_env_var() {
        for info in FIELD_REGISTRY.iter().filter(|f| f.global_key.is_some()) {
            assert!(info.env_var.is_none(), "{} should not declare env", info.key);
        }
    }

    #[test]
    fn test_secrets_are_sensitive() {
        assert!(FieldId::ClientSecret.info().sensitive);
        assert!(FieldId::PersonalAccessToken.info().sensitive);
        assert!(!FieldId::ClientId.info().sensitive);
        assert!(!FieldId::LeaderUrl.info().sensitive);
    }

    #[test]
    fn test_get_profile_field_value() {
        let profile = Profile {
            leader_url: "http://leader".to_string(),
            tenant: "acme".to_string(),
            default_worker: "eu".to_string(),
            insecure: true,
            ..Default::default()
        };
        assert_eq!(get_profile_field_value(&profile, "leader-url"), "http://leader");
        assert_eq!(get_profile_field_value(&profile, "tenant"), "acme");
        // The default worker only applies when a command opts in.
        assert_eq!(get_profile_field_value(&profile, "worker"), "");
        assert_eq!(get_profile_field_value(&profile, "insecure"), "true");
        assert_eq!(get_profile_field_value(&Profile::default(), "insecure"), "false");
    }

    #[test]
    fn test_unknown_key_returns_empty() {
        let profile = Profile::default();
        assert_eq!(get_profile_field_value(&profile, "no-such-key"), "");
    }

    #[test]
    fn test_legacy_credentials_hidden_from_accessor() {
        let profile = Profile {
            client_id: "legacy-id".to_string(),
            client_secret: "legacy-secret".to_string(),
            ..Default::default()
        };
        assert_eq!(get_profile_field_value(&profile, "client-id"), "");
        assert_eq!(get_profile_field_value(&profile, "client-secret"), "");
    }

    #[test]
    fn test_false_boolean_not_set_by_profile() {
        let info = FieldId::Insecure.info();
        assert!(!info.is_set_by_profile(&Profile::default()));
        let profile = Profile {
            insecure: true,
            ..Default::default()
        };
        assert!(info.is_set_by_profile(&profile));
    }
}

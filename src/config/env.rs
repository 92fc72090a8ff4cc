//! Per-invocation snapshot of the tool's environment variables.
//!
//! Resolvers never call `std::env::var` directly; the snapshot is captured once
//! in `main` and handed down, so tests can build one from literal pairs.

use std::collections::BTreeMap;

/// Reserved prefix for every variable the tool reads.
pub const ENV_PREFIX: &str = "IZ_";

/// Immutable view of the `IZ_*` variables present at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture all variables under [`ENV_PREFIX`] from the process environment.
    pub fn capture() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .filter(|(k, _)| k.starts_with(ENV_PREFIX))
            .collect();
        Self { vars }
    }

    /// Build a snapshot from explicit pairs. Names outside the prefix are dropped.
    pub fn from_vars(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .filter(|(k, _)| k.starts_with(ENV_PREFIX))
                .collect(),
        }
    }

    /// Value of a variable, treating empty as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// All captured variables in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Variable name derived from a config key: hyphens become underscores, case is kept.
///
/// `timeout` maps to `IZ_timeout`, `output-format` to `IZ_output_format`.
pub fn derived_env_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_derived_env_name_keeps_case() {
        assert_eq!(derived_env_name("timeout"), "IZ_timeout");
        assert_eq!(derived_env_name("output-format"), "IZ_output_format");
    }

    #[test]
    fn test_empty_value_is_unset() {
        let mut vars = BTreeMap::new();
        vars.insert("IZ_TENANT".to_string(), String::new());
        vars.insert("IZ_PROJECT".to_string(), "web".to_string());
        let env = EnvSnapshot::from_vars(vars);

        assert_eq!(env.get("IZ_TENANT"), None);
        assert_eq!(env.get("IZ_PROJECT"), Some("web"));
    }

    #[test]
    fn test_from_vars_drops_foreign_names() {
        let mut vars = BTreeMap::new();
        vars.insert("HOME".to_string(), "/root".to_string());
        vars.insert("IZ_CONTEXT".to_string(), "prod".to_string());
        let env = EnvSnapshot::from_vars(vars);

        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["IZ_CONTEXT"]);
    }

    #[test]
    #[serial]
    fn test_capture_reads_process_environment() {
        // SAFETY: serialized test; no other thread reads this variable.
        unsafe { std::env::set_var("IZ_SNAPSHOT_PROBE", "1") };
        let env = EnvSnapshot::capture();
        unsafe { std::env::remove_var("IZ_SNAPSHOT_PROBE") };

        assert_eq!(env.get("IZ_SNAPSHOT_PROBE"), Some("1"));
        assert!(env.iter().all(|(k, _)| k.starts_with(ENV_PREFIX)));
    }
}

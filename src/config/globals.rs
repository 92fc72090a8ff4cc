//! Global keys of config.yaml and the set/get/unset/list operations on them.
//!
//! Only the four global keys are handled here. Profile attributes and the
//! client-key hierarchy have their own commands.

use crate::config::env::{EnvSnapshot, derived_env_name};
use crate::config::resolver::ValueSource;
use crate::config::schema::{ColorMode, ConfigDocument, OutputFormat};
use crate::config::store::ConfigPaths;
use crate::{Error, Result};
use serde::Serialize;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A top-level scalar setting of config.yaml.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalKey {
    Timeout,
    Verbose,
    OutputFormat,
    Color,
}

impl GlobalKey {
    pub const ALL: [GlobalKey; 4] = [
        GlobalKey::Timeout,
        GlobalKey::Verbose,
        GlobalKey::OutputFormat,
        GlobalKey::Color,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GlobalKey::Timeout => "timeout",
            GlobalKey::Verbose => "verbose",
            GlobalKey::OutputFormat => "output-format",
            GlobalKey::Color => "color",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Parse a user-supplied key, explaining what went wrong.
    pub fn require(key: &str) -> Result<Self> {
        Self::parse(key).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
            Error::InvalidInput(format!(
                "'{}' is not a global config key (valid keys: {}); profile settings are changed with `iz profile set`",
                key,
                valid.join(", ")
            ))
        })
    }

    /// Built-in default value, rendered as a string.
    pub fn default_value(&self) -> String {
        match self {
            GlobalKey::Timeout => DEFAULT_TIMEOUT_SECS.to_string(),
            GlobalKey::Verbose => "false".to_string(),
            GlobalKey::OutputFormat => OutputFormat::default().to_string(),
            GlobalKey::Color => ColorMode::default().to_string(),
        }
    }

    /// Value explicitly present in the document.
    pub fn file_value(&self, doc: &ConfigDocument) -> Option<String> {
        match self {
            GlobalKey::Timeout => doc.timeout.map(|t| t.to_string()),
            GlobalKey::Verbose => doc.verbose.map(|v| v.to_string()),
            GlobalKey::OutputFormat => doc.output_format.map(|f| f.to_string()),
            GlobalKey::Color => doc.color.map(|c| c.to_string()),
        }
    }

    /// Value supplied through the environment.
    ///
    /// The derived name keeps the key's case (`IZ_timeout`); the upper-cased
    /// spelling (`IZ_TIMEOUT`) is accepted as a fallback.
    pub fn env_value<'a>(&self, env: &'a EnvSnapshot) -> Option<(String, &'a str)> {
        let derived = derived_env_name(self.as_str());
        let upper = derived.to_uppercase();
        [derived, upper]
            .into_iter()
            .find_map(|name| env.get(&name).map(|value| (name, value)))
    }

    /// Validate `value` and store it in the document.
    pub fn apply(&self, doc: &mut ConfigDocument, value: &str) -> Result<()> {
        let value = value.trim();
        match self {
            GlobalKey::Timeout => {
                let secs = value.parse::<u64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "timeout must be a non-negative integer (seconds), got '{}'",
                        value
                    ))
                })?;
                doc.timeout = Some(secs);
            }
            GlobalKey::Verbose => {
                doc.verbose = Some(parse_bool(value).ok_or_else(|| {
                    Error::InvalidInput(format!("verbose must be true or false, got '{}'", value))
                })?);
            }
            GlobalKey::OutputFormat => {
                doc.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "output-format must be 'table' or 'json', got '{}'",
                        value
                    ))
                })?);
            }
            GlobalKey::Color => {
                doc.color = Some(ColorMode::parse(value).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "color must be 'auto', 'always' or 'never', got '{}'",
                        value
                    ))
                })?);
            }
        }
        Ok(())
    }

    /// Remove the key from the document. Returns whether it was present.
    pub fn clear(&self, doc: &mut ConfigDocument) -> bool {
        match self {
            GlobalKey::Timeout => doc.timeout.take().is_some(),
            GlobalKey::Verbose => doc.verbose.take().is_some(),
            GlobalKey::OutputFormat => doc.output_format.take().is_some(),
            GlobalKey::Color => doc.color.take().is_some(),
        }
    }
}

impl std::fmt::Display for GlobalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse the boolean spellings accepted by `config set` and `IZ_*` variables.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A global key with its effective value and where that value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalValue {
    pub key: String,
    pub value: String,
    pub source: ValueSource,
}

/// Effective value of a global key: config file, then `IZ_<key>`, then the default.
pub fn lookup_global(doc: &ConfigDocument, env: &EnvSnapshot, key: GlobalKey) -> GlobalValue {
    let (value, source) = if let Some(value) = key.file_value(doc) {
        (value, ValueSource::File)
    } else if let Some((_, value)) = key.env_value(env) {
        (value.to_string(), ValueSource::Env)
    } else {
        (key.default_value(), ValueSource::Default)
    };
    GlobalValue {
        key: key.as_str().to_string(),
        value,
        source,
    }
}

/// Read a global key by name.
pub fn get_config_value(paths: &ConfigPaths, env: &EnvSnapshot, key: &str) -> Result<GlobalValue> {
    let key = GlobalKey::require(key)?;
    let doc = paths.load_config()?;
    Ok(lookup_global(&doc, env, key))
}

/// Validate and persist a global key.
pub fn set_config_value(paths: &ConfigPaths, key: &str, value: &str) -> Result<()> {
    let key = GlobalKey::require(key)?;
    let mut doc = paths.load_config()?;
    key.apply(&mut doc, value)?;
    paths.save_config(&doc)?;
    tracing::debug!(key = %key, "set global config value");
    Ok(())
}

/// Remove a global key from the document. Returns whether it was present.
pub fn unset_config_value(paths: &ConfigPaths, key: &str) -> Result<bool> {
    let key = GlobalKey::require(key)?;
    let mut doc = paths.load_config()?;
    let removed = key.clear(&mut doc);
    if removed {
        paths.save_config(&doc)?;
    }
    Ok(removed)
}

/// All global keys with their effective values.
pub fn list_config_values(doc: &ConfigDocument, env: &EnvSnapshot) -> Vec<GlobalValue> {
    GlobalKey::ALL
        .into_iter()
        .map(|key| lookup_global(doc, env, key))
        .collect()
}

//! Configuration, sessions and credential resolution for iz.
//!
//! Two documents are persisted, with independent lifecycles:
//!
//! ## config.yaml - Settings, profiles and client keys
//!
//! Located at `~/.config/iz/config.yaml` (or `$IZ_CONFIG_DIR/config.yaml`).
//!
//! Contains:
//! - `timeout`, `verbose`, `output-format`, `color` - global keys
//! - `active_profile` - name of the current profile
//! - `profiles` - named deployment contexts
//! - `client-keys` - tenant -> project client credentials
//!
//! ## sessions.yaml - Authentication state
//!
//! Located next to config.yaml. Contains `active` and the named `sessions`
//! (url, username, bearer token, creation time). Profiles reference sessions
//! by name; sessions never know who references them.
//!
//! ## Security
//!
//! Both documents hold secrets and are written with 0600 permissions.
//!
//! ## Precedence
//!
//! flag > env > session (leader URL only) > profile > config file > default.
//! Client credentials additionally walk the client-key hierarchy; see
//! [`credentials`]. The full chain lives in [`resolver`].

pub mod credentials;
pub mod env;
pub mod globals;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod store;

pub use credentials::{
    CredentialRequest, ResolvedWorker, resolve_client_credentials, resolve_worker,
    resolve_worker_from_profile,
};
pub use env::{ENV_PREFIX, EnvSnapshot, derived_env_name};
pub use globals::{
    GlobalKey, GlobalValue, get_config_value, list_config_values, set_config_value,
    unset_config_value,
};
pub use registry::{ConfigFieldInfo, DisplayRule, FIELD_REGISTRY, FieldId, get_profile_field_value};
pub use resolver::{
    FlagValues, InvocationContext, Resolution, ResolvedConfig, ValueSource,
    determine_config_source, resolve,
};
pub use schema::{
    ClientKeys, ColorMode, ConfigDocument, OutputFormat, Profile, Session, SessionDocument, Worker,
};
#[cfg(unix)]
pub use schema::DOCUMENT_FILE_MODE;
pub use store::{ConfigPaths, Documents, ResetOutcome};

//! CLI argument definitions for iz.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

/// Package version from Cargo.toml.
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Short git commit the binary was built from.
pub fn git_commit() -> &'static str {
    env!("IZ_GIT_COMMIT")
}

/// UTC build time (ISO 8601).
pub fn build_timestamp() -> &'static str {
    env!("IZ_BUILD_TIMESTAMP")
}

/// iz - A command-line client for a remote feature-flag service.
///
/// Settings are resolved from flags, IZ_* environment variables, the active
/// profile and session, and config.yaml. Run `iz config explain` to see where
/// each value comes from.
#[derive(Parser, Debug)]
#[command(name = "iz")]
#[command(author, version, about = "Command-line client for a feature-flag service", long_about = None)]
pub struct Cli {
    /// Leader URL of the service
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Tenant to operate on
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    /// Project to operate on (repeat to try several for client keys)
    #[arg(long, global = true, action = ArgAction::Append)]
    pub project: Vec<String>,

    /// Evaluation context
    #[arg(long, global = true)]
    pub context: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Profile to use instead of the active one (also IZ_PROFILE)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Print resolved configuration and diagnostics to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputArg>,

    /// Color mode
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputArg {
    Table,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Global settings, paths, reset and diagnostics
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Profile management
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Clear the token of a session (the entry is kept)
    Logout {
        /// Session name (defaults to the current session)
        name: Option<String>,
    },

    /// Show version and build information
    Version,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a global configuration value
    Set {
        /// Key: timeout, verbose, output-format or color
        key: String,
        /// Value to store
        value: String,
    },

    /// Get a global configuration value and its source
    Get {
        /// Key: timeout, verbose, output-format or color
        key: String,
    },

    /// Remove a global configuration value from config.yaml
    Unset {
        /// Key: timeout, verbose, output-format or color
        key: String,
    },

    /// List global configuration values
    List,

    /// Show the config and session file locations
    Path,

    /// Back up and delete config.yaml and sessions.yaml
    Reset {
        /// Do not ask for confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Explain the effective configuration, credentials and endpoint
    Explain {
        /// Client id to use instead of stored client keys
        #[arg(long = "client-id", id = "client-id")]
        client_id: Option<String>,

        /// Client secret to use instead of stored client keys
        #[arg(long = "client-secret", id = "client-secret")]
        client_secret: Option<String>,

        /// Worker endpoint to use
        #[arg(long)]
        worker: Option<String>,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List profiles
    List,

    /// Show the profile in effect
    Current,

    /// Make a profile active
    Use {
        /// Profile name
        name: String,
    },

    /// Create a profile from --url, --tenant, --project, --context and --insecure
    Add {
        /// Profile name
        name: String,

        /// Separate URL for client-facing evaluation calls
        #[arg(long)]
        client_base_url: Option<String>,

        /// Session to reference
        #[arg(long)]
        session: Option<String>,

        /// Make the new profile active
        #[arg(long)]
        activate: bool,
    },

    /// Delete a profile
    Delete {
        /// Profile name
        name: String,

        /// Do not ask for confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Show a profile's settings
    Show {
        /// Profile name (defaults to the profile in effect)
        name: Option<String>,
    },

    /// Change a setting of the profile in effect (empty value clears it)
    Set {
        /// Key: leader-url, client-base-url, tenant, project, context, session, default-worker or insecure
        key: String,
        /// Value to store
        value: String,
    },

    /// Worker endpoints of the profile in effect
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Client API keys
    ClientKeys {
        #[command(subcommand)]
        command: ClientKeysCommands,
    },
}

/// Worker subcommands
#[derive(Subcommand, Debug)]
pub enum WorkerCommands {
    /// Add a worker
    Add {
        /// Worker name
        name: String,
        /// Worker URL
        worker_url: String,
        /// Make it the profile's default worker
        #[arg(long)]
        default: bool,
    },

    /// List workers
    List,

    /// Remove a worker
    Remove {
        /// Worker name
        name: String,
    },

    /// Set the default worker
    Default {
        /// Worker name
        name: String,
    },
}

/// Client-key subcommands
#[derive(Subcommand, Debug)]
pub enum ClientKeysCommands {
    /// Store a client id/secret for the tenant (and --project, if given)
    Add {
        #[arg(long = "client-id", id = "new-client-id")]
        client_id: String,

        #[arg(long = "client-secret", id = "new-client-secret")]
        client_secret: String,

        /// Store on the profile in effect instead of the root of config.yaml
        #[arg(long, conflicts_with = "target-worker")]
        profile_scoped: bool,

        /// Store on a worker of the profile in effect
        #[arg(long = "worker", id = "target-worker")]
        worker: Option<String>,

        /// Overwrite an existing entry without asking
        #[arg(long, short)]
        force: bool,
    },

    /// List stored client keys (secrets redacted)
    List,
}

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List sessions
    List,

    /// Show a session
    Show {
        /// Session name
        name: String,
    },

    /// Delete a session
    Delete {
        /// Session name
        name: String,

        /// Do not ask for confirmation
        #[arg(long, short)]
        force: bool,
    },
}

//! iz CLI - command-line client for a remote feature-flag service.

use clap::{CommandFactory, FromArgMatches};
use iz::cli::{
    Cli, ClientKeysCommands, Commands, ConfigCommands, ProfileCommands, SessionCommands,
    WorkerCommands,
};
use iz::commands::{self, KeyScope, NewClientKeys, Output};
use iz::config::globals::{GlobalKey, lookup_global};
use iz::config::{Documents, FlagValues, InvocationContext, OutputFormat, Resolution, resolve};
use iz::diagnostics;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

/// Filter directives for operational logging, e.g. `IZ_LOG=debug`.
const LOG_ENV: &str = "IZ_LOG";

fn main() {
    init_tracing();

    // Usage errors, including --quiet with --verbose, exit here.
    let definition = Cli::command();
    let matches = definition.clone().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let flags = FlagValues::from_matches(&definition, &matches);

    let ctx = match InvocationContext::from_process(flags) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let human = prefers_human_output(&ctx);
    if let Err(e) = run_command(cli.command, &ctx, human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Output format chosen before any resolution, so resolution errors use it too.
fn prefers_human_output(ctx: &InvocationContext) -> bool {
    let format = match ctx.flags.value("output") {
        Some(flag) => OutputFormat::parse(flag),
        None => {
            let doc = ctx.paths.load_config().unwrap_or_default();
            OutputFormat::parse(&lookup_global(&doc, &ctx.env, GlobalKey::OutputFormat).value)
        }
    };
    format.unwrap_or_default() == OutputFormat::Table
}

fn run_command(command: Commands, ctx: &InvocationContext, human: bool) -> iz::Result<()> {
    let quiet = ctx.quiet();
    let paths = &ctx.paths;

    match command {
        // These work even when the documents cannot be parsed.
        Commands::Version => output(&commands::version(), human, quiet),
        Commands::Config {
            command: ConfigCommands::Path,
        } => output(&commands::config_path(paths), human, quiet),
        Commands::Config {
            command: ConfigCommands::Reset { force },
        } => {
            let result =
                commands::config_reset(paths, force, &mut io::stdin().lock(), &mut io::stderr())?;
            output(&result, human, quiet);
        }

        Commands::Config { command } => {
            if let ConfigCommands::Explain { .. } = command {
                let mut resolution = resolve_invocation(ctx)?;
                let result = commands::config_explain(&mut resolution, &mut io::stderr())?;
                output(&result, human, quiet);
                return Ok(());
            }
            log_documents(ctx);
            match command {
                ConfigCommands::Set { key, value } => {
                    output(&commands::config_set(paths, &key, &value)?, human, quiet);
                }
                ConfigCommands::Get { key } => {
                    output(&commands::config_get(paths, &ctx.env, &key)?, human, quiet);
                }
                ConfigCommands::Unset { key } => {
                    output(&commands::config_unset(paths, &key)?, human, quiet);
                }
                ConfigCommands::List => {
                    output(&commands::config_list(paths, &ctx.env)?, human, quiet);
                }
                ConfigCommands::Path
                | ConfigCommands::Reset { .. }
                | ConfigCommands::Explain { .. } => {}
            }
        }

        Commands::Profile {
            command: ProfileCommands::Current,
        } => {
            let resolution = resolve_invocation(ctx)?;
            output(&commands::profile_current(&resolution), human, quiet);
        }
        Commands::Profile {
            command:
                ProfileCommands::ClientKeys {
                    command:
                        ClientKeysCommands::Add {
                            client_id,
                            client_secret,
                            profile_scoped,
                            worker,
                            force,
                        },
                },
        } => {
            // The tenant comes from full resolution.
            let resolution = resolve_invocation(ctx)?;
            let scope = match worker {
                Some(worker) => KeyScope::Worker(worker),
                None if profile_scoped => KeyScope::Profile,
                None => KeyScope::Root,
            };
            let keys = NewClientKeys {
                tenant: &resolution.config.tenant,
                project: ctx.flags.value("project"),
                client_id: &client_id,
                client_secret: &client_secret,
                scope,
                force,
            };
            let result = commands::client_keys_add(
                paths,
                ctx,
                &keys,
                &mut io::stdin().lock(),
                &mut io::stderr(),
            )?;
            output(&result, human, quiet);
        }
        Commands::Profile { command } => {
            log_documents(ctx);
            run_profile_command(command, ctx, human, quiet)?;
        }

        Commands::Sessions { command } => {
            log_documents(ctx);
            match command {
                SessionCommands::List => output(&commands::sessions_list(paths)?, human, quiet),
                SessionCommands::Show { name } => {
                    output(&commands::sessions_show(paths, &name)?, human, quiet);
                }
                SessionCommands::Delete { name, force } => {
                    let result = commands::sessions_delete(
                        paths,
                        &name,
                        force,
                        &mut io::stdin().lock(),
                        &mut io::stderr(),
                    )?;
                    output(&result, human, quiet);
                }
            }
        }

        Commands::Logout { name: Some(name) } => {
            log_documents(ctx);
            output(&commands::logout(paths, Some(name.as_str()), None)?, human, quiet);
        }
        Commands::Logout { name: None } => {
            let resolution = resolve_invocation(ctx)?;
            let result = commands::logout(paths, None, resolution.session_name.as_deref())?;
            output(&result, human, quiet);
        }
    }

    Ok(())
}

/// Profile commands that read and write config.yaml without resolving it.
fn run_profile_command(
    command: ProfileCommands,
    ctx: &InvocationContext,
    human: bool,
    quiet: bool,
) -> iz::Result<()> {
    let paths = &ctx.paths;
    match command {
        ProfileCommands::List => output(&commands::profile_list(paths)?, human, quiet),
        ProfileCommands::Use { name } => output(&commands::profile_use(paths, &name)?, human, quiet),
        ProfileCommands::Add {
            name,
            client_base_url,
            session,
            activate,
        } => {
            let mut profile = commands::profile_from_flags(&ctx.flags);
            profile.client_base_url = client_base_url.unwrap_or_default();
            profile.session = session.unwrap_or_default();
            output(&commands::profile_add(paths, &name, profile, activate)?, human, quiet);
        }
        ProfileCommands::Delete { name, force } => {
            let result = commands::profile_delete(
                paths,
                &name,
                force,
                &mut io::stdin().lock(),
                &mut io::stderr(),
            )?;
            output(&result, human, quiet);
        }
        ProfileCommands::Show { name } => {
            output(&commands::profile_show(paths, ctx, name.as_deref())?, human, quiet);
        }
        ProfileCommands::Set { key, value } => {
            output(&commands::profile_set(paths, ctx, &key, &value)?, human, quiet);
        }
        ProfileCommands::Worker { command } => match command {
            WorkerCommands::Add {
                name,
                worker_url,
                default,
            } => {
                let result = commands::worker_add(paths, ctx, &name, &worker_url, default)?;
                output(&result, human, quiet);
            }
            WorkerCommands::List => output(&commands::worker_list(paths, ctx)?, human, quiet),
            WorkerCommands::Remove { name } => {
                output(&commands::worker_remove(paths, ctx, &name)?, human, quiet);
            }
            WorkerCommands::Default { name } => {
                output(&commands::worker_default(paths, ctx, &name)?, human, quiet);
            }
        },
        ProfileCommands::ClientKeys {
            command: ClientKeysCommands::List,
        } => output(&commands::client_keys_list(paths)?, human, quiet),
        // Resolved in `run_command`.
        ProfileCommands::Current
        | ProfileCommands::ClientKeys {
            command: ClientKeysCommands::Add { .. },
        } => {}
    }
    Ok(())
}

/// Load and fully resolve the documents, printing diagnostics when verbose.
fn resolve_invocation(ctx: &InvocationContext) -> iz::Result<Resolution> {
    let docs = Documents::load(&ctx.paths)?;
    let resolution = resolve(ctx, &docs)?;
    if resolution.config.verbose {
        diagnostics::log_all(&mut io::stderr(), &resolution);
    }
    Ok(resolution)
}

/// Diagnostics for commands that only edit the documents.
///
/// Resolution failures are not fatal here, so a dangling session or profile
/// reference can still be repaired.
fn log_documents(ctx: &InvocationContext) {
    match Documents::load(&ctx.paths).and_then(|docs| resolve(ctx, &docs)) {
        Ok(resolution) if resolution.config.verbose => {
            diagnostics::log_all(&mut io::stderr(), &resolution);
        }
        Ok(_) => {}
        Err(e) => {
            if ctx.flags.is_explicit("verbose") {
                eprintln!("[verbose] Configuration not resolved: {}", e);
            }
            tracing::debug!(error = %e, "configuration not resolved");
        }
    }
}

/// Print output in JSON or human-readable format.
///
/// `--quiet` hides informational confirmations only.
fn output<T: Output>(result: &T, human: bool, quiet: bool) {
    if quiet && result.is_informational() {
        return;
    }
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

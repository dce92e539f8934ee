//! Command-line definition and dispatch

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::cli::commands;
use crate::cli::error::{CliError, CliResult};
use crate::config::{ConfigurationLoader, EnvironmentLoader};

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalOptions {
    /// `--config`
    pub config: Option<PathBuf>,
    /// `--env-file`
    pub env_file: Option<PathBuf>,
    /// `--provider`
    pub provider: Option<String>,
    /// `--verbose`
    pub verbose: bool,
}

impl GlobalOptions {
    /// Read the global flags from parsed arguments
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config: matches.get_one::<PathBuf>("config").cloned(),
            env_file: matches.get_one::<PathBuf>("env-file").cloned(),
            provider: matches.get_one::<String>("provider").cloned(),
            verbose: matches.get_flag("verbose"),
        }
    }
}

/// Build the clap command tree
pub fn build_cli() -> Command {
    Command::new("atlas-agent")
        .about("Conversational assistant for your ticket tracker and documentation, driven by MCP tool servers")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: ~/.atlas-agent/config.toml)"),
        )
        .arg(
            Arg::new("env-file")
                .long("env-file")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help(".env file with API keys"),
        )
        .arg(
            Arg::new("provider")
                .short('p')
                .long("provider")
                .global(true)
                .value_parser(["anthropic", "claude", "openai", "bedrock"])
                .help("Model backend, overriding MODEL_PROVIDER and the configuration"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print debug diagnostics to stderr"),
        )
        .subcommand(
            Command::new("chat")
                .about("Start an interactive session, or send one message")
                .arg(
                    Arg::new("message")
                        .short('m')
                        .long("message")
                        .value_parser(value_parser!(String))
                        .help("Send a single message instead of starting a session"),
                ),
        )
        .subcommand(
            Command::new("sources")
                .about("List configured tool sources")
                .arg(
                    Arg::new("check")
                        .long("check")
                        .action(ArgAction::SetTrue)
                        .help("Start enabled sources to report their live tool counts"),
                ),
        )
        .subcommand(Command::new("config").about("Check configuration and credentials"))
}

/// Console diagnostics go to stderr. `RUST_LOG` wins; otherwise warnings
/// only, or debug with `--verbose`, so the chat output stays readable.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "atlas_agent=debug" } else { "atlas_agent=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse the process arguments and run the selected command
pub async fn run() -> CliResult<()> {
    run_with_matches(build_cli().get_matches()).await
}

/// Run a command from already-parsed arguments
pub async fn run_with_matches(matches: ArgMatches) -> CliResult<()> {
    let options = GlobalOptions::from_matches(&matches);
    init_tracing(options.verbose);

    let env = EnvironmentLoader::new(options.env_file.as_deref())
        .with_model_provider(options.provider.clone());

    match matches.subcommand() {
        Some(("config", _)) => {
            let loader = ConfigurationLoader::new(options.config.as_deref())?;
            if commands::config::check(&loader.config, loader.config_path.as_deref(), &env)? {
                Ok(())
            } else {
                Err(CliError::ConfigError(
                    "configuration is not ready; see the report above".to_string(),
                ))
            }
        }
        Some(("sources", sub)) => {
            let loader = ConfigurationLoader::new(options.config.as_deref())?;
            commands::sources::run(&loader.config, sub.get_flag("check")).await
        }
        Some(("chat", sub)) => {
            let loader = ConfigurationLoader::new(options.config.as_deref())?;
            let message = sub.get_one::<String>("message").map(String::as_str);
            commands::chat::run(&loader.config, &env, message).await
        }
        _ => {
            let loader = ConfigurationLoader::new(options.config.as_deref())?;
            commands::chat::run(&loader.config, &env, None).await
        }
    }
}

//! Config command: check configuration and credentials without starting a conversation.

use std::path::Path;

use colored::*;

use crate::cli::error::CliResult;
use crate::config::{Configuration, EnvironmentLoader};
use crate::provider::{ProviderFactory, ProviderKind};

/// Credential variable the backend needs, and whether it is set
fn credential(kind: ProviderKind, env: &EnvironmentLoader) -> (&'static str, bool) {
    match kind {
        ProviderKind::Anthropic => ("ANTHROPIC_API_KEY", env.anthropic_api_key().is_some()),
        ProviderKind::OpenAi => ("OPENAI_API_KEY", env.openai_api_key().is_some()),
        ProviderKind::Bedrock => ("AWS_BEARER_TOKEN_BEDROCK", env.bedrock_api_key().is_some()),
    }
}

/// Report what the agent would run with.
///
/// Returns `Ok(false)` when something would stop `chat` from starting.
pub fn check(
    config: &Configuration,
    config_path: Option<&Path>,
    env: &EnvironmentLoader,
) -> CliResult<bool> {
    println!("{}", "Configuration Check".cyan().bold());
    println!("{}", "===================".cyan());

    match config_path {
        Some(path) => println!("{}", format!("Config file: {}", path.display()).green()),
        None => println!("{}", "Using default configuration".yellow()),
    }
    match env.env_file() {
        Some(path) => println!("Env file: {}", path),
        None => println!("{}", "No environment file specified".yellow()),
    }

    let mut ready = true;
    match config.validate() {
        Ok(()) => println!("{}", "✓ Configuration is valid".green()),
        Err(err) => {
            println!("{}", format!("✗ Configuration error: {:#}", err).red());
            ready = false;
        }
    }

    match ProviderFactory::resolve_kind(&config.provider, env) {
        Ok(kind) => {
            println!("Provider: {}", kind.to_string().bold());
            let (variable, present) = credential(kind, env);
            if present {
                println!("{}", format!("✓ {} is set", variable).green());
            } else {
                println!("{}", format!("✗ {} is not set", variable).red());
                ready = false;
            }
        }
        Err(err) => {
            println!("{}", format!("✗ {}", err).red());
            ready = false;
        }
    }

    println!(
        "Limits: {} rounds, wrap-up {} before, circuit breaker after {} failed rounds",
        config.execution.max_iterations,
        config.execution.wrap_up_margin,
        config.execution.max_consecutive_tool_failures
    );
    let enabled = config.tool_sources.iter().filter(|s| s.enabled).count();
    println!(
        "Tool sources: {} configured, {} enabled",
        config.tool_sources.len(),
        enabled
    );

    Ok(ready)
}

//! Sources command: show configured tool sources.

use std::time::Duration;

use colored::*;

use crate::cli::error::CliResult;
use crate::cli::utils::sources_table;
use crate::config::Configuration;
use crate::sources::ToolSourceManager;

/// Print the tool source table.
///
/// With `check`, every enabled source is started, reported with its live tool
/// count, and stopped again.
pub async fn run(config: &Configuration, check: bool) -> CliResult<()> {
    let mut manager = ToolSourceManager::new(
        config.tool_sources.clone(),
        Duration::from_secs(config.execution.tool_timeout_seconds),
    );

    if config.tool_sources.is_empty() {
        println!("{}", "No tool sources configured.".yellow());
        println!("Add [[tool_sources]] entries to the configuration file.");
        return Ok(());
    }

    if check {
        manager.start_enabled().await;
    }
    println!("{}", sources_table(&manager.status()));

    if check {
        for status in manager.status().iter().filter(|s| s.running) {
            let tools = manager.tools_of(&status.name);
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            println!("{} {}", format!("{}:", status.name).bold(), names.join(", "));
        }
        manager.stop_all().await;
    }
    Ok(())
}

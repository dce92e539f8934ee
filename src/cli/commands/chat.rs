//! Chat command: single message or interactive session.

use std::io::Write;

use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::error::{CliError, CliResult};
use crate::cli::utils::{
    display_error_with_suggestions, print_banner, print_separator, sources_table, HELP_TEXT,
};
use crate::config::{Configuration, EnvironmentLoader};
use crate::orchestration::{Agent, AgentError};

/// One line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// `quit`, `exit`, `q`
    Quit,
    /// `help`
    Help,
    /// `clear`
    Clear,
    /// `/sources`
    Sources,
    /// `/enable NAME`
    Enable(String),
    /// `/disable NAME`
    Disable(String),
    /// Blank line
    Empty,
    /// Anything else goes to the agent
    Message(String),
}

impl ReplCommand {
    /// Classify a line of input
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }

        match line.to_lowercase().as_str() {
            "quit" | "exit" | "q" | "/quit" | "/exit" => return Self::Quit,
            "help" | "/help" | "examples" => return Self::Help,
            "clear" | "/clear" => return Self::Clear,
            "/sources" => return Self::Sources,
            _ => {}
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let head = parts.next().unwrap_or_default();
        let arg = parts.next().unwrap_or_default().trim().to_string();
        match head {
            "/enable" => Self::Enable(arg),
            "/disable" => Self::Disable(arg),
            _ => Self::Message(line.to_string()),
        }
    }
}

/// Run the chat command
pub async fn run(
    config: &Configuration,
    env: &EnvironmentLoader,
    message: Option<&str>,
) -> CliResult<()> {
    if message.is_some_and(|m| m.trim().is_empty()) {
        return Err(CliError::InvalidInput("--message must not be empty".to_string()));
    }
    let mut agent = Agent::from_config(config, env).await?;
    if let Some(logger) = agent.logger() {
        debug!(path = %logger.log_file().display(), "writing transcript");
    }

    let outcome = match message {
        Some(message) => single(&mut agent, message).await,
        None => interactive(&mut agent).await,
    };

    agent.shutdown().await;
    outcome
}

async fn single(agent: &mut Agent, message: &str) -> CliResult<()> {
    let answer = ask(agent, message).await?;
    println!("{}", answer);
    Ok(())
}

async fn interactive(agent: &mut Agent) -> CliResult<()> {
    print_banner(agent.name(), agent.provider_name(), &agent.model());
    let failed: Vec<_> = agent
        .tool_source_status()
        .into_iter()
        .filter(|s| s.enabled && !s.running)
        .collect();
    for status in failed {
        println!(
            "{} tool source '{}' is not running: {}",
            "Warning:".yellow().bold(),
            status.name,
            status.last_error.unwrap_or_default()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\n\nSession interrupted. Goodbye!");
                return Ok(());
            }
        };
        let Some(line) = line else {
            println!("\nGoodbye!");
            return Ok(());
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => {
                println!("\nGoodbye!");
                return Ok(());
            }
            ReplCommand::Help => println!("{}", HELP_TEXT),
            ReplCommand::Clear => {
                agent.clear_history();
                println!("{}", "Conversation cleared.".green());
            }
            ReplCommand::Sources => println!("{}", sources_table(&agent.tool_source_status())),
            ReplCommand::Enable(name) if name.is_empty() => println!("Usage: /enable NAME"),
            ReplCommand::Disable(name) if name.is_empty() => println!("Usage: /disable NAME"),
            ReplCommand::Enable(name) => {
                print_toggle(agent.enable_tool_source(&name).await)
            }
            ReplCommand::Disable(name) => {
                print_toggle(agent.disable_tool_source(&name).await)
            }
            ReplCommand::Message(message) => match ask(agent, &message).await {
                Ok(answer) => {
                    println!();
                    print_separator();
                    println!("{}", answer);
                    print_separator();
                }
                Err(AgentError::Cancelled) => println!("{}", "Request cancelled.".yellow()),
                Err(err) => display_error_with_suggestions(&err, "the request did not complete"),
            },
        }
    }
}

/// Send one message; Ctrl-C cancels it cooperatively.
async fn ask(agent: &mut Agent, message: &str) -> Result<String, AgentError> {
    println!("\n{}", "Thinking...".dimmed());

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = agent.chat_with_cancellation(message, cancel).await;
    watcher.abort();
    result
}

fn print_toggle(result: crate::orchestration::ToggleResult) {
    if result.success {
        println!("{}", result.message.green());
    } else {
        println!("{}", result.message.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("QUIT"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("help"), ReplCommand::Help);
        assert_eq!(ReplCommand::parse("clear"), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("/sources"), ReplCommand::Sources);
    }

    #[test]
    fn test_parse_toggles() {
        assert_eq!(
            ReplCommand::parse("/enable atlassian"),
            ReplCommand::Enable("atlassian".to_string())
        );
        assert_eq!(
            ReplCommand::parse("/disable   cloud  "),
            ReplCommand::Disable("cloud".to_string())
        );
        assert_eq!(ReplCommand::parse("/enable"), ReplCommand::Enable(String::new()));
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            ReplCommand::parse("Show me my sprint tasks"),
            ReplCommand::Message("Show me my sprint tasks".to_string())
        );
        // Only exact keywords are commands
        assert_eq!(
            ReplCommand::parse("clear the backlog"),
            ReplCommand::Message("clear the backlog".to_string())
        );
    }
}

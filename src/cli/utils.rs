//! Shared display helpers for CLI commands

use colored::*;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::sources::ToolSourceStatus;

/// Width of the separators around answers
pub const SEPARATOR_WIDTH: usize = 60;

/// Example requests printed by `help`
pub const HELP_TEXT: &str = r#"
Example requests:

TICKET QUERIES:
  - "Show me my sprint tasks"
  - "What are my high priority bugs?"
  - "Search for tickets about authentication"
  - "What tickets are blocked?"
  - "Show me recently updated issues"

TICKET ACTIONS:
  - "Create a task for implementing user API"
  - "Add a comment to PROJ-123 about progress"
  - "Update PROJ-456 with new status"

DOCUMENTATION QUERIES:
  - "Search for API documentation"
  - "Find pages about deployment process"
  - "Read the page titled 'Getting Started Guide'"

DOCUMENTATION ACTIONS:
  - "Create a page documenting the new feature"
  - "Update the API guide with new endpoints"

ANALYSIS:
  - "Analyze my sprint workload"
  - "What should I prioritize this week?"

Session commands:
  /sources          show tool sources
  /enable NAME      start a tool source
  /disable NAME     stop a tool source
  clear             forget the conversation
  help              show this text
  quit, exit, q     end the session
"#;

/// Print a horizontal rule
pub fn print_separator() {
    println!("{}", "-".repeat(SEPARATOR_WIDTH).dimmed());
}

/// Print the interactive-session banner
pub fn print_banner(name: &str, provider: &str, model: &str) {
    let rule = "=".repeat(SEPARATOR_WIDTH);
    println!("\n{}", rule.cyan());
    println!("{}", format!("{} AI ASSISTANT", name.to_uppercase()).cyan().bold());
    println!("{}", rule.cyan());
    println!("Model: {} ({})", model.bold(), provider);
    println!("\nType your question or request. 'help' lists examples, 'quit' ends the session.");
    println!("Press Ctrl-C while the assistant is working to cancel the request.");
    println!("{}\n", rule.cyan());
}

/// Render tool source status as a table
pub fn sources_table(statuses: &[ToolSourceStatus]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            "Name",
            "Status",
            "Enabled",
            "Tools",
            "Transport",
            "Target",
            "Description",
        ]);

    for status in statuses {
        let state = match (&status.last_error, status.running) {
            (_, true) => "running".to_string(),
            (Some(err), false) => format!("failed: {}", err),
            (None, false) => "stopped".to_string(),
        };
        table.add_row(vec![
            status.name.clone(),
            state,
            if status.enabled { "yes" } else { "no" }.to_string(),
            status.tool_count.to_string(),
            status.transport.clone(),
            status.target.clone(),
            status.description.clone(),
        ]);
    }
    table
}

/// Display a user-friendly error message with suggestions
pub fn display_error_with_suggestions<E: std::fmt::Display>(error: &E, context: &str) {
    eprintln!("{} {}", "Error:".red().bold(), context);
    eprintln!("   {}", error.to_string().red());

    let error_str = error.to_string().to_lowercase();
    let suggestions: &[&str] = if error_str.contains("requires") && error_str.contains("to be set") {
        &[
            "Export the variable named above, or put it in a .env file passed with --env-file",
            "Use --provider to pick a backend you have credentials for",
        ]
    } else if error_str.contains("unknown model provider") {
        &["Supported providers are anthropic, openai and bedrock"]
    } else if error_str.contains("circuit") || error_str.contains("tool call failed") {
        &[
            "Run /sources to check which tool sources are running",
            "Restart a source with /disable NAME then /enable NAME",
        ]
    } else if error_str.contains("connection") || error_str.contains("request failed") {
        &[
            "Check your network connection",
            "Verify the provider base URL is reachable",
        ]
    } else if error_str.contains("session ended") {
        &["Type 'clear' to start a new conversation"]
    } else {
        &[]
    };

    if !suggestions.is_empty() {
        eprintln!("{}", "Suggestions:".blue());
        for suggestion in suggestions {
            eprintln!("   - {}", suggestion);
        }
    }
}

//! Markdown transcript of an agent session.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest tool output copied into the transcript, in bytes.
const MAX_TOOL_OUTPUT: usize = 4000;

/// Appends a human-readable markdown record of a session to a file.
///
/// Console output is left to `tracing`; this file is the durable trace a user
/// can read after the fact.
#[derive(Debug)]
pub struct Logger {
    log_file: PathBuf,
    log_level: String,
}

impl Logger {
    /// Open (creating if needed) a transcript.
    ///
    /// # Arguments
    /// * `log_file` - Path to the transcript. If None, a timestamped file in the temp directory.
    /// * `log_level` - Level recorded in the header (defaults to "info").
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir().join("atlas-agent").join(format!(
                "session_{}_{}.md",
                Utc::now().timestamp_millis(),
                std::process::id()
            )),
        };

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let logger = Self {
            log_file,
            log_level: log_level.unwrap_or("info").to_lowercase(),
        };

        if !logger.log_file.exists() {
            logger.write_header()?;
        }
        Ok(logger)
    }

    fn write_header(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        writeln!(file, "# Atlas Agent Transcript\n")?;
        writeln!(file, "Log started: {}\n", Utc::now().to_rfc3339())?;
        writeln!(file, "---\n")?;
        Ok(())
    }

    fn append(&self, content: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        file.write_all(content.as_bytes())
            .context("Failed to write to log file")
    }

    fn is_debug(&self) -> bool {
        matches!(self.log_level.as_str(), "debug" | "trace")
    }

    /// Record the start of a session.
    pub fn log_session_start(&self, agent: &str, provider: &str, model: &str) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        self.append(&format!(
            "## Session Started - {}\n\n**Agent:** {}\n**Provider:** {}\n**Model:** {}\n\n",
            now.to_rfc3339(),
            agent,
            provider,
            model
        ))?;
        debug!(path = %self.log_file.display(), "transcript session started");
        Ok(())
    }

    /// Record a user turn.
    pub fn log_user_message(&self, message: &str) -> Result<()> {
        self.append(&format!(
            "### User - {}\n\n{}\n\n",
            Utc::now().to_rfc3339(),
            message
        ))
    }

    /// Record the start of a round.
    ///
    /// # Arguments
    /// * `iteration` - 1-based round number within the session.
    /// * `tools_offered` - Names of the tools in this round's snapshot.
    /// * `snapshot_version` - Registry version the round runs against.
    pub fn log_round(
        &self,
        iteration: u32,
        tools_offered: &[&str],
        snapshot_version: u64,
    ) -> Result<()> {
        let tools = if self.is_debug() && !tools_offered.is_empty() {
            format!("**Tools:** {}\n", tools_offered.join(", "))
        } else {
            format!("**Tools:** {} offered\n", tools_offered.len())
        };
        self.append(&format!(
            "## Round {} - {}\n\n**Registry version:** {}\n{}\n",
            iteration,
            Utc::now().to_rfc3339(),
            snapshot_version,
            tools
        ))
    }

    /// Record the tools the model asked for.
    pub fn log_tool_requests(&self, requests: &[(&str, String)]) -> Result<()> {
        let mut content = format!(
            "### Tool Requests - {}\n\n",
            Utc::now().to_rfc3339()
        );
        for (name, arguments) in requests {
            content.push_str(&format!("- `{}` {}\n", name, arguments));
        }
        content.push('\n');
        self.append(&content)
    }

    /// Record one tool result.
    pub fn log_tool_result(&self, tool: &str, output: &str, is_error: bool) -> Result<()> {
        let label = if is_error { "Error" } else { "Result" };
        self.append(&format!(
            "### Tool {} - {}\n\n**Tool:** {}\n\n```\n{}\n```\n\n",
            label,
            Utc::now().to_rfc3339(),
            tool,
            clip(output, MAX_TOOL_OUTPUT)
        ))
    }

    /// Record the final answer of a turn.
    pub fn log_final_answer(&self, iteration: u32, answer: &str) -> Result<()> {
        self.append(&format!(
            "### Assistant - {}\n\n**Rounds so far:** {}\n\n{}\n\n",
            Utc::now().to_rfc3339(),
            iteration,
            answer
        ))
    }

    /// Record a tool source being enabled or disabled.
    pub fn log_source_change(&self, source: &str, action: &str, outcome: &str) -> Result<()> {
        self.append(&format!(
            "### Tool Source {} - {}\n\n**Source:** {}\n**Outcome:** {}\n\n",
            action,
            Utc::now().to_rfc3339(),
            source,
            outcome
        ))
    }

    /// Record an error that ended a turn.
    pub fn log_error(&self, error: &str) -> Result<()> {
        self.append(&format!(
            "### Error - {}\n\n**Error:** {}\n\n",
            Utc::now().to_rfc3339(),
            error
        ))
    }

    /// Record the end of the session.
    pub fn log_completion(&self, reason: &str) -> Result<()> {
        self.append(&format!(
            "### Session Completed - {}\n\n**Reason:** {}\n\n---\n\n",
            Utc::now().to_rfc3339(),
            reason
        ))
    }

    /// Transcript path
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Level recorded for this transcript
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

fn clip(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... ({} bytes truncated)", &text[..end], text.len() - end)
}

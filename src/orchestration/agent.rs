//! The agent: one conversation session plus the tool sources it can use.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::AgentError;
use super::policy::LoopPolicy;
use super::runtime::ConversationRuntime;
use super::session::ConversationSession;
use crate::config::{Configuration, EnvironmentLoader};
use crate::observability::Logger;
use crate::provider::types::{ConverseOptions, Message};
use crate::provider::{ModelProvider, ProviderFactory};
use crate::sources::{ToolSourceError, ToolSourceManager, ToolSourceStatus};

/// System prompt used when `agent.system_prompt` is not configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an assistant for a software team's ticket tracker (Jira) and \
documentation wiki (Confluence). Use the tools you are given to look things up \
and to make changes on the user's behalf.

You can:
- search tickets with JQL and list the current sprint's tasks
- create and update tickets, and add comments
- search, read, create and update documentation pages

Guidelines:
- Prefer a search before creating anything, to avoid duplicates.
- Confirm the project, issue type and summary before creating a ticket.
- Quote ticket keys and page titles exactly as the tools return them.
- When a tool fails, say so plainly and suggest what the user can check.
- Keep answers short and use lists for multiple results.";

/// Outcome of enabling or disabling a tool source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleResult {
    /// Whether the source is now in the requested state
    pub success: bool,
    /// Human-readable explanation
    pub message: String,
}

impl ToggleResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A tool-calling conversational agent.
///
/// # Example
///
/// ```ignore
/// use atlas_agent::config::{ConfigurationLoader, EnvironmentLoader};
/// use atlas_agent::orchestration::Agent;
///
/// let loader = ConfigurationLoader::new(None)?;
/// let env = EnvironmentLoader::new(None);
/// let mut agent = Agent::from_config(&loader.config, &env).await?;
/// println!("{}", agent.chat("Show me my sprint tasks").await?);
/// agent.shutdown().await;
/// ```
pub struct Agent {
    name: String,
    session_id: String,
    runtime: ConversationRuntime,
    session: ConversationSession,
    sources: ToolSourceManager,
    logger: Option<Logger>,
}

impl Agent {
    /// Build an agent from configuration, starting every enabled tool source.
    ///
    /// Sources that fail to start are logged and left stopped; the agent
    /// works without them.
    pub async fn from_config(
        config: &Configuration,
        env: &EnvironmentLoader,
    ) -> Result<Self, AgentError> {
        config
            .validate()
            .map_err(|e| AgentError::Configuration(format!("{:#}", e)))?;
        let provider = ProviderFactory::create(&config.provider, env)?;

        let logger = match Logger::new(
            Some(Path::new(&config.logging.log_file)),
            Some(&config.logging.log_level),
        ) {
            Ok(logger) => Some(logger),
            Err(err) => {
                warn!(error = %err, "transcript disabled");
                None
            }
        };

        let options = ConverseOptions::new()
            .with_max_tokens(config.provider.max_tokens)
            .with_temperature(config.provider.temperature);

        let mut builder = AgentBuilder::new(provider)
            .name(config.agent.name.clone())
            .options(options)
            .policy(LoopPolicy::from_config(config))
            .system_prompt(
                config
                    .agent
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            )
            .sources(ToolSourceManager::new(
                config.tool_sources.clone(),
                Duration::from_secs(config.execution.tool_timeout_seconds),
            ));
        if let Some(logger) = logger {
            builder = builder.logger(logger);
        }

        let mut agent = builder.build()?;
        for (name, err) in agent.sources.start_enabled().await {
            warn!(server = %name, %err, "continuing without tool source");
        }
        Ok(agent)
    }

    /// Start building an agent around `provider`
    pub fn builder(provider: Box<dyn ModelProvider>) -> AgentBuilder {
        AgentBuilder::new(provider)
    }

    /// Send a message and wait for the final answer.
    pub async fn chat(&mut self, message: &str) -> Result<String, AgentError> {
        self.chat_with_cancellation(message, CancellationToken::new())
            .await
    }

    /// Like [`Agent::chat`], but stops at the next await point once `cancel` fires.
    ///
    /// The user message stays in the history; requests and results of the
    /// interrupted round are dropped.
    pub async fn chat_with_cancellation(
        &mut self,
        message: &str,
        cancel: CancellationToken,
    ) -> Result<String, AgentError> {
        if let Some(reason) = self.session.terminated() {
            return Err(AgentError::SessionTerminated {
                reason: reason.to_string(),
            });
        }

        info!(session = %self.session_id, chars = message.len(), "user message");
        self.log(|l| l.log_user_message(message));
        self.session.push(Message::user(message));

        let result = self
            .runtime
            .run(&mut self.session, &mut self.sources, self.logger.as_ref(), &cancel)
            .await;

        if let Err(err) = &result {
            warn!(session = %self.session_id, %err, "turn ended without an answer");
            self.log(|l| l.log_error(&err.to_string()));
        }
        result
    }

    /// Forget the conversation and reset every counter.
    pub fn clear_history(&mut self) {
        self.session.reset();
        self.session_id = Uuid::new_v4().to_string();
        info!(session = %self.session_id, "history cleared");
        self.log(|l| l.log_completion("history cleared"));
    }

    /// Start a tool source; its tools are offered from the next round on.
    pub async fn enable_tool_source(&mut self, name: &str) -> ToggleResult {
        let result = match self.sources.start(name).await {
            Ok(count) => ToggleResult::ok(format!(
                "Enabled '{}' ({} tool{})",
                name,
                count,
                if count == 1 { "" } else { "s" }
            )),
            Err(ToolSourceError::NotConfigured { .. }) => {
                ToggleResult::failed(format!("No tool source named '{}' is configured", name))
            }
            Err(err) => ToggleResult::failed(format!("Could not enable '{}': {}", name, err)),
        };
        self.log(|l| l.log_source_change(name, "Enable", &result.message));
        result
    }

    /// Stop a tool source; its tools disappear from the next round on.
    pub async fn disable_tool_source(&mut self, name: &str) -> ToggleResult {
        let result = match self.sources.stop(name).await {
            Ok(()) => ToggleResult::ok(format!("Disabled '{}'", name)),
            Err(ToolSourceError::NotConfigured { .. }) => {
                ToggleResult::failed(format!("No tool source named '{}' is configured", name))
            }
            Err(err) => ToggleResult::failed(format!("Could not disable '{}': {}", name, err)),
        };
        self.log(|l| l.log_source_change(name, "Disable", &result.message));
        result
    }

    /// Status of every configured tool source
    pub fn tool_source_status(&self) -> Vec<ToolSourceStatus> {
        self.sources.status()
    }

    /// Conversation state
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// Tool sources
    pub fn sources(&self) -> &ToolSourceManager {
        &self.sources
    }

    /// Agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the current conversation; changes on `clear_history`
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Backend identifier
    pub fn provider_name(&self) -> &str {
        self.runtime.provider_name()
    }

    /// Model in use
    pub fn model(&self) -> String {
        self.runtime.model()
    }

    /// Transcript, when one is attached
    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    /// Stop every tool source.
    pub async fn shutdown(&mut self) {
        self.sources.stop_all().await;
        self.log(|l| l.log_completion("agent shut down"));
        info!(session = %self.session_id, "agent shut down");
    }

    fn log(&self, write: impl FnOnce(&Logger) -> anyhow::Result<()>) {
        if let Some(logger) = &self.logger {
            if let Err(err) = write(logger) {
                warn!(error = %err, "failed to write transcript");
            }
        }
    }
}

/// Assembles an [`Agent`] from parts; used by [`Agent::from_config`] and tests.
pub struct AgentBuilder {
    provider: Box<dyn ModelProvider>,
    name: String,
    options: ConverseOptions,
    policy: LoopPolicy,
    system_prompt: Option<String>,
    sources: Option<ToolSourceManager>,
    logger: Option<Logger>,
}

impl AgentBuilder {
    /// Builder with default options and limits, no system prompt and no sources
    pub fn new(provider: Box<dyn ModelProvider>) -> Self {
        Self {
            provider,
            name: "atlas-agent".to_string(),
            options: ConverseOptions::default(),
            policy: LoopPolicy::default(),
            system_prompt: None,
            sources: None,
            logger: None,
        }
    }

    /// Agent name used in the transcript
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Generation options
    pub fn options(mut self, options: ConverseOptions) -> Self {
        self.options = options;
        self
    }

    /// Loop limits
    pub fn policy(mut self, policy: LoopPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// System prompt placed first in the history
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Tool sources; they are not started by `build`
    pub fn sources(mut self, sources: ToolSourceManager) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Markdown transcript
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Agent, AgentError> {
        let tool_timeout = self.policy.tool_timeout;
        let runtime = ConversationRuntime::new(self.provider, self.options, self.policy)?;
        let session_id = Uuid::new_v4().to_string();

        if let Some(logger) = &self.logger {
            let model = runtime.model();
            if let Err(err) = logger.log_session_start(&self.name, runtime.provider_name(), &model) {
                warn!(error = %err, "failed to write transcript");
            }
        }

        Ok(Agent {
            name: self.name,
            session_id,
            runtime,
            session: ConversationSession::with_system_prompt(self.system_prompt.as_deref()),
            sources: self
                .sources
                .unwrap_or_else(|| ToolSourceManager::new(Vec::new(), tool_timeout)),
            logger: self.logger,
        })
    }
}

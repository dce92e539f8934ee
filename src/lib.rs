//! Atlas Agent - a tool-calling conversational agent
//!
//! The agent talks to a hosted language model (Anthropic, any OpenAI-compatible
//! service, or AWS Bedrock) and lets it call tools published by external MCP
//! servers, for example ticket-tracker and documentation search. Tool servers
//! can be started and stopped in the middle of a conversation.
//!
//! Modules are feature-gated:
//!
//! - **`config`** - TOML configuration and environment loading
//! - **`observability`** - markdown session transcripts
//! - **`provider`** - the [`provider::ModelProvider`] trait and one adapter per backend
//! - **`registry`** - the merged, versioned tool table
//! - **`sources`** - stdio and HTTP tool sources and their lifecycle
//! - **`orchestration`** - the conversation loop and the [`orchestration::Agent`]
//! - **`cli`** - the `atlas-agent` binary
//!
//! # Example
//!
//! ```ignore
//! use atlas_agent::config::{ConfigurationLoader, EnvironmentLoader};
//! use atlas_agent::orchestration::Agent;
//!
//! let loader = ConfigurationLoader::new(None)?;
//! let env = EnvironmentLoader::new(None);
//! let mut agent = Agent::from_config(&loader.config, &env).await?;
//!
//! let answer = agent.chat("What are my high priority bugs?").await?;
//! println!("{}", answer);
//!
//! agent.disable_tool_source("atlassian").await;
//! for status in agent.tool_source_status() {
//!     println!("{}: running={} tools={}", status.name, status.running, status.tool_count);
//! }
//! agent.shutdown().await;
//! ```

#![warn(missing_docs)]

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Session transcripts (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Model backends (enabled with the `provider` feature)
#[cfg(feature = "provider")]
pub mod provider;

/// Tool registry (enabled with the `registry` feature)
#[cfg(feature = "registry")]
pub mod registry;

/// Tool sources (enabled with the `sources` feature)
#[cfg(feature = "sources")]
pub mod sources;

/// Conversation orchestration (enabled with the `orchestration` feature)
#[cfg(feature = "orchestration")]
pub mod orchestration;

/// Command-line host (enabled with the `cli` feature)
#[cfg(feature = "cli")]
pub mod cli;

/// Prelude module for convenient imports
pub mod prelude {
    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, EnvironmentLoader};

    #[cfg(feature = "observability")]
    pub use crate::observability::Logger;

    #[cfg(feature = "provider")]
    pub use crate::provider::{
        ConverseOptions, Message, ModelOutcome, ModelProvider, ProviderError, ProviderFactory,
        ProviderKind, ToolInvocationRequest, ToolInvocationResult, ToolSchema,
    };

    #[cfg(feature = "registry")]
    pub use crate::registry::{ToolRegistry, ToolSnapshot};

    #[cfg(feature = "sources")]
    pub use crate::sources::{ToolSource, ToolSourceError, ToolSourceManager, ToolSourceStatus};

    #[cfg(feature = "orchestration")]
    pub use crate::orchestration::{Agent, AgentError, LoopPolicy, ToggleResult};
}

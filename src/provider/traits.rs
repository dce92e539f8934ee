//! Model provider abstraction for multi-backend support.
//!
//! This module defines the core provider trait that hides vendor-specific wire
//! formats, so the orchestrator drives Anthropic, OpenAI-compatible services and
//! Bedrock through one interface.

use crate::provider::error::ProviderError;
use crate::provider::types::{ConverseOptions, Message, ToolInvocationRequest, ToolSchema};

/// Outcome of a single model round-trip
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutcome {
    /// The model answered in text; the turn is over
    FinalText(String),
    /// The model wants these tools run before it continues
    ToolRequests(Vec<ToolInvocationRequest>),
}

/// Core trait that all model backends implement
///
/// # Example
///
/// ```ignore
/// use atlas_agent::provider::{ModelOutcome, ModelProvider, ConverseOptions, Message};
///
/// async fn ask(provider: &dyn ModelProvider) -> Result<(), ProviderError> {
///     let history = vec![Message::user("Show me my sprint tasks")];
///     match provider.converse(&history, &[], &ConverseOptions::default()).await? {
///         ModelOutcome::FinalText(text) => println!("{}", text),
///         ModelOutcome::ToolRequests(calls) => println!("{} tool calls", calls.len()),
///     }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the history and the tools on offer, get back text or tool requests.
    ///
    /// When the backend returns several tool-call directives in one reply,
    /// every one of them is surfaced in [`ModelOutcome::ToolRequests`].
    async fn converse(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> Result<ModelOutcome, ProviderError>;

    /// Provider identifier for logging (e.g. "anthropic", "openai")
    fn provider_name(&self) -> &str;

    /// Model used when `ConverseOptions::model` is unset
    fn default_model(&self) -> String;
}

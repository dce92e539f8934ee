//! Errors that end a conversation turn.

use thiserror::Error;

use crate::provider::ProviderError;

/// Why [`crate::orchestration::Agent::chat`] did not produce an answer.
///
/// Tool failures never appear here; they are fed back to the model as error
/// results and only surface through [`AgentError::CircuitBreaker`].
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid configuration, unknown backend or missing credentials
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The model backend kept failing after every retry
    #[error("model provider failed after {attempts} attempt(s): {source}")]
    Provider {
        /// Calls made, including the first
        attempts: u32,
        /// Last error seen
        #[source]
        source: ProviderError,
    },

    /// Every tool call failed for too many rounds in a row
    #[error(
        "stopped after {failures} consecutive rounds in which every tool call failed \
         (limit {ceiling}). Check the tool sources with /sources; a source may have \
         crashed or lost its credentials"
    )]
    CircuitBreaker {
        /// Consecutive all-failed rounds
        failures: u32,
        /// Configured ceiling
        ceiling: u32,
    },

    /// The model used every round without producing an answer
    #[error(
        "no final answer after {max_iterations} model rounds. The request may be too \
         broad, or the model keeps calling tools without converging. Narrow the \
         request or raise execution.max_iterations"
    )]
    BudgetExhausted {
        /// Configured round budget
        max_iterations: u32,
    },

    /// The turn was interrupted through its cancellation token
    #[error("request cancelled")]
    Cancelled,

    /// An earlier turn ended the session
    #[error("session ended ({reason}); clear the history to start a new conversation")]
    SessionTerminated {
        /// What ended it
        reason: String,
    },
}

impl AgentError {
    /// Whether this error ends the session until `clear_history`
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CircuitBreaker { .. } | Self::BudgetExhausted { .. }
        )
    }
}

impl From<ProviderError> for AgentError {
    fn from(err: ProviderError) -> Self {
        if err.is_configuration() {
            Self::Configuration(err.to_string())
        } else {
            Self::Provider {
                attempts: 1,
                source: err,
            }
        }
    }
}

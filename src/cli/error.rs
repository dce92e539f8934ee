//! Error types for CLI operations

use thiserror::Error;

use crate::orchestration::AgentError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a CLI command
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The agent could not be built or a turn failed
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Terminal I/O failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid argument or input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::ConfigError(format!("{:#}", err))
    }
}

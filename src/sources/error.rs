//! Error types for tool sources and their lifecycle.

use thiserror::Error;

/// Errors raised while starting, stopping or invoking a tool source.
///
/// Only [`ToolSourceError::Unavailable`] and [`ToolSourceError::NotConfigured`]
/// reach callers of the lifecycle API; during a conversation every other
/// variant is turned into an error result for the model.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    /// No source with this name is configured
    #[error("tool source '{server}' is not configured")]
    NotConfigured {
        /// Source name
        server: String,
    },

    /// The source could not be started
    #[error("tool source '{server}' is unavailable: {reason}")]
    Unavailable {
        /// Source name
        server: String,
        /// What went wrong
        reason: String,
    },

    /// The source serving this tool is not running
    #[error("tool source '{server}' is not running")]
    NotRunning {
        /// Source name
        server: String,
    },

    /// No running source offers this tool
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    /// The child process could not be spawned
    #[error("failed to spawn tool source '{server}': {source}")]
    Spawn {
        /// Source name
        server: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Pipe or HTTP failure
    #[error("tool source '{server}' transport error: {message}")]
    Transport {
        /// Source name
        server: String,
        /// Details
        message: String,
    },

    /// A message could not be encoded or decoded
    #[error("tool source '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        /// Source name
        server: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// JSON-RPC error object in the response
    #[error("tool source '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        /// Source name
        server: String,
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// The tool ran and reported failure (`isError: true`)
    #[error("tool '{tool}' failed: {message}")]
    ToolFailed {
        /// Tool name
        tool: String,
        /// Text the tool returned
        message: String,
    },

    /// The child process exited while requests were pending
    #[error("tool source '{server}' terminated unexpectedly")]
    Terminated {
        /// Source name
        server: String,
    },

    /// An operation did not complete in time
    #[error("tool source '{server}' timed out after {seconds}s during {operation}")]
    Timeout {
        /// Source name
        server: String,
        /// What was being attempted
        operation: String,
        /// Configured limit
        seconds: u64,
    },
}

impl ToolSourceError {
    pub(crate) fn transport(server: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            server: server.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unavailable(server: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            server: server.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ToolSourceError::Timeout {
            server: "atlassian".to_string(),
            operation: "tools/call search_tickets".to_string(),
            seconds: 60,
        };
        assert_eq!(
            err.to_string(),
            "tool source 'atlassian' timed out after 60s during tools/call search_tickets"
        );

        let err = ToolSourceError::unavailable("cloud", "connection refused");
        assert!(err.to_string().contains("unavailable"));
    }
}

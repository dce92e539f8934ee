//! Error types for the tool registry.

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The tool name is invalid (empty or contains invalid characters).
    #[error("Invalid tool name '{name}' from source '{source_name}': must be 1-64 alphanumeric characters, underscores, or hyphens")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Source that published it.
        source_name: String,
    },

    /// No tools are registered under this source name.
    #[error("Tool source '{0}' is not registered")]
    UnknownSource(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::InvalidName {
            name: "bad name!".to_string(),
            source_name: "jira".to_string(),
        };
        assert!(err.to_string().contains("bad name!"));
        assert!(err.to_string().contains("jira"));

        let err = RegistryError::UnknownSource("cloud".to_string());
        assert!(err.to_string().contains("cloud"));
    }
}

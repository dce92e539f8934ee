//! Error types for model providers.

use thiserror::Error;

/// Errors raised while constructing or calling a model backend
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The configured backend identifier is not recognised
    #[error("unknown model provider '{0}' (supported: anthropic, openai, bedrock)")]
    UnknownProvider(String),

    /// Credentials for the selected backend are missing
    #[error("{provider} provider requires {variable} to be set")]
    MissingCredentials {
        /// Backend name
        provider: String,
        /// Environment variable that must hold the credential
        variable: String,
    },

    /// Generation options rejected before sending
    #[error("invalid generation options: {0}")]
    InvalidOptions(String),

    /// Network-level failure
    #[error("{provider} request failed: {source}")]
    Http {
        /// Backend name
        provider: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// Backend answered with a non-success status
    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        /// Backend name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Backend answered with something we could not interpret
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse {
        /// Backend name
        provider: String,
        /// What was wrong
        message: String,
    },

    /// The model call exceeded `provider.timeout_seconds`
    #[error("{provider} did not answer within {seconds}s")]
    Timeout {
        /// Backend name
        provider: String,
        /// Configured limit
        seconds: u64,
    },
}

impl ProviderError {
    /// Build an [`ProviderError::Http`] for the given backend
    pub fn http(provider: &str, source: reqwest::Error) -> Self {
        Self::Http {
            provider: provider.to_string(),
            source,
        }
    }

    /// Build an [`ProviderError::InvalidResponse`] for the given backend
    pub fn invalid_response(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Build a [`ProviderError::MissingCredentials`] for the given backend
    pub fn missing_credentials(provider: &str, variable: &str) -> Self {
        Self::MissingCredentials {
            provider: provider.to_string(),
            variable: variable.to_string(),
        }
    }

    /// Whether the same request may succeed if retried.
    ///
    /// Transport failures, timeouts, 429 and 5xx are transient; everything
    /// else (bad credentials, malformed requests) will fail again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Whether this error belongs to the construction-time configuration class
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_) | Self::MissingCredentials { .. } | Self::InvalidOptions(_)
        )
    }
}

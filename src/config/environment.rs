//! Environment variable loading and management.
//!
//! Credentials never live in the TOML file; they are read from the process
//! environment, optionally seeded from a `.env` file.

use std::env;
use std::path::Path;

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentLoader {
    env_file: Option<String>,
    provider_override: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to a .env file. Only an explicit path is loaded so
    ///   tests never pick up a stray `.env` from the working directory.
    pub fn new(env_file: Option<&Path>) -> Self {
        if let Some(path) = env_file {
            if path.exists() {
                if let Err(e) = dotenv::from_path(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load .env file");
                }
            } else {
                tracing::debug!(path = %path.display(), ".env file not found, skipping");
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
            provider_override: None,
        }
    }

    /// Force the backend selection, taking precedence over `MODEL_PROVIDER`
    /// (the `--provider` command-line flag).
    pub fn with_model_provider(mut self, kind: Option<String>) -> Self {
        self.provider_override = kind.filter(|k| !k.trim().is_empty());
        self
    }

    /// The .env file this loader was created with
    pub fn env_file(&self) -> Option<&str> {
        self.env_file.as_deref()
    }

    /// Backend selection override (`MODEL_PROVIDER`)
    pub fn model_provider(&self) -> Option<String> {
        self.provider_override
            .clone()
            .or_else(|| non_empty("MODEL_PROVIDER"))
    }

    /// Model override (`MODEL_NAME`)
    pub fn model_name(&self) -> Option<String> {
        non_empty("MODEL_NAME")
    }

    /// `ANTHROPIC_API_KEY`
    pub fn anthropic_api_key(&self) -> Option<String> {
        non_empty("ANTHROPIC_API_KEY")
    }

    /// `OPENAI_API_KEY`
    pub fn openai_api_key(&self) -> Option<String> {
        non_empty("OPENAI_API_KEY")
    }

    /// `OPENAI_BASE_URL`, for OpenAI-compatible services
    pub fn openai_base_url(&self) -> Option<String> {
        non_empty("OPENAI_BASE_URL")
    }

    /// `AWS_BEARER_TOKEN_BEDROCK`
    pub fn bedrock_api_key(&self) -> Option<String> {
        non_empty("AWS_BEARER_TOKEN_BEDROCK")
    }

    /// `AWS_REGION`
    pub fn aws_region(&self) -> Option<String> {
        non_empty("AWS_REGION")
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

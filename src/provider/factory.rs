//! Provider factory for creating model backends from configuration.
//!
//! Backend selection is a pure function of one identifier: `MODEL_PROVIDER`
//! when set, else `provider.kind`. Unknown identifiers and missing
//! credentials are reported here, before any conversation starts.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::{EnvironmentLoader, ProviderConfig};
use crate::provider::adapters::{AnthropicProvider, BedrockProvider, OpenAiProvider};
use crate::provider::error::ProviderError;
use crate::provider::traits::ModelProvider;

/// The supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions or a compatible service
    OpenAi,
    /// AWS Bedrock Converse API
    Bedrock,
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" | "openai-compatible" => Ok(ProviderKind::OpenAi),
            "bedrock" | "aws-bedrock" => Ok(ProviderKind::Bedrock),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Bedrock => "bedrock",
        };
        f.write_str(name)
    }
}

/// Factory for creating model providers
pub struct ProviderFactory;

impl ProviderFactory {
    /// Resolve which backend the configuration selects
    pub fn resolve_kind(
        config: &ProviderConfig,
        env: &EnvironmentLoader,
    ) -> Result<ProviderKind, ProviderError> {
        env.model_provider()
            .unwrap_or_else(|| config.kind.clone())
            .parse()
    }

    /// Create the provider selected by `config` and the environment
    ///
    /// # Returns
    /// A boxed provider, or a configuration-class [`ProviderError`]
    pub fn create(
        config: &ProviderConfig,
        env: &EnvironmentLoader,
    ) -> Result<Box<dyn ModelProvider>, ProviderError> {
        let kind = Self::resolve_kind(config, env)?;
        let model = env.model_name().or_else(|| config.model.clone());
        debug!(provider = %kind, model = ?model, "Creating model provider");

        let provider: Box<dyn ModelProvider> = match kind {
            ProviderKind::Anthropic => Box::new(AnthropicProvider::new(
                env.anthropic_api_key(),
                config.base_url.clone(),
                model,
            )?),
            ProviderKind::OpenAi => Box::new(OpenAiProvider::new(
                env.openai_api_key(),
                env.openai_base_url().or_else(|| config.base_url.clone()),
                model,
            )?),
            ProviderKind::Bedrock => Box::new(BedrockProvider::new(
                env.bedrock_api_key(),
                env.aws_region().or_else(|| config.region.clone()),
                config.base_url.clone(),
                model,
            )?),
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("bedrock".parse::<ProviderKind>().unwrap(), ProviderKind::Bedrock);
        assert!(matches!(
            "gemini".parse::<ProviderKind>(),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_unknown_kind_fails_fast() {
        let env = EnvironmentLoader::default().with_model_provider(Some("mystery".to_string()));
        let err = ProviderFactory::create(&ProviderConfig::default(), &env)
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::UnknownProvider(ref k) if k == "mystery"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_flag_overrides_config_kind() {
        let env = EnvironmentLoader::default().with_model_provider(Some("bedrock".to_string()));
        let kind = ProviderFactory::resolve_kind(&ProviderConfig::default(), &env).unwrap();
        assert_eq!(kind, ProviderKind::Bedrock);
    }
}

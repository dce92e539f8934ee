//! Options for a single model round-trip.

use serde::{Deserialize, Serialize};

use crate::provider::error::ProviderError;

/// Options passed to every `converse` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverseOptions {
    /// Model to use (None = adapter default)
    pub model: Option<String>,
    /// Caps the response length
    pub max_tokens: u32,
    /// Sampling randomness, must be >= 0
    pub temperature: f32,
}

impl ConverseOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self {
            model: None,
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), ProviderError> {
        if !(self.temperature >= 0.0) {
            return Err(ProviderError::InvalidOptions(format!(
                "temperature must be >= 0.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ProviderError::InvalidOptions(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ConverseOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = ConverseOptions::new()
            .with_model("gpt-4o")
            .with_temperature(0.5)
            .with_max_tokens(2000);

        assert_eq!(options.model.as_deref(), Some("gpt-4o"));
        assert_eq!(options.temperature, 0.5);
        assert_eq!(options.max_tokens, 2000);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_validation() {
        assert!(ConverseOptions::new().with_temperature(-0.1).validate().is_err());
        assert!(ConverseOptions::new().with_temperature(f32::NAN).validate().is_err());
        assert!(ConverseOptions::new().with_max_tokens(0).validate().is_err());
        // No upper bound on temperature; backends clamp on their side.
        assert!(ConverseOptions::new().with_temperature(1.5).validate().is_ok());
    }
}

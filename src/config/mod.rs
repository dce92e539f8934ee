//! Configuration management.
//!
//! This module provides configuration loading through TOML files and
//! environment variable management via `.env` files.
//!
//! # Example
//!
//! ```no_run
//! use atlas_agent::config::{ConfigurationLoader, EnvironmentLoader};
//! use std::path::Path;
//!
//! // Load environment variables
//! let env = EnvironmentLoader::new(Some(Path::new(".env")));
//!
//! // Load configuration from TOML
//! let config_loader = ConfigurationLoader::new(Some(Path::new("config/agent.toml"))).unwrap();
//! let config = &config_loader.config;
//!
//! println!("Max iterations: {}", config.execution.max_iterations);
//! println!("Provider override: {:?}", env.model_provider());
//! ```

#[allow(clippy::module_inception)]
pub mod config;
pub mod environment;

// Re-export main types for convenience
pub use self::config::{
    AgentConfig, Configuration, ConfigurationLoader, ExecutionConfig, LoggingConfig,
    ProviderConfig, ToolSourceConfig, TransportConfig,
};
pub use self::environment::EnvironmentLoader;

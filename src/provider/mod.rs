//! Model provider abstraction module
//!
//! This module provides the provider trait, the per-vendor adapters and the
//! factory that picks one from configuration.

pub mod adapters;
pub mod error;
pub mod factory;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::ProviderError;
pub use factory::{ProviderFactory, ProviderKind};
pub use traits::{ModelOutcome, ModelProvider};
pub use types::{
    ConverseOptions, Message, MessageContent, MessageRole, ToolInvocationRequest,
    ToolInvocationResult, ToolSchema,
};

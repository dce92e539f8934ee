//! Provider module types

pub mod message;
pub mod options;
pub mod tools;

pub use message::{Message, MessageContent, MessageRole};
pub use options::ConverseOptions;
pub use tools::{ToolInvocationRequest, ToolInvocationResult, ToolSchema};

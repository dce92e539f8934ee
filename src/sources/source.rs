//! The tool source abstraction.

use async_trait::async_trait;
use serde_json::Value;

use super::ToolSourceError;
use crate::provider::types::ToolSchema;

/// A process or service exposing a named set of callable tools.
///
/// Implementations take `&self` everywhere so that one source can serve
/// several invocations of the same round at once.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Connect (spawning a process if needed) and list the published tools.
    async fn start(&self) -> Result<Vec<ToolSchema>, ToolSourceError>;

    /// Invoke one tool and return its text output.
    async fn invoke(&self, tool: &str, arguments: Value) -> Result<String, ToolSourceError>;

    /// Tear down the connection. Must be safe to call more than once.
    async fn stop(&self);

    /// Whether the source is still reachable after a successful start.
    fn is_alive(&self) -> bool {
        true
    }
}

//! Immutable view of the registry handed to a single round.

use std::sync::Arc;

use super::RegisteredTool;
use crate::provider::types::ToolSchema;

/// The tool table as it stood at `version`.
///
/// Cloning is cheap (one `Arc` bump). Later registry mutations produce a new
/// snapshot and never touch this one.
#[derive(Debug, Clone)]
pub struct ToolSnapshot {
    version: u64,
    tools: Arc<[RegisteredTool]>,
}

impl ToolSnapshot {
    pub(crate) fn new(version: u64, tools: Vec<RegisteredTool>) -> Self {
        Self {
            version,
            tools: tools.into(),
        }
    }

    /// Registry version this snapshot was taken at
    pub fn version(&self) -> u64 {
        self.version
    }

    /// All tools, in registration order
    pub fn tools(&self) -> &[RegisteredTool] {
        &self.tools
    }

    /// Find a tool by name
    pub fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Schemas to offer the model
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    /// Number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are available
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolSnapshot {
    fn default() -> Self {
        Self::new(0, Vec::new())
    }
}

//! Registered tool wrapper with source tracking.

use serde::{Deserialize, Serialize};

use crate::provider::types::ToolSchema;

/// A tool schema together with the source that published it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredTool {
    /// The wrapped schema.
    schema: ToolSchema,

    /// Name of the tool source that serves this tool.
    origin: String,
}

impl RegisteredTool {
    /// Create a new registered tool.
    pub fn new(schema: ToolSchema, origin: impl Into<String>) -> Self {
        Self {
            schema,
            origin: origin.into(),
        }
    }

    /// Get a reference to the wrapped schema.
    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Consume self and return the wrapped schema.
    pub fn into_schema(self) -> ToolSchema {
        self.schema
    }

    /// Name of the source serving this tool.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Get the tool name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Get the tool description.
    pub fn description(&self) -> &str {
        &self.schema.description
    }
}

/// A name clash between two sources, resolved in favour of `winner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolCollision {
    /// The contested tool name.
    pub tool: String,
    /// Source whose definition is offered to the model (registered later).
    pub winner: String,
    /// Source whose definition is hidden.
    pub shadowed: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registered_tool() {
        let tool = RegisteredTool::new(
            ToolSchema::new("search_pages", "Search Confluence", json!({"type": "object"})),
            "atlassian",
        );

        assert_eq!(tool.name(), "search_pages");
        assert_eq!(tool.description(), "Search Confluence");
        assert_eq!(tool.origin(), "atlassian");
        assert_eq!(tool.into_schema().name, "search_pages");
    }
}

//! Tool abstraction for provider-agnostic tool definitions.
//!
//! This module defines the internal tool format that abstracts away provider-specific
//! tool calling formats (OpenAI's function calling, Anthropic's tool use, Bedrock's
//! `toolSpec`), plus the request/result pair exchanged during a round.

use serde::{Deserialize, Serialize};

/// Provider-agnostic tool definition
///
/// This represents a tool that can be called by the model, with a name,
/// description, and JSON Schema for parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (unique within the registry)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolSchema {
    /// Create a new tool definition
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Parameter schema with a guaranteed `"type": "object"` root.
    ///
    /// Some tool servers publish `{}` or `null` for parameterless tools; every
    /// backend rejects those, so adapters send this instead.
    pub fn object_parameters(&self) -> serde_json::Value {
        match &self.parameters {
            serde_json::Value::Object(map) if map.contains_key("type") => self.parameters.clone(),
            serde_json::Value::Object(map) => {
                let mut map = map.clone();
                map.insert("type".to_string(), serde_json::json!("object"));
                serde_json::Value::Object(map)
            }
            _ => serde_json::json!({ "type": "object", "properties": {} }),
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Backend-assigned identifier, echoed back in the matching result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments as a JSON value (already parsed)
    pub arguments: serde_json::Value,
    /// Set when the backend sent arguments that are not valid JSON. The raw
    /// text is kept in `arguments` as a string and the call is never dispatched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_error: Option<String>,
}

impl ToolInvocationRequest {
    /// Create a new invocation request
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            argument_error: None,
        }
    }

    /// A request whose arguments could not be parsed
    pub fn malformed(
        id: impl Into<String>,
        name: impl Into<String>,
        raw: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: serde_json::Value::String(raw.into()),
            argument_error: Some(error.into()),
        }
    }
}

/// Result from a tool invocation, paired 1:1 with a [`ToolInvocationRequest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    /// ID of the request this is a result for
    pub id: String,
    /// Tool output, or the error text when `is_error` is set
    pub content: String,
    /// Whether this is an error result
    pub is_error: bool,
}

impl ToolInvocationResult {
    /// Create a successful tool result
    pub fn success(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_parameters_passthrough() {
        let schema = ToolSchema::new(
            "search_tickets",
            "Search tickets",
            json!({"type": "object", "properties": {"jql": {"type": "string"}}}),
        );
        assert_eq!(schema.object_parameters(), schema.parameters);
    }

    #[test]
    fn test_object_parameters_fills_missing_type() {
        let schema = ToolSchema::new("ping", "Ping", json!({"properties": {}}));
        assert_eq!(schema.object_parameters()["type"], "object");

        let schema = ToolSchema::new("ping", "Ping", serde_json::Value::Null);
        assert_eq!(
            schema.object_parameters(),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_malformed_request_keeps_raw_text() {
        let request = ToolInvocationRequest::malformed("c1", "get_issue", "{\"key\": ABC-1", "expected value");
        assert_eq!(request.arguments, json!("{\"key\": ABC-1"));
        assert_eq!(request.argument_error.as_deref(), Some("expected value"));

        let wire = serde_json::to_value(ToolInvocationRequest::new("c2", "ping", json!({}))).unwrap();
        assert!(wire.get("argument_error").is_none());
    }

    #[test]
    fn test_result_constructors() {
        let ok = ToolInvocationResult::success("call_1", "Found 1 issue");
        assert!(!ok.is_error);
        assert_eq!(ok.id, "call_1");

        let err = ToolInvocationResult::error("call_2", "HTTP 401");
        assert!(err.is_error);
        assert_eq!(err.content, "HTTP 401");
    }
}

//! MCP JSON-RPC 2.0 conversation shared by the stdio and HTTP transports.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::ToolSourceError;
use crate::provider::types::ToolSchema;

pub(crate) const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `tools/list` pages, guarding against cursor loops.
const MAX_LIST_PAGES: usize = 50;

/// A request/response channel to one MCP server.
#[async_trait]
pub(crate) trait RpcChannel: Send + Sync {
    /// Source name for errors and logs
    fn server(&self) -> &str;

    /// Send a request and return its `result` member
    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolSourceError>;

    /// Send a notification (no response expected)
    async fn notify(&self, method: &str, params: Value) -> Result<(), ToolSourceError>;

    /// Continue with `tools/list` when `initialize` fails; some HTTP servers skip it
    fn lenient_handshake(&self) -> bool {
        false
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ListedTool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// `initialize`, `notifications/initialized`, then every page of `tools/list`.
pub(crate) async fn handshake(channel: &dyn RpcChannel) -> Result<Vec<ToolSchema>, ToolSourceError> {
    let params = json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    });

    match channel.request("initialize", params).await {
        Ok(result) => {
            let protocol = result.get("protocolVersion").and_then(|v| v.as_str());
            debug!(server = channel.server(), protocol, "tool source initialized");
            channel.notify("notifications/initialized", json!({})).await?;
        }
        Err(err) if channel.lenient_handshake() => {
            warn!(server = channel.server(), %err, "initialize failed, continuing with tools/list");
        }
        Err(err) => return Err(err),
    }

    list_tools(channel).await
}

/// Collect every page of `tools/list`.
pub(crate) async fn list_tools(channel: &dyn RpcChannel) -> Result<Vec<ToolSchema>, ToolSourceError> {
    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..MAX_LIST_PAGES {
        let params = match &cursor {
            Some(c) => json!({ "cursor": c }),
            None => json!({}),
        };
        let result = channel.request("tools/list", params).await?;
        let page: ToolsListResult =
            serde_json::from_value(result).map_err(|source| ToolSourceError::InvalidJson {
                server: channel.server().to_string(),
                source,
            })?;

        tools.extend(page.tools.into_iter().map(|t| {
            ToolSchema::new(
                t.name,
                t.description.unwrap_or_default(),
                t.input_schema.unwrap_or_else(|| json!({ "type": "object" })),
            )
        }));

        match page.next_cursor {
            Some(next) if !next.is_empty() => cursor = Some(next),
            _ => return Ok(tools),
        }
    }

    warn!(server = channel.server(), pages = MAX_LIST_PAGES, "tools/list pagination truncated");
    Ok(tools)
}

/// `tools/call`, flattening the text content of the result.
pub(crate) async fn call_tool(
    channel: &dyn RpcChannel,
    tool: &str,
    arguments: Value,
) -> Result<String, ToolSourceError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    let result = channel
        .request("tools/call", json!({ "name": tool, "arguments": arguments }))
        .await?;
    parse_call_result(tool, &result)
}

/// Extract the text content of a `tools/call` result; `isError` becomes an error.
pub(crate) fn parse_call_result(tool: &str, result: &Value) -> Result<String, ToolSourceError> {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let text = match result.get("content") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item.get("type").and_then(Value::as_str) {
                Some("text") => item.get("text").and_then(Value::as_str).map(String::from),
                Some(_) => Some(item.to_string()),
                None => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
        None => result
            .get("structuredContent")
            .map(Value::to_string)
            .unwrap_or_default(),
    };

    if is_error {
        Err(ToolSourceError::ToolFailed {
            tool: tool.to_string(),
            message: text,
        })
    } else {
        Ok(text)
    }
}

/// Turn a JSON-RPC `error` member into [`ToolSourceError::Rpc`].
pub(crate) fn rpc_error(server: &str, error: &Value) -> ToolSourceError {
    ToolSourceError::Rpc {
        server: server.to_string(),
        code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    }
}

//! Tool source reached over HTTP: JSON-RPC requests POSTed to `<url>/message`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::rpc::{self, RpcChannel};
use super::{ToolSource, ToolSourceError};
use crate::provider::types::ToolSchema;

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<Value>,
}

/// A remote tool server.
pub struct HttpToolSource {
    name: String,
    message_url: String,
    auth_token: Option<String>,
    http_client: reqwest::Client,
    id_counter: AtomicU64,
    connected: AtomicBool,
}

impl HttpToolSource {
    /// Create a source for the server rooted at `url`
    pub fn new(name: impl Into<String>, url: &str, auth_token: Option<String>) -> Self {
        Self {
            name: name.into(),
            message_url: format!("{}/message", url.trim_end_matches('/')),
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
            http_client: reqwest::Client::new(),
            id_counter: AtomicU64::new(1),
            connected: AtomicBool::new(false),
        }
    }

    /// Endpoint requests are sent to
    pub fn message_url(&self) -> &str {
        &self.message_url
    }

    async fn post(&self, payload: &Value) -> Result<reqwest::Response, ToolSourceError> {
        let mut request = self.http_client.post(&self.message_url).json(payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolSourceError::transport(&self.name, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolSourceError::transport(
                &self.name,
                format!("HTTP {}", status),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl RpcChannel for HttpToolSource {
    fn server(&self) -> &str {
        &self.name
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolSourceError> {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let payload = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let body = self
            .post(&payload)
            .await?
            .bytes()
            .await
            .map_err(|e| ToolSourceError::transport(&self.name, e.to_string()))?;
        let response: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|source| ToolSourceError::InvalidJson {
                server: self.name.clone(),
                source,
            })?;

        if let Some(error) = response.error {
            return Err(rpc::rpc_error(&self.name, &error));
        }
        response
            .result
            .ok_or_else(|| ToolSourceError::transport(&self.name, "no result in response"))
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), ToolSourceError> {
        self.post(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
            .map(|_| ())
    }

    fn lenient_handshake(&self) -> bool {
        true
    }
}

#[async_trait]
impl ToolSource for HttpToolSource {
    async fn start(&self) -> Result<Vec<ToolSchema>, ToolSourceError> {
        debug!(server = %self.name, url = %self.message_url, "connecting to HTTP tool source");
        let tools = rpc::handshake(self).await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(tools)
    }

    async fn invoke(&self, tool: &str, arguments: Value) -> Result<String, ToolSourceError> {
        if !self.is_alive() {
            return Err(ToolSourceError::NotRunning {
                server: self.name.clone(),
            });
        }
        rpc::call_tool(self, tool, arguments).await
    }

    async fn stop(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_alive(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_url() {
        let source = HttpToolSource::new("cloud", "http://127.0.0.1:8000/pdt/", None);
        assert_eq!(source.message_url(), "http://127.0.0.1:8000/pdt/message");
    }

    #[test]
    fn test_blank_token_ignored() {
        let source = HttpToolSource::new("cloud", "http://localhost", Some("  ".to_string()));
        assert!(source.auth_token.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Port 9 (discard) is closed on test machines; the request fails fast.
        let source = HttpToolSource::new("offline", "http://127.0.0.1:9", None);
        assert!(matches!(
            source.start().await,
            Err(ToolSourceError::Transport { .. })
        ));
        assert!(!source.is_alive());
    }
}

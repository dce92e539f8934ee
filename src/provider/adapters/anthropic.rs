//! Anthropic Messages API adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::http::{require_credential, HttpClientBase};
use super::{flatten_tool_turns, merge_same_role, split_system};
use crate::provider::error::ProviderError;
use crate::provider::traits::{ModelOutcome, ModelProvider};
use crate::provider::types::{
    ConverseOptions, Message, MessageContent, MessageRole, ToolInvocationRequest, ToolSchema,
};

const PROVIDER: &str = "anthropic";
const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const API_VERSION: &str = "2023-06-01";

/// Client for `POST /v1/messages`
pub struct AnthropicProvider {
    base: HttpClientBase,
    api_key: String,
    model: Option<String>,
}

impl AnthropicProvider {
    /// Create the adapter; fails when `api_key` is missing or blank
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = require_credential(PROVIDER, "ANTHROPIC_API_KEY", api_key)?;
        Ok(Self {
            base: HttpClientBase::new(
                PROVIDER,
                base_url.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            ),
            api_key,
            model,
        })
    }

    fn build_request(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> MessagesRequest {
        let history = flatten_tool_turns(history, !tools.is_empty());
        let (system, rest) = split_system(&history);

        let turns = rest.into_iter().map(to_blocks).collect();
        let messages = merge_same_role(turns)
            .into_iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect();

        let tools = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.object_parameters(),
                })
            })
            .collect();

        MessagesRequest {
            model: options.model.clone().unwrap_or_else(|| self.default_model()),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system,
            messages,
            tools,
        }
    }
}

fn to_blocks(message: &Message) -> (&'static str, Vec<Value>) {
    let role = match message.role {
        MessageRole::Assistant => "assistant",
        _ => "user",
    };
    let blocks = match &message.content {
        MessageContent::Text { text } => vec![json!({ "type": "text", "text": text })],
        MessageContent::ToolRequests { requests } => requests
            .iter()
            .map(|r| {
                json!({
                    "type": "tool_use",
                    "id": r.id,
                    "name": r.name,
                    "input": r.arguments,
                })
            })
            .collect(),
        MessageContent::ToolResults { results } => results
            .iter()
            .map(|r| {
                json!({
                    "type": "tool_result",
                    "tool_use_id": r.id,
                    "content": r.content,
                    "is_error": r.is_error,
                })
            })
            .collect(),
    };
    (role, blocks)
}

fn parse_response(response: MessagesResponse) -> Result<ModelOutcome, ProviderError> {
    let mut text = Vec::new();
    let mut requests = Vec::new();

    for block in response.content {
        match block {
            ContentBlock::Text { text: t } => text.push(t),
            ContentBlock::ToolUse { id, name, input } => {
                requests.push(ToolInvocationRequest::new(id, name, input))
            }
            ContentBlock::Other => {}
        }
    }

    if !requests.is_empty() {
        return Ok(ModelOutcome::ToolRequests(requests));
    }
    if text.is_empty() && response.stop_reason.as_deref() == Some("max_tokens") {
        return Err(ProviderError::invalid_response(
            PROVIDER,
            "reply was cut off by max_tokens before any text was produced",
        ));
    }
    Ok(ModelOutcome::FinalText(text.join("")))
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    async fn converse(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> Result<ModelOutcome, ProviderError> {
        options.validate()?;
        let request = self.build_request(history, tools, options);
        let url = self.base.build_url("/v1/messages");

        info!(
            provider = PROVIDER,
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to Anthropic"
        );

        let headers = [
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", API_VERSION.to_string()),
        ];
        let response: MessagesResponse = self.base.post_json(&url, &headers, &request).await?;
        debug!(stop_reason = ?response.stop_reason, "Received response from Anthropic");

        parse_response(response)
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }

    fn default_model(&self) -> String {
        self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::ToolInvocationResult;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new(Some("sk-ant-test".into()), None, None).unwrap()
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = AnthropicProvider::new(None, None, None).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_request_shape() {
        let history = vec![
            Message::system("You are an assistant"),
            Message::user("What are my tickets?"),
            Message::tool_requests(vec![ToolInvocationRequest::new(
                "toolu_1",
                "search_tickets",
                json!({"jql": "assignee = currentUser()"}),
            )]),
            Message::tool_results(vec![ToolInvocationResult::success("toolu_1", "PROJ-1")]),
            Message::user("Please wrap up."),
        ];
        let tools = vec![ToolSchema::new("search_tickets", "Search", json!({"type": "object"}))];
        let request = provider().build_request(&history, &tools, &ConverseOptions::default());

        assert_eq!(request.system.as_deref(), Some("You are an assistant"));
        assert_eq!(request.model, DEFAULT_MODEL);
        // tool results and the nudge collapse into a single user turn
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1]["content"][0]["type"], "tool_use");
        assert_eq!(request.messages[2]["role"], "user");
        assert_eq!(request.messages[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(request.messages[2]["content"][1]["text"], "Please wrap up.");
        assert_eq!(request.tools[0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_parse_surfaces_every_tool_use() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "a", "name": "search_tickets", "input": {}},
                {"type": "tool_use", "id": "b", "name": "search_pages", "input": {"q": "api"}}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        match parse_response(response).unwrap() {
            ModelOutcome::ToolRequests(requests) => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[1].name, "search_pages");
            }
            other => panic!("expected tool requests, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "You have 3 tickets."}],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(
            parse_response(response).unwrap(),
            ModelOutcome::FinalText("You have 3 tickets.".into())
        );
    }
}

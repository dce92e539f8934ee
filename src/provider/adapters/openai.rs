//! OpenAI-compatible Chat Completions adapter.
//!
//! Works against api.openai.com and any service exposing the same
//! `/chat/completions` contract (set `OPENAI_BASE_URL` or `provider.base_url`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::flatten_tool_turns;
use super::http::{require_credential, HttpClientBase};
use crate::provider::error::ProviderError;
use crate::provider::traits::{ModelOutcome, ModelProvider};
use crate::provider::types::{
    ConverseOptions, Message, MessageContent, ToolInvocationRequest, ToolSchema,
};

const PROVIDER: &str = "openai";
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4";

/// Client for `POST <base>/chat/completions`
pub struct OpenAiProvider {
    base: HttpClientBase,
    api_key: String,
    model: Option<String>,
}

impl OpenAiProvider {
    /// Create the adapter; fails when `api_key` is missing or blank
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = require_credential(PROVIDER, "OPENAI_API_KEY", api_key)?;
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
    ) -> ChatRequest {
        let history = flatten_tool_turns(history, !tools.is_empty());
        let messages = history.iter().flat_map(to_chat_messages).collect();

        let tools = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.object_parameters(),
                    }
                })
            })
            .collect();

        ChatRequest {
            model: options.model.clone().unwrap_or_else(|| self.default_model()),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools,
        }
    }
}

/// One internal message may expand to several wire messages (one per tool result).
fn to_chat_messages(message: &Message) -> Vec<Value> {
    match &message.content {
        MessageContent::Text { text } => {
            vec![json!({ "role": message.role.as_str(), "content": text })]
        }
        MessageContent::ToolRequests { requests } => {
            let tool_calls: Vec<Value> = requests
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "type": "function",
                        "function": {
                            "name": r.name,
                            "arguments": wire_arguments(r),
                        }
                    })
                })
                .collect();
            vec![json!({ "role": "assistant", "content": Value::Null, "tool_calls": tool_calls })]
        }
        MessageContent::ToolResults { results } => results
            .iter()
            .map(|r| json!({ "role": "tool", "tool_call_id": r.id, "content": r.content }))
            .collect(),
    }
}

/// Arguments as the backend sent them; unparseable text goes back verbatim.
fn wire_arguments(request: &ToolInvocationRequest) -> String {
    match (&request.arguments, &request.argument_error) {
        (Value::String(raw), Some(_)) => raw.clone(),
        (arguments, _) => arguments.to_string(),
    }
}

/// Parse one call; arguments that are not JSON yield a malformed request
/// rather than failing the reply, so sibling calls still run.
fn parse_call(call: ChatToolCall) -> ToolInvocationRequest {
    let raw = call.function.arguments;
    if raw.trim().is_empty() {
        return ToolInvocationRequest::new(call.id, call.function.name, json!({}));
    }
    match serde_json::from_str(&raw) {
        Ok(arguments) => ToolInvocationRequest::new(call.id, call.function.name, arguments),
        Err(err) => {
            warn!(tool = %call.function.name, %err, "tool arguments are not JSON");
            ToolInvocationRequest::malformed(call.id, call.function.name, raw, err.to_string())
        }
    }
}

fn parse_response(response: ChatResponse) -> Result<ModelOutcome, ProviderError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing choices"))?;

    let calls = message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let requests = calls.into_iter().map(parse_call).collect();
        return Ok(ModelOutcome::ToolRequests(requests));
    }

    Ok(ModelOutcome::FinalText(message.content.unwrap_or_default()))
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    async fn converse(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> Result<ModelOutcome, ProviderError> {
        options.validate()?;
        let request = self.build_request(history, tools, options);
        let url = self.base.build_url("chat/completions");

        info!(
            provider = PROVIDER,
            endpoint = self.base.endpoint.as_str(),
            model = request.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let response: ChatResponse = self.base.post_json(&url, &headers, &request).await?;
        debug!("Received response from OpenAI-compatible provider");

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
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: String,
    function: ChatFunctionCall,
}

#[derive(Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::ToolInvocationResult;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new(
            Some("sk-test".into()),
            Some("http://localhost:8000/v1".into()),
            Some("llama3".into()),
        )
        .unwrap()
    }

    #[test]
    fn test_tool_results_expand_per_call() {
        let history = vec![
            Message::system("sys"),
            Message::user("hi"),
            Message::tool_requests(vec![
                ToolInvocationRequest::new("c1", "a", json!({"x": 1})),
                ToolInvocationRequest::new("c2", "b", json!({})),
            ]),
            Message::tool_results(vec![
                ToolInvocationResult::success("c1", "ok"),
                ToolInvocationResult::error("c2", "boom"),
            ]),
        ];
        let tools = vec![ToolSchema::new("a", "A", json!({})), ToolSchema::new("b", "B", json!({}))];
        let request = provider().build_request(&history, &tools, &ConverseOptions::default());

        assert_eq!(request.model, "llama3");
        assert_eq!(request.messages.len(), 5);
        assert_eq!(request.messages[2]["tool_calls"][0]["function"]["arguments"], "{\"x\":1}");
        assert_eq!(request.messages[3]["role"], "tool");
        assert_eq!(request.messages[4]["content"], "boom");
    }

    #[test]
    fn test_parse_all_tool_calls() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "a", "arguments": "{\"k\":\"v\"}"}},
                        {"id": "c2", "type": "function", "function": {"name": "b", "arguments": ""}}
                    ]
                }
            }]
        }))
        .unwrap();

        match parse_response(response).unwrap() {
            ModelOutcome::ToolRequests(requests) => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[0].arguments, json!({"k": "v"}));
                assert_eq!(requests[1].arguments, json!({}));
            }
            other => panic!("expected tool requests, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_arguments_keep_sibling_calls() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function",
                         "function": {"name": "search_tickets", "arguments": "{\"jql\":\"assignee = me\"}"}},
                        {"id": "c2", "type": "function",
                         "function": {"name": "get_issue", "arguments": "{\"key\": ABC-1"}}
                    ]
                }
            }]
        }))
        .unwrap();

        let requests = match parse_response(response).unwrap() {
            ModelOutcome::ToolRequests(requests) => requests,
            other => panic!("expected tool requests, got {:?}", other),
        };
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].arguments, json!({"jql": "assignee = me"}));
        assert!(requests[0].argument_error.is_none());
        assert_eq!(requests[1].name, "get_issue");
        assert!(requests[1].argument_error.is_some());

        // Replayed to the backend exactly as it was sent
        let history = vec![Message::user("hi"), Message::tool_requests(requests)];
        let tools = vec![
            ToolSchema::new("search_tickets", "Search", json!({})),
            ToolSchema::new("get_issue", "Get", json!({})),
        ];
        let request = provider().build_request(&history, &tools, &ConverseOptions::default());
        assert_eq!(
            request.messages[1]["tool_calls"][1]["function"]["arguments"],
            "{\"key\": ABC-1"
        );
    }

    #[test]
    fn test_parse_missing_choices() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(parse_response(response).is_err());
    }
}

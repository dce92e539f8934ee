//! AWS Bedrock Converse API adapter, authenticated with a Bedrock API key.

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

const PROVIDER: &str = "bedrock";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MODEL: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";

/// Client for `POST /model/{modelId}/converse`
pub struct BedrockProvider {
    base: HttpClientBase,
    api_key: String,
    model: Option<String>,
}

impl BedrockProvider {
    /// Create the adapter; `base_url` overrides the regional runtime endpoint
    pub fn new(
        api_key: Option<String>,
        region: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = require_credential(PROVIDER, "AWS_BEARER_TOKEN_BEDROCK", api_key)?;
        let endpoint = base_url.unwrap_or_else(|| {
            let region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());
            format!("https://bedrock-runtime.{}.amazonaws.com", region)
        });
        Ok(Self {
            base: HttpClientBase::new(PROVIDER, endpoint),
            api_key,
            model,
        })
    }

    fn build_request(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> ConverseRequest {
        let history = flatten_tool_turns(history, !tools.is_empty());
        let (system, rest) = split_system(&history);

        let turns = rest.into_iter().map(to_blocks).collect();
        let messages = merge_same_role(turns)
            .into_iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect();

        let tool_config = if tools.is_empty() {
            None
        } else {
            let specs: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "toolSpec": {
                            "name": tool.name,
                            "description": tool.description,
                            "inputSchema": { "json": tool.object_parameters() },
                        }
                    })
                })
                .collect();
            Some(json!({ "tools": specs }))
        };

        ConverseRequest {
            messages,
            system: system.map(|text| vec![json!({ "text": text })]),
            inference_config: InferenceConfig {
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            },
            tool_config,
        }
    }
}

fn to_blocks(message: &Message) -> (&'static str, Vec<Value>) {
    let role = match message.role {
        MessageRole::Assistant => "assistant",
        _ => "user",
    };
    let blocks = match &message.content {
        MessageContent::Text { text } => vec![json!({ "text": text })],
        MessageContent::ToolRequests { requests } => requests
            .iter()
            .map(|r| {
                json!({
                    "toolUse": { "toolUseId": r.id, "name": r.name, "input": r.arguments }
                })
            })
            .collect(),
        MessageContent::ToolResults { results } => results
            .iter()
            .map(|r| {
                json!({
                    "toolResult": {
                        "toolUseId": r.id,
                        "content": [{ "text": r.content }],
                        "status": if r.is_error { "error" } else { "success" },
                    }
                })
            })
            .collect(),
    };
    (role, blocks)
}

fn parse_response(response: ConverseResponse) -> Result<ModelOutcome, ProviderError> {
    let message = response
        .output
        .message
        .ok_or_else(|| ProviderError::invalid_response(PROVIDER, "missing output.message"))?;

    let mut text = Vec::new();
    let mut requests = Vec::new();
    for block in message.content {
        if let Some(tool_use) = block.tool_use {
            requests.push(ToolInvocationRequest::new(
                tool_use.tool_use_id,
                tool_use.name,
                tool_use.input,
            ));
        } else if let Some(t) = block.text {
            text.push(t);
        }
    }

    if !requests.is_empty() {
        return Ok(ModelOutcome::ToolRequests(requests));
    }
    Ok(ModelOutcome::FinalText(text.join("")))
}

#[async_trait]
impl ModelProvider for BedrockProvider {
    async fn converse(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        options: &ConverseOptions,
    ) -> Result<ModelOutcome, ProviderError> {
        options.validate()?;
        let model = options.model.clone().unwrap_or_else(|| self.default_model());
        let request = self.build_request(history, tools, options);
        let url = self.base.build_url(&format!("model/{}/converse", model));

        info!(
            provider = PROVIDER,
            model = model.as_str(),
            messages = request.messages.len(),
            tools = tools.len(),
            "Sending request to Bedrock"
        );

        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let response: ConverseResponse = self.base.post_json(&url, &headers, &request).await?;
        debug!(stop_reason = ?response.stop_reason, "Received response from Bedrock");

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
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<Vec<Value>>,
    inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ConverseOutput {
    message: Option<ConverseMessage>,
}

#[derive(Deserialize)]
struct ConverseMessage {
    #[serde(default)]
    content: Vec<ConverseBlock>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseBlock {
    text: Option<String>,
    tool_use: Option<ConverseToolUse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseToolUse {
    tool_use_id: String,
    name: String,
    #[serde(default)]
    input: Value,
}

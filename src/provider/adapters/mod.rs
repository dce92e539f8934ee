//! Backend adapters: one per vendor wire format.
//!
//! Each adapter owns the translation between the internal [`Message`] history
//! and its vendor's request/response JSON. The helpers here are shared by the
//! adapters whose APIs demand strictly alternating roles.

pub mod anthropic;
pub mod bedrock;
pub mod http;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use openai::OpenAiProvider;

use std::borrow::Cow;

use crate::provider::types::{Message, MessageContent, MessageRole};

/// Split off system messages, returning their joined text and the rest.
pub(crate) fn split_system(history: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system = Vec::new();
    let mut rest = Vec::with_capacity(history.len());
    for message in history {
        match (&message.role, &message.content) {
            (MessageRole::System, MessageContent::Text { text }) => system.push(text.as_str()),
            (MessageRole::System, _) => {}
            _ => rest.push(message),
        }
    }
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, rest)
}

/// Rewrite tool request/result turns as plain text.
///
/// Vendors reject histories that contain tool blocks when the request offers
/// no tools, which happens once every tool source has been disabled.
pub(crate) fn flatten_tool_turns(history: &[Message], tools_offered: bool) -> Cow<'_, [Message]> {
    let has_tool_turns = history.iter().any(|m| {
        matches!(
            m.content,
            MessageContent::ToolRequests { .. } | MessageContent::ToolResults { .. }
        )
    });
    if tools_offered || !has_tool_turns {
        return Cow::Borrowed(history);
    }

    let flattened = history
        .iter()
        .map(|message| match &message.content {
            MessageContent::Text { .. } => message.clone(),
            MessageContent::ToolRequests { requests } => {
                let lines: Vec<String> = requests
                    .iter()
                    .map(|r| format!("[called tool {} with {}]", r.name, r.arguments))
                    .collect();
                Message::assistant(lines.join("\n"))
            }
            MessageContent::ToolResults { results } => {
                let lines: Vec<String> = results
                    .iter()
                    .map(|r| {
                        if r.is_error {
                            format!("[tool error] {}", r.content)
                        } else {
                            format!("[tool result] {}", r.content)
                        }
                    })
                    .collect();
                Message::user(lines.join("\n"))
            }
        })
        .collect();
    Cow::Owned(flattened)
}

/// Concatenate the content blocks of consecutive same-role turns.
pub(crate) fn merge_same_role(
    turns: Vec<(&'static str, Vec<serde_json::Value>)>,
) -> Vec<(&'static str, Vec<serde_json::Value>)> {
    let mut merged: Vec<(&'static str, Vec<serde_json::Value>)> = Vec::with_capacity(turns.len());
    for (role, blocks) in turns {
        match merged.last_mut() {
            Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
            _ => merged.push((role, blocks)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::types::{ToolInvocationRequest, ToolInvocationResult};
    use serde_json::json;

    #[test]
    fn test_split_system() {
        let history = vec![
            Message::system("You are helpful"),
            Message::user("hi"),
            Message::system("Be brief"),
        ];
        let (system, rest) = split_system(&history);
        assert_eq!(system.as_deref(), Some("You are helpful\n\nBe brief"));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_flatten_only_without_tools() {
        let history = vec![
            Message::user("find PROJ-1"),
            Message::tool_requests(vec![ToolInvocationRequest::new(
                "c1",
                "get_issue",
                json!({"key": "PROJ-1"}),
            )]),
            Message::tool_results(vec![ToolInvocationResult::error("c1", "timeout")]),
        ];

        assert!(matches!(flatten_tool_turns(&history, true), Cow::Borrowed(_)));

        let flat = flatten_tool_turns(&history, false);
        assert!(flat.iter().all(|m| m.text().is_some()));
        assert!(flat[1].text().unwrap().contains("get_issue"));
        assert_eq!(flat[2].text(), Some("[tool error] timeout"));
    }

    #[test]
    fn test_merge_same_role() {
        let turns = vec![
            ("user", vec![json!({"text": "a"})]),
            ("user", vec![json!({"text": "b"})]),
            ("assistant", vec![json!({"text": "c"})]),
        ];
        let merged = merge_same_role(turns);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].1.len(), 2);
    }
}

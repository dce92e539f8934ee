//! Internal message format for provider-agnostic message representation.
//!
//! A conversation is an ordered `Vec<Message>`; the adapters translate it into
//! each backend's wire shape on every round.

use serde::{Deserialize, Serialize};

use super::tools::{ToolInvocationRequest, ToolInvocationResult};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model
    System,
    /// The human, or synthetic messages sent on their behalf
    User,
    /// The model
    Assistant,
}

impl MessageRole {
    /// Get the string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Tool invocations requested by the assistant
    ToolRequests {
        /// Requests in the order the backend produced them
        requests: Vec<ToolInvocationRequest>,
    },
    /// Results of a round's invocations, in request order
    ToolResults {
        /// One result per request
        results: Vec<ToolInvocationResult>,
    },
}

/// A single entry of the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message
    pub role: MessageRole,
    /// What it carries
    pub content: MessageContent,
}

impl Message {
    /// System instruction message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text { text: text.into() },
        }
    }

    /// User text message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text { text: text.into() },
        }
    }

    /// Assistant text message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text { text: text.into() },
        }
    }

    /// Assistant message carrying the tool requests of a round
    pub fn tool_requests(requests: Vec<ToolInvocationRequest>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::ToolRequests { requests },
        }
    }

    /// User message carrying the tool results of a round
    pub fn tool_results(results: Vec<ToolInvocationResult>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::ToolResults { results },
        }
    }

    /// Text body, if this is a text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let msg = Message::system("You are a helpful assistant");
        assert_eq!(msg.role, MessageRole::System);
        assert_eq!(msg.text(), Some("You are a helpful assistant"));

        let msg = Message::user("Hello");
        assert_eq!(msg.role, MessageRole::User);

        let msg = Message::tool_requests(vec![ToolInvocationRequest::new(
            "call_1",
            "search_tickets",
            json!({"jql": "assignee = currentUser()"}),
        )]);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.text().is_none());
    }

    #[test]
    fn test_tool_results_are_user_role() {
        let msg = Message::tool_results(vec![ToolInvocationResult::success("call_1", "ok")]);
        assert_eq!(msg.role, MessageRole::User);
    }

    #[test]
    fn test_content_tagging() {
        let msg = Message::assistant("done");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["content"]["type"], "text");
        assert_eq!(value["content"]["text"], "done");
    }
}

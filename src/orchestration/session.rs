//! Per-agent conversation state.

use crate::provider::types::{Message, MessageRole};

/// History and loop counters of one conversation.
///
/// Lives as long as the agent, across `chat` calls; only the orchestrator
/// mutates it and `reset` returns it to the freshly created state.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    history: Vec<Message>,
    iteration_count: u32,
    consecutive_tool_failure_count: u32,
    warning_injected: bool,
    terminated: Option<String>,
}

impl ConversationSession {
    /// Empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty session whose history starts with a system prompt
    pub fn with_system_prompt(prompt: Option<&str>) -> Self {
        let mut session = Self::new();
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            session.history.push(Message::system(prompt));
        }
        session
    }

    /// Transcript sent to the model every round
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Model calls made so far in this session
    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// Rounds in a row in which every tool call failed
    pub fn consecutive_tool_failure_count(&self) -> u32 {
        self.consecutive_tool_failure_count
    }

    /// Whether the wrap-up nudge has been sent
    pub fn warning_injected(&self) -> bool {
        self.warning_injected
    }

    /// Why the session ended, if it did
    pub fn terminated(&self) -> Option<&str> {
        self.terminated.as_deref()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub(crate) fn count_round(&mut self) -> u32 {
        self.iteration_count += 1;
        self.iteration_count
    }

    /// Record a finished tool round; returns the updated failure streak.
    pub(crate) fn record_tool_round(&mut self, all_failed: bool) -> u32 {
        if all_failed {
            self.consecutive_tool_failure_count += 1;
        } else {
            self.consecutive_tool_failure_count = 0;
        }
        self.consecutive_tool_failure_count
    }

    pub(crate) fn mark_warning_injected(&mut self) {
        self.warning_injected = true;
    }

    pub(crate) fn terminate(&mut self, reason: impl Into<String>) {
        self.terminated = Some(reason.into());
    }

    /// Drop history and counters, keeping only the leading system prompt.
    pub fn reset(&mut self) {
        let system = self
            .history
            .first()
            .filter(|m| m.role == MessageRole::System)
            .cloned();
        *self = Self::default();
        self.history.extend(system);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_streak_resets_on_success() {
        let mut session = ConversationSession::new();
        assert_eq!(session.record_tool_round(true), 1);
        assert_eq!(session.record_tool_round(true), 2);
        assert_eq!(session.record_tool_round(false), 0);
        assert_eq!(session.record_tool_round(true), 1);
    }

    #[test]
    fn test_reset_keeps_system_prompt() {
        let mut session = ConversationSession::with_system_prompt(Some("You help with Jira."));
        session.push(Message::user("hi"));
        session.count_round();
        session.mark_warning_injected();
        session.terminate("budget");

        session.reset();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].text(), Some("You help with Jira."));
        assert_eq!(session.iteration_count(), 0);
        assert!(!session.warning_injected());
        assert!(session.terminated().is_none());
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        assert!(ConversationSession::with_system_prompt(Some("  ")).history().is_empty());
        assert!(ConversationSession::with_system_prompt(None).history().is_empty());
    }
}

//! Loop limits for the conversation orchestrator.

use std::time::Duration;

use crate::config::Configuration;

/// Synthetic user message sent once per session when the round budget runs low.
pub const WRAP_UP_MESSAGE: &str = "You are close to the limit of tool calls for this \
conversation. Stop exploring and answer now using the information you already have. \
If something is still missing, say what it is instead of calling more tools.";

/// Every limit the orchestrator enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopPolicy {
    /// Model calls allowed per session
    pub max_iterations: u32,
    /// All-failed tool rounds in a row before giving up
    pub max_consecutive_tool_failures: u32,
    /// Rounds before the budget at which the wrap-up nudge is sent
    pub wrap_up_margin: u32,
    /// Limit for one tool invocation
    pub tool_timeout: Duration,
    /// Invocations of one round allowed in flight at once
    pub tool_concurrency: usize,
    /// Limit for one model call
    pub model_timeout: Duration,
    /// Retries after a failed model call
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt
    pub retry_base_delay: Duration,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            max_consecutive_tool_failures: 3,
            wrap_up_margin: 2,
            tool_timeout: Duration::from_secs(60),
            tool_concurrency: 1,
            model_timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

impl LoopPolicy {
    /// Limits from the `[execution]` and `[provider]` tables
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            max_iterations: config.execution.max_iterations,
            max_consecutive_tool_failures: config.execution.max_consecutive_tool_failures,
            wrap_up_margin: config.execution.wrap_up_margin,
            tool_timeout: Duration::from_secs(config.execution.tool_timeout_seconds),
            tool_concurrency: config.execution.tool_concurrency.max(1),
            model_timeout: Duration::from_secs(config.provider.timeout_seconds),
            max_retries: config.provider.max_retries,
            ..Self::default()
        }
    }

    /// Whether the wrap-up nudge is due before round `iteration_count + 1`.
    pub fn wrap_up_due(&self, iteration_count: u32, already_injected: bool, tools_offered: bool) -> bool {
        !already_injected
            && tools_offered
            && iteration_count >= self.max_iterations.saturating_sub(self.wrap_up_margin)
    }

    /// Whether the session has used every round
    pub fn budget_exhausted(&self, iteration_count: u32) -> bool {
        iteration_count >= self.max_iterations
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

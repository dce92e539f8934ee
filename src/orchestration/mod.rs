//! Conversation orchestration.
//!
//! An [`Agent`] owns one [`ConversationSession`] and a
//! [`crate::sources::ToolSourceManager`]. Each `chat` call runs rounds of
//! "ask the model, run the tools it asked for, feed the results back" until
//! the model answers in text or a limit from [`LoopPolicy`] is hit:
//!
//! - the round budget (`max_iterations`), with a one-time wrap-up nudge
//!   `wrap_up_margin` rounds before it;
//! - the circuit breaker, after `max_consecutive_tool_failures` rounds in
//!   which every tool call failed.
//!
//! Each round runs against an immutable [`crate::registry::ToolSnapshot`], so
//! enabling or disabling a source mid-conversation only affects later rounds.

mod agent;
mod error;
mod policy;
mod runtime;
mod session;
mod tools;

pub use agent::{Agent, AgentBuilder, ToggleResult, DEFAULT_SYSTEM_PROMPT};
pub use error::AgentError;
pub use policy::{LoopPolicy, WRAP_UP_MESSAGE};
pub use runtime::ConversationRuntime;
pub use session::ConversationSession;
pub use tools::{execute_round, ToolRound};

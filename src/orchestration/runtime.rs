//! The round loop: ask the model, run the tools it asks for, feed results back.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::AgentError;
use super::policy::{LoopPolicy, WRAP_UP_MESSAGE};
use super::session::ConversationSession;
use super::tools::execute_round;
use crate::observability::Logger;
use crate::provider::types::{ConverseOptions, Message, ToolSchema};
use crate::provider::{ModelOutcome, ModelProvider, ProviderError};
use crate::sources::ToolSourceManager;

/// Drives one conversation turn to a final answer or a terminal error.
///
/// Holds no conversation state of its own; the session and the tool sources
/// are passed in per turn.
pub struct ConversationRuntime {
    provider: Box<dyn ModelProvider>,
    options: ConverseOptions,
    policy: LoopPolicy,
}

impl ConversationRuntime {
    /// Create a runtime; `options` are validated here so a bad temperature or
    /// token limit fails before any conversation starts.
    pub fn new(
        provider: Box<dyn ModelProvider>,
        options: ConverseOptions,
        policy: LoopPolicy,
    ) -> Result<Self, AgentError> {
        options.validate()?;
        if policy.max_iterations == 0 || policy.max_consecutive_tool_failures == 0 {
            return Err(AgentError::Configuration(
                "max_iterations and max_consecutive_tool_failures must be greater than 0"
                    .to_string(),
            ));
        }
        Ok(Self {
            provider,
            options,
            policy,
        })
    }

    /// Active loop limits
    pub fn policy(&self) -> &LoopPolicy {
        &self.policy
    }

    /// Backend identifier
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    /// Model the backend is asked for
    pub fn model(&self) -> String {
        self.options
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Run rounds until the model answers in text.
    ///
    /// The caller has already appended the user message. Sources that died
    /// are reaped before each round. Budget and circuit breaker exits mark the
    /// session terminated. Requests and results of a
    /// cancelled round are not appended to the history.
    pub async fn run(
        &self,
        session: &mut ConversationSession,
        sources: &mut ToolSourceManager,
        logger: Option<&Logger>,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if self.policy.budget_exhausted(session.iteration_count()) {
                let err = AgentError::BudgetExhausted {
                    max_iterations: self.policy.max_iterations,
                };
                warn!(iterations = session.iteration_count(), "round budget exhausted");
                session.terminate("round budget exhausted");
                return Err(err);
            }

            for name in sources.reap_dead().await {
                record(logger, |l| l.log_source_change(&name, "Exited", "tools removed"));
            }

            // Changes made to the sources after this point apply to the next round.
            let snapshot = sources.snapshot();
            let schemas: Vec<ToolSchema> = snapshot.schemas();

            if self.policy.wrap_up_due(
                session.iteration_count(),
                session.warning_injected(),
                !schemas.is_empty(),
            ) {
                info!(
                    iteration = session.iteration_count(),
                    max_iterations = self.policy.max_iterations,
                    "asking the model to wrap up"
                );
                session.push(Message::user(WRAP_UP_MESSAGE));
                session.mark_warning_injected();
            }

            let round = session.iteration_count() + 1;
            record(logger, |l| {
                let names: Vec<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
                l.log_round(round, &names, snapshot.version())
            });
            debug!(
                round,
                tools = schemas.len(),
                registry_version = snapshot.version(),
                history = session.history().len(),
                "calling model"
            );

            let outcome = self.call_model(session.history(), &schemas, cancel).await?;
            let iteration = session.count_round();

            let requests = match outcome {
                ModelOutcome::FinalText(text) => {
                    info!(iteration, chars = text.len(), "model answered");
                    record(logger, |l| l.log_final_answer(iteration, &text));
                    session.push(Message::assistant(text.clone()));
                    return Ok(text);
                }
                ModelOutcome::ToolRequests(requests) if requests.is_empty() => {
                    warn!(iteration, "model returned an empty tool request list");
                    // Keeps the history alternating for the next turn
                    session.push(Message::assistant(""));
                    return Ok(String::new());
                }
                ModelOutcome::ToolRequests(requests) => requests,
            };

            info!(
                iteration,
                tools = ?requests.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
                "running tools"
            );
            record(logger, |l| {
                let listed: Vec<(&str, String)> = requests
                    .iter()
                    .map(|r| (r.name.as_str(), r.arguments.to_string()))
                    .collect();
                l.log_tool_requests(&listed)
            });

            let tool_round = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                round = execute_round(&*sources, &snapshot, &requests, self.policy.tool_concurrency) => round,
            };

            for (request, result) in requests.iter().zip(&tool_round.results) {
                record(logger, |l| l.log_tool_result(&request.name, &result.content, result.is_error));
            }

            debug!(
                iteration,
                failed = tool_round.failures(),
                total = tool_round.results.len(),
                "tool round finished"
            );
            let failures = session.record_tool_round(tool_round.all_failed());
            if tool_round.all_failed() {
                warn!(
                    iteration,
                    consecutive = failures,
                    ceiling = self.policy.max_consecutive_tool_failures,
                    "every tool call in the round failed"
                );
            }
            if failures >= self.policy.max_consecutive_tool_failures {
                session.terminate("too many consecutive failed tool rounds");
                return Err(AgentError::CircuitBreaker {
                    failures,
                    ceiling: self.policy.max_consecutive_tool_failures,
                });
            }

            session.push(Message::tool_requests(requests));
            session.push(Message::tool_results(tool_round.results));
        }
    }

    /// One model call with timeout, retries and exponential backoff.
    async fn call_model(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        cancel: &CancellationToken,
    ) -> Result<ModelOutcome, AgentError> {
        let mut attempt: u32 = 0;
        loop {
            let call = tokio::time::timeout(
                self.policy.model_timeout,
                self.provider.converse(history, tools, &self.options),
            );
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = call => result.unwrap_or_else(|_| Err(ProviderError::Timeout {
                    provider: self.provider.provider_name().to_string(),
                    seconds: self.policy.model_timeout.as_secs(),
                })),
            };

            let err = match result {
                Ok(outcome) => return Ok(outcome),
                Err(err) => err,
            };
            if !is_retryable(&err) || attempt >= self.policy.max_retries {
                warn!(provider = self.provider.provider_name(), attempt, %err, "model call failed");
                return Err(match err {
                    err if err.is_configuration() => AgentError::Configuration(err.to_string()),
                    err => AgentError::Provider {
                        attempts: attempt + 1,
                        source: err,
                    },
                });
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                provider = self.provider.provider_name(),
                attempt,
                retry_in_ms = delay.as_millis() as u64,
                %err,
                "model call failed, retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

/// Transient failures and replies we could not parse are worth another try;
/// a rejected request or bad credentials are not.
fn is_retryable(err: &ProviderError) -> bool {
    err.is_transient() || matches!(err, ProviderError::InvalidResponse { .. })
}

/// Transcript writes never fail a turn.
fn record(logger: Option<&Logger>, write: impl FnOnce(&Logger) -> anyhow::Result<()>) {
    if let Some(logger) = logger {
        if let Err(err) = write(logger) {
            warn!(error = %err, "failed to write transcript");
        }
    }
}

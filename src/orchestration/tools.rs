//! Tool dispatch for one round.

use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::provider::types::{ToolInvocationRequest, ToolInvocationResult};
use crate::registry::ToolSnapshot;
use crate::sources::ToolSourceManager;

/// Results of one round's invocations, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRound {
    /// One result per request
    pub results: Vec<ToolInvocationResult>,
}

impl ToolRound {
    /// True when the round had invocations and none of them succeeded
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.is_error)
    }

    /// Number of failed invocations
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.is_error).count()
    }
}

/// Run every request of a round against `snapshot`.
///
/// With `concurrency <= 1` requests run one after another. Otherwise up to
/// `concurrency` run at once and the results are put back in request order.
/// A failing invocation becomes an error result and never stops the others.
pub async fn execute_round(
    manager: &ToolSourceManager,
    snapshot: &ToolSnapshot,
    requests: &[ToolInvocationRequest],
    concurrency: usize,
) -> ToolRound {
    let results = if concurrency <= 1 {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(invoke_one(manager, snapshot, request).await);
        }
        results
    } else {
        stream::iter(requests.iter().map(|r| invoke_one(manager, snapshot, r)))
            .buffered(concurrency)
            .collect()
            .await
    };

    ToolRound { results }
}

async fn invoke_one(
    manager: &ToolSourceManager,
    snapshot: &ToolSnapshot,
    request: &ToolInvocationRequest,
) -> ToolInvocationResult {
    if let Some(parse_error) = &request.argument_error {
        warn!(tool = %request.name, call_id = %request.id, %parse_error, "tool call has malformed arguments");
        return ToolInvocationResult::error(
            &request.id,
            format!("Error: invalid arguments for tool '{}': {}", request.name, parse_error),
        );
    }

    let started = Instant::now();
    match manager
        .invoke(snapshot, &request.name, request.arguments.clone())
        .await
    {
        Ok(content) => {
            debug!(
                tool = %request.name,
                call_id = %request.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                bytes = content.len(),
                "tool call succeeded"
            );
            ToolInvocationResult::success(&request.id, content)
        }
        Err(err) => {
            warn!(
                tool = %request.name,
                call_id = %request.id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                %err,
                "tool call failed"
            );
            ToolInvocationResult::error(&request.id, format!("Error: {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(is_error: bool) -> ToolInvocationResult {
        if is_error {
            ToolInvocationResult::error("1", "boom")
        } else {
            ToolInvocationResult::success("1", "ok")
        }
    }

    #[test]
    fn test_all_failed() {
        let empty = ToolRound { results: vec![] };
        assert!(!empty.all_failed());

        let mixed = ToolRound {
            results: vec![result(true), result(false)],
        };
        assert!(!mixed.all_failed());
        assert_eq!(mixed.failures(), 1);

        let failed = ToolRound {
            results: vec![result(true), result(true)],
        };
        assert!(failed.all_failed());
    }

    #[tokio::test]
    async fn test_unknown_tools_become_error_results() {
        let manager = ToolSourceManager::new(vec![], std::time::Duration::from_secs(1));
        let snapshot = manager.snapshot();
        let requests = vec![
            ToolInvocationRequest::new("a", "missing_one", serde_json::json!({})),
            ToolInvocationRequest::new("b", "missing_two", serde_json::json!({})),
        ];

        let round = execute_round(&manager, &snapshot, &requests, 2).await;
        assert_eq!(round.results.len(), 2);
        assert_eq!(round.results[0].id, "a");
        assert_eq!(round.results[1].id, "b");
        assert!(round.all_failed());
        assert!(round.results[0].content.contains("unknown tool 'missing_one'"));
        assert!(round.results[0].content.starts_with("Error: "));
        assert!(!round.results[0].content.starts_with("Error: Error:"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_not_dispatched() {
        let manager = ToolSourceManager::new(vec![], std::time::Duration::from_secs(1));
        let snapshot = manager.snapshot();
        let requests = vec![
            ToolInvocationRequest::new("a", "search_tickets", serde_json::json!({})),
            ToolInvocationRequest::malformed("b", "get_issue", "{\"key\": ABC-1", "expected value at line 1 column 9"),
        ];

        let round = execute_round(&manager, &snapshot, &requests, 1).await;
        assert_eq!(round.results.len(), 2);
        assert_eq!(round.failures(), 2);
        assert_eq!(round.results[1].id, "b");
        assert_eq!(
            round.results[1].content,
            "Error: invalid arguments for tool 'get_issue': expected value at line 1 column 9"
        );
    }
}

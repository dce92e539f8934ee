//! Scripted model provider and in-memory tool sources shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use atlas_agent::provider::{
    ConverseOptions, Message, MessageContent, ModelOutcome, ModelProvider, ProviderError,
    ToolInvocationRequest, ToolSchema,
};
use atlas_agent::sources::{ToolSource, ToolSourceError};
use serde_json::{json, Value};

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with this outcome
    Reply(ModelOutcome),
    /// 503, retried by the agent
    Unavailable,
    /// 400, not retried
    Rejected,
    /// Never answer
    Hang,
}

/// What the provider was sent on one call
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub history: Vec<Message>,
    pub tools: Vec<String>,
}

/// Replays a queue of steps; once it is empty, repeats `fallback`.
#[derive(Clone)]
pub struct ScriptedProvider {
    steps: Arc<Mutex<VecDeque<Step>>>,
    fallback: Arc<Mutex<Step>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into())),
            fallback: Arc::new(Mutex::new(Step::Reply(ModelOutcome::FinalText(
                "done".to_string(),
            )))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Repeat `step` after the scripted steps run out
    pub fn repeating(self, step: Step) -> Self {
        *self.fallback.lock().unwrap() = step;
        self
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn converse(
        &self,
        history: &[Message],
        tools: &[ToolSchema],
        _options: &ConverseOptions,
    ) -> Result<ModelOutcome, ProviderError> {
        self.calls.lock().unwrap().push(ProviderCall {
            history: history.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let step = {
            let next = self.steps.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
        };
        match step {
            Step::Reply(outcome) => Ok(outcome),
            Step::Unavailable => Err(ProviderError::Status {
                provider: "scripted".to_string(),
                status: 503,
                body: "overloaded".to_string(),
            }),
            Step::Rejected => Err(ProviderError::Status {
                provider: "scripted".to_string(),
                status: 400,
                body: "bad request".to_string(),
            }),
            Step::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> String {
        "scripted-model".to_string()
    }
}

/// Final-text step
pub fn answer(text: &str) -> Step {
    Step::Reply(ModelOutcome::FinalText(text.to_string()))
}

/// Tool-request step; ids are `call_<n>` in order
pub fn call(tools: &[&str]) -> Step {
    Step::Reply(ModelOutcome::ToolRequests(
        tools
            .iter()
            .enumerate()
            .map(|(i, name)| ToolInvocationRequest::new(format!("call_{}", i), *name, json!({})))
            .collect(),
    ))
}

/// How an in-memory tool behaves when invoked
#[derive(Debug, Clone)]
pub enum Behavior {
    Ok(String),
    Fail(String),
    Delay(Duration, String),
    Hang,
}

/// A tool source living in the test process
pub struct FakeSource {
    name: String,
    tools: Vec<(String, Behavior)>,
    running: AtomicBool,
    starts: AtomicUsize,
    invocations: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new(name: &str, tools: Vec<(&str, Behavior)>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            tools: tools
                .into_iter()
                .map(|(n, b)| (n.to_string(), b))
                .collect(),
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Simulate the process or connection dying
    pub fn crash(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ToolSource for FakeSource {
    async fn start(&self) -> Result<Vec<ToolSchema>, ToolSourceError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(self
            .tools
            .iter()
            .map(|(name, _)| {
                ToolSchema::new(
                    name.as_str(),
                    format!("{} from {}", name, self.name),
                    json!({"type": "object", "properties": {}}),
                )
            })
            .collect())
    }

    async fn invoke(&self, tool: &str, _arguments: Value) -> Result<String, ToolSourceError> {
        self.invocations.lock().unwrap().push(tool.to_string());
        let behavior = self
            .tools
            .iter()
            .find(|(name, _)| name == tool)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| ToolSourceError::UnknownTool(tool.to_string()))?;

        match behavior {
            Behavior::Ok(text) => Ok(text),
            Behavior::Fail(message) => Err(ToolSourceError::ToolFailed {
                tool: tool.to_string(),
                message,
            }),
            Behavior::Delay(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_alive(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Ok tool shorthand
pub fn ok(text: &str) -> Behavior {
    Behavior::Ok(text.to_string())
}

/// Failing tool shorthand
pub fn fail(message: &str) -> Behavior {
    Behavior::Fail(message.to_string())
}

/// Count text messages equal to `text` in a history
pub fn count_text(history: &[Message], text: &str) -> usize {
    history
        .iter()
        .filter(|m| matches!(&m.content, MessageContent::Text { text: t } if t == text))
        .count()
}

//! Tool source backed by a child process speaking newline-delimited JSON-RPC.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

use super::rpc::{self, RpcChannel};
use super::{ToolSource, ToolSourceError};
use crate::provider::types::ToolSchema;

type PendingMap = HashMap<String, oneshot::Sender<Result<Value, ToolSourceError>>>;

/// Launch parameters for a stdio tool source
#[derive(Debug, Clone)]
pub struct StdioCommand {
    /// Executable
    pub command: String,
    /// Arguments
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Working directory
    pub workdir: Option<PathBuf>,
}

/// A tool server running as a child process.
///
/// Requests are written to the child's stdin one JSON object per line; a
/// background task reads stdout and routes responses to waiting callers by id.
#[derive(Clone)]
pub struct StdioToolSource {
    inner: Arc<StdioInner>,
}

struct StdioInner {
    name: String,
    launch: StdioCommand,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<PendingMap>,
    id_counter: AtomicU64,
    /// Bumped per spawn so a stale reader never tears down a newer child.
    generation: AtomicU64,
    alive: AtomicBool,
}

impl StdioToolSource {
    /// Create a source; nothing is spawned until [`ToolSource::start`]
    pub fn new(name: impl Into<String>, launch: StdioCommand) -> Self {
        Self {
            inner: Arc::new(StdioInner {
                name: name.into(),
                launch,
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
                pending: AsyncMutex::new(HashMap::new()),
                id_counter: AtomicU64::new(1),
                generation: AtomicU64::new(0),
                alive: AtomicBool::new(false),
            }),
        }
    }
}

#[async_trait]
impl ToolSource for StdioToolSource {
    async fn start(&self) -> Result<Vec<ToolSchema>, ToolSourceError> {
        self.inner.spawn().await?;
        match rpc::handshake(self.inner.as_ref()).await {
            Ok(tools) => Ok(tools),
            Err(err) => {
                self.inner.reset().await;
                Err(err)
            }
        }
    }

    async fn invoke(&self, tool: &str, arguments: Value) -> Result<String, ToolSourceError> {
        if !self.is_alive() {
            return Err(ToolSourceError::NotRunning {
                server: self.inner.name.clone(),
            });
        }
        rpc::call_tool(self.inner.as_ref(), tool, arguments).await
    }

    async fn stop(&self) {
        self.inner.reset().await;
    }

    fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }
}

impl StdioInner {
    async fn spawn(self: &Arc<Self>) -> Result<(), ToolSourceError> {
        if self.child.lock().await.is_some() {
            self.reset().await;
        }

        let mut command = Command::new(&self.launch.command);
        command
            .args(&self.launch.args)
            .envs(&self.launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.launch.workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ToolSourceError::Spawn {
            server: self.name.clone(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolSourceError::transport(&self.name, "failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolSourceError::transport(&self.name, "failed to capture stdout"))?;
        let stderr = child.stderr.take();

        info!(
            server = %self.name,
            command = %self.launch.command,
            pid = child.id(),
            "spawned tool source process"
        );

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);
        self.alive.store(true, Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::spawn(reader_loop(Arc::downgrade(self), generation, stdout));
        if let Some(stderr) = stderr {
            tokio::spawn(stderr_loop(self.name.clone(), stderr));
        }
        Ok(())
    }

    async fn handle_inbound(&self, value: Value) -> Result<(), ToolSourceError> {
        let has_method = value.get("method").is_some();
        match value.get("id").cloned() {
            Some(id) if has_method => self.handle_server_request(id, &value).await,
            Some(id) => {
                self.handle_response(&id, value).await;
                Ok(())
            }
            None if has_method => {
                let method = value.get("method").and_then(|m| m.as_str());
                debug!(server = %self.name, method, "notification from tool source");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn handle_response(&self, id: &Value, value: Value) {
        let key = match id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return,
        };

        let responder = self.pending.lock().await.remove(&key);
        match responder {
            Some(sender) => {
                let outcome = match value.get("error") {
                    Some(error) => Err(rpc::rpc_error(&self.name, error)),
                    None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
                };
                let _ = sender.send(outcome);
            }
            None => debug!(server = %self.name, response_id = %key, "response for unknown request"),
        }
    }

    async fn handle_server_request(&self, id: Value, value: &Value) -> Result<(), ToolSourceError> {
        let method = value.get("method").and_then(Value::as_str).unwrap_or_default();
        let reply = if method == "ping" {
            json!({ "jsonrpc": "2.0", "id": id, "result": {} })
        } else {
            warn!(server = %self.name, method, "tool source sent unsupported request");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method '{}' not supported", method) }
            })
        };
        self.write_message(&reply).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolSourceError> {
        let mut encoded =
            serde_json::to_vec(message).map_err(|source| ToolSourceError::InvalidJson {
                server: self.name.clone(),
                source,
            })?;
        encoded.push(b'\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| ToolSourceError::NotRunning {
                server: self.name.clone(),
            })?;
        stream
            .write_all(&encoded)
            .await
            .map_err(|e| ToolSourceError::transport(&self.name, e.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|e| ToolSourceError::transport(&self.name, e.to_string()))
    }

    /// Kill the child and fail everything still waiting on it.
    async fn reset(&self) {
        self.alive.store(false, Ordering::SeqCst);
        *self.writer.lock().await = None;

        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            if let Err(err) = child.kill().await {
                debug!(server = %self.name, %err, "failed to kill tool source (may have already exited)");
            }
            info!(server = %self.name, "stopped tool source process");
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolSourceError::Terminated {
                server: self.name.clone(),
            }));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{}", id)
    }
}

#[async_trait]
impl RpcChannel for StdioInner {
    fn server(&self) -> &str {
        &self.name
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolSourceError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolSourceError::Terminated {
                server: self.name.clone(),
            }),
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), ToolSourceError> {
        self.write_message(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
    }
}

/// Route stdout lines to pending requests until the pipe closes or the
/// source is dropped.
async fn reader_loop(inner: Weak<StdioInner>, generation: u64, stdout: ChildStdout) {
    let name = match inner.upgrade() {
        Some(source) => source.name.clone(),
        None => return,
    };
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(raw)) = lines.next_line().await {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(source) = inner.upgrade() else {
            return;
        };
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                if let Err(err) = source.handle_inbound(value).await {
                    warn!(server = %name, %err, "failed to process message from tool source");
                }
            }
            Err(err) => debug!(server = %name, line = trimmed, %err, "skipping non-JSON line"),
        }
    }

    debug!(server = %name, "tool source stdout closed");
    if let Some(source) = inner.upgrade() {
        if source.generation.load(Ordering::SeqCst) == generation {
            source.reset().await;
        }
    }
}

async fn stderr_loop(name: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(server = %name, line = line.as_str(), "tool source stderr");
    }
}

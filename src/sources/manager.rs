//! Tool source lifecycle: start/stop at runtime, keep the registry in sync.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::http::HttpToolSource;
use super::stdio::{StdioCommand, StdioToolSource};
use super::{ToolSource, ToolSourceError};
use crate::config::{ToolSourceConfig, TransportConfig};
use crate::provider::types::ToolSchema;
use crate::registry::{ToolCollision, ToolRegistry, ToolSnapshot};

/// Builds a [`ToolSource`] for a configured entry.
pub trait SourceConnector: Send + Sync {
    /// Create a fresh, not yet started source
    fn connect(&self, config: &ToolSourceConfig) -> Result<Arc<dyn ToolSource>, ToolSourceError>;
}

/// Connector for the stdio and HTTP transports.
///
/// `${VAR}` references in the entry are expanded here, at start time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportConnector;

impl SourceConnector for TransportConnector {
    fn connect(&self, config: &ToolSourceConfig) -> Result<Arc<dyn ToolSource>, ToolSourceError> {
        let expanded = config
            .expanded()
            .map_err(|e| ToolSourceError::unavailable(&config.name, format!("{:#}", e)))?;

        let source: Arc<dyn ToolSource> = match expanded.transport {
            TransportConfig::Stdio {
                command,
                args,
                env,
                workdir,
            } => Arc::new(StdioToolSource::new(
                expanded.name,
                StdioCommand {
                    command,
                    args,
                    env,
                    workdir,
                },
            )),
            TransportConfig::Http { url, auth_token } => {
                Arc::new(HttpToolSource::new(expanded.name, &url, auth_token))
            }
        };
        Ok(source)
    }
}

/// Reported state of one configured source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSourceStatus {
    /// Source name
    pub name: String,
    /// Human description
    pub description: String,
    /// Whether the user wants it running
    pub enabled: bool,
    /// Whether it is running and its tools are registered
    pub running: bool,
    /// Tools it published on its last start (0 when stopped)
    pub tool_count: usize,
    /// "stdio", "http" or "custom"
    pub transport: String,
    /// Command line or URL
    pub target: String,
    /// Why the last start failed, if it did
    pub last_error: Option<String>,
}

enum SourceOrigin {
    /// Rebuilt through the connector on every start
    Configured(ToolSourceConfig),
    /// Supplied by the caller and reused across restarts
    Custom(Arc<dyn ToolSource>),
}

struct ManagedSource {
    name: String,
    description: String,
    enabled: bool,
    start_timeout: Duration,
    origin: SourceOrigin,
    handle: Option<Arc<dyn ToolSource>>,
    tool_count: usize,
    last_error: Option<String>,
}

impl ManagedSource {
    fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| h.is_alive())
    }
}

/// Owns every tool source and the registry their tools are merged into.
///
/// Only the manager flips a source between running and stopped; each flip
/// re-merges the registry, so the next snapshot reflects it.
pub struct ToolSourceManager {
    sources: Vec<ManagedSource>,
    registry: ToolRegistry,
    connector: Arc<dyn SourceConnector>,
    tool_timeout: Duration,
}

impl ToolSourceManager {
    /// Create a manager for `configs` using the built-in transports
    pub fn new(configs: Vec<ToolSourceConfig>, tool_timeout: Duration) -> Self {
        Self::with_connector(configs, tool_timeout, Arc::new(TransportConnector))
    }

    /// Create a manager with a custom connector
    pub fn with_connector(
        configs: Vec<ToolSourceConfig>,
        tool_timeout: Duration,
        connector: Arc<dyn SourceConnector>,
    ) -> Self {
        let sources = configs
            .into_iter()
            .map(|config| ManagedSource {
                name: config.name.clone(),
                description: config.description.clone(),
                enabled: config.enabled,
                start_timeout: Duration::from_secs(config.start_timeout_seconds),
                origin: SourceOrigin::Configured(config),
                handle: None,
                tool_count: 0,
                last_error: None,
            })
            .collect();

        Self {
            sources,
            registry: ToolRegistry::new(),
            connector,
            tool_timeout,
        }
    }

    /// Add an already-built source (in-process tools, tests).
    ///
    /// Replaces any stopped entry with the same name; a running one is left
    /// untouched and an error is returned.
    pub fn add_source(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        enabled: bool,
        source: Arc<dyn ToolSource>,
    ) -> Result<(), ToolSourceError> {
        let name = name.into();
        if let Some(existing) = self.sources.iter().position(|s| s.name == name) {
            if self.sources[existing].handle.is_some() {
                return Err(ToolSourceError::unavailable(
                    &name,
                    "a running source with this name already exists",
                ));
            }
            self.sources.remove(existing);
        }
        self.sources.push(ManagedSource {
            name,
            description: description.into(),
            enabled,
            start_timeout: Duration::from_secs(30),
            origin: SourceOrigin::Custom(source),
            handle: None,
            tool_count: 0,
            last_error: None,
        });
        Ok(())
    }

    fn entry_mut(&mut self, name: &str) -> Result<&mut ManagedSource, ToolSourceError> {
        self.sources
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| ToolSourceError::NotConfigured {
                server: name.to_string(),
            })
    }

    /// Start a source and merge its tools. Starting a running source is a no-op.
    ///
    /// Returns the number of tools the source published.
    pub async fn start(&mut self, name: &str) -> Result<usize, ToolSourceError> {
        let connector = Arc::clone(&self.connector);
        let stale = {
            let entry = self.entry_mut(name)?;
            entry.enabled = true;
            if entry.is_running() {
                debug!(server = name, "tool source already running");
                return Ok(entry.tool_count);
            }
            entry.tool_count = 0;
            entry.handle.take()
        };
        // A handle whose process died is torn down, with its tools, before restarting.
        if let Some(stale) = stale {
            stale.stop().await;
        }
        self.forget_tools(name);

        let entry = self.entry_mut(name)?;
        let source = match &entry.origin {
            SourceOrigin::Configured(config) => connector.connect(config),
            SourceOrigin::Custom(source) => Ok(Arc::clone(source)),
        };
        let source = match source {
            Ok(source) => source,
            Err(err) => {
                entry.last_error = Some(err.to_string());
                return Err(as_unavailable(name, err));
            }
        };

        let timeout = entry.start_timeout;
        let started = match tokio::time::timeout(timeout, source.start()).await {
            Ok(result) => result,
            Err(_) => Err(ToolSourceError::Timeout {
                server: name.to_string(),
                operation: "start".to_string(),
                seconds: timeout.as_secs(),
            }),
        };

        let tools = match started {
            Ok(tools) => tools,
            Err(err) => {
                source.stop().await;
                warn!(server = name, %err, "tool source failed to start");
                let entry = self.entry_mut(name)?;
                entry.last_error = Some(err.to_string());
                return Err(as_unavailable(name, err));
            }
        };

        let count = match self.registry.register_source(name, tools) {
            Ok(count) => count,
            Err(err) => {
                source.stop().await;
                let entry = self.entry_mut(name)?;
                entry.last_error = Some(err.to_string());
                return Err(ToolSourceError::unavailable(name, err.to_string()));
            }
        };

        let entry = self.entry_mut(name)?;
        entry.handle = Some(source);
        entry.tool_count = count;
        entry.last_error = None;
        info!(
            server = name,
            tools = count,
            version = self.registry.version(),
            "tool source started"
        );
        Ok(count)
    }

    /// Start every enabled source; failures are logged and returned, never fatal.
    pub async fn start_enabled(&mut self) -> Vec<(String, ToolSourceError)> {
        let names: Vec<String> = self
            .sources
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.name.clone())
            .collect();

        let mut failures = Vec::new();
        for name in names {
            if let Err(err) = self.start(&name).await {
                failures.push((name, err));
            }
        }
        failures
    }

    /// Stop a source and remove its tools. Idempotent.
    pub async fn stop(&mut self, name: &str) -> Result<(), ToolSourceError> {
        let handle = {
            let entry = self.entry_mut(name)?;
            entry.enabled = false;
            entry.tool_count = 0;
            entry.handle.take()
        };
        let removed = self.forget_tools(name);

        match handle {
            Some(handle) => {
                handle.stop().await;
                info!(server = name, version = self.registry.version(), "tool source stopped");
            }
            None if removed > 0 => {
                info!(server = name, tools = removed, "removed tools of a stopped source");
            }
            None => debug!(server = name, "tool source already stopped"),
        }
        Ok(())
    }

    /// Stop every running source.
    pub async fn stop_all(&mut self) {
        let running: Vec<String> = self
            .sources
            .iter()
            .filter(|s| s.handle.is_some() || self.registry.has_source(&s.name))
            .map(|s| s.name.clone())
            .collect();
        for name in running {
            let _ = self.stop(&name).await;
        }
    }

    /// Drop sources whose process or connection died since they started.
    ///
    /// Their tools leave the registry, so a shadowed definition from another
    /// source comes back. The sources stay enabled and can be restarted.
    /// Returns the names of the sources reaped.
    pub async fn reap_dead(&mut self) -> Vec<String> {
        let dead: Vec<String> = self
            .sources
            .iter()
            .filter(|s| s.handle.as_ref().is_some_and(|h| !h.is_alive()))
            .map(|s| s.name.clone())
            .collect();

        for name in &dead {
            let handle = self.entry_mut(name).ok().and_then(|entry| {
                entry.tool_count = 0;
                entry.last_error = Some("tool source exited".to_string());
                entry.handle.take()
            });
            if let Some(handle) = handle {
                handle.stop().await;
            }
            let removed = self.forget_tools(name);
            warn!(server = %name, tools = removed, "tool source exited, its tools were removed");
        }
        dead
    }

    /// Remove whatever `name` has in the registry; returns the tool count removed.
    fn forget_tools(&mut self, name: &str) -> usize {
        self.registry.remove_source(name).unwrap_or(0)
    }

    /// Status of every configured source, in configuration order.
    pub fn status(&self) -> Vec<ToolSourceStatus> {
        self.sources
            .iter()
            .map(|s| {
                let running = s.is_running();
                let (transport, target) = match &s.origin {
                    SourceOrigin::Configured(config) => {
                        (config.transport.kind().to_string(), config.transport.target())
                    }
                    SourceOrigin::Custom(_) => ("custom".to_string(), String::new()),
                };
                ToolSourceStatus {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    enabled: s.enabled,
                    running,
                    tool_count: if running { s.tool_count } else { 0 },
                    transport,
                    target,
                    last_error: s.last_error.clone(),
                }
            })
            .collect()
    }

    /// Whether a source with this name is configured
    pub fn is_configured(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name == name)
    }

    /// Immutable view of the merged tool table
    pub fn snapshot(&self) -> ToolSnapshot {
        self.registry.snapshot()
    }

    /// Tool name clashes currently in effect
    pub fn collisions(&self) -> &[ToolCollision] {
        self.registry.collisions()
    }

    /// The tools a source published (empty when stopped)
    pub fn tools_of(&self, name: &str) -> Vec<ToolSchema> {
        self.registry.list_by_source(name)
    }

    /// Per-invocation timeout
    pub fn tool_timeout(&self) -> Duration {
        self.tool_timeout
    }

    /// Dispatch one invocation to the source that serves `tool` in `snapshot`.
    ///
    /// The snapshot decides routing so that every call of a round sees the
    /// same table, even if a source is toggled while the round runs.
    pub async fn invoke(
        &self,
        snapshot: &ToolSnapshot,
        tool: &str,
        arguments: Value,
    ) -> Result<String, ToolSourceError> {
        let registered = snapshot
            .find(tool)
            .ok_or_else(|| ToolSourceError::UnknownTool(tool.to_string()))?;
        let origin = registered.origin();

        let handle = self
            .sources
            .iter()
            .find(|s| s.name == origin)
            .and_then(|s| s.handle.as_ref())
            .filter(|h| h.is_alive())
            .ok_or_else(|| ToolSourceError::NotRunning {
                server: origin.to_string(),
            })?;

        debug!(server = origin, tool, "invoking tool");
        match tokio::time::timeout(self.tool_timeout, handle.invoke(tool, arguments)).await {
            Ok(result) => result,
            Err(_) => Err(ToolSourceError::Timeout {
                server: origin.to_string(),
                operation: format!("tools/call {}", tool),
                seconds: self.tool_timeout.as_secs(),
            }),
        }
    }
}

fn as_unavailable(name: &str, err: ToolSourceError) -> ToolSourceError {
    match err {
        ToolSourceError::Unavailable { .. } => err,
        other => ToolSourceError::unavailable(name, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSource {
        tools: Vec<ToolSchema>,
        fail_start: AtomicBool,
        running: AtomicBool,
        starts: AtomicUsize,
    }

    impl FakeSource {
        fn new(tools: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tools: tools
                    .iter()
                    .map(|n| ToolSchema::new(*n, "fake", json!({"type": "object"})))
                    .collect(),
                fail_start: AtomicBool::new(false),
                running: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                tools: vec![],
                fail_start: AtomicBool::new(true),
                running: AtomicBool::new(false),
                starts: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ToolSource for FakeSource {
        async fn start(&self) -> Result<Vec<ToolSchema>, ToolSourceError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(ToolSourceError::transport("fake", "connection refused"));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(self.tools.clone())
        }

        async fn invoke(&self, tool: &str, arguments: Value) -> Result<String, ToolSourceError> {
            if tool == "slow" {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(format!("{} {}", tool, arguments))
        }

        async fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn is_alive(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    fn manager() -> ToolSourceManager {
        ToolSourceManager::new(vec![], Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_start_registers_tools() {
        let mut manager = manager();
        manager
            .add_source("jira", "Jira", true, FakeSource::new(&["search_tickets", "get_issue"]))
            .unwrap();

        assert_eq!(manager.start("jira").await.unwrap(), 2);
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.len(), 2);

        let status = manager.status();
        assert_eq!(status[0].name, "jira");
        assert!(status[0].running);
        assert_eq!(status[0].tool_count, 2);
        assert_eq!(status[0].transport, "custom");
    }

    #[tokio::test]
    async fn test_start_running_is_noop() {
        let mut manager = manager();
        let source = FakeSource::new(&["a"]);
        manager.add_source("jira", "", true, source.clone()).unwrap();

        manager.start("jira").await.unwrap();
        let version = manager.snapshot().version();
        manager.start("jira").await.unwrap();

        assert_eq!(source.starts.load(Ordering::SeqCst), 1);
        assert_eq!(manager.snapshot().version(), version);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_removes_tools() {
        let mut manager = manager();
        manager.add_source("jira", "", true, FakeSource::new(&["a"])).unwrap();
        manager.start("jira").await.unwrap();

        manager.stop("jira").await.unwrap();
        manager.stop("jira").await.unwrap();

        assert!(manager.snapshot().is_empty());
        let status = &manager.status()[0];
        assert!(!status.running);
        assert!(!status.enabled);
        assert_eq!(status.tool_count, 0);
    }

    #[tokio::test]
    async fn test_crash_then_failed_restart_then_disable() {
        let mut manager = manager();
        let source = FakeSource::new(&["search_tickets"]);
        manager.add_source("jira", "", true, source.clone()).unwrap();
        manager.start("jira").await.unwrap();

        // The process dies and will not come back
        source.running.store(false, Ordering::SeqCst);
        source.fail_start.store(true, Ordering::SeqCst);
        assert!(!manager.status()[0].running);

        assert!(manager.start("jira").await.is_err());
        assert!(manager.snapshot().is_empty());

        manager.stop("jira").await.unwrap();
        assert!(manager.snapshot().is_empty());
        let status = &manager.status()[0];
        assert!(!status.enabled);
        assert!(!status.running);
    }

    #[tokio::test]
    async fn test_disable_after_crash_removes_tools() {
        let mut manager = manager();
        let source = FakeSource::new(&["search_tickets"]);
        manager.add_source("jira", "", true, source.clone()).unwrap();
        manager.start("jira").await.unwrap();

        source.running.store(false, Ordering::SeqCst);
        manager.stop("jira").await.unwrap();

        assert!(manager.snapshot().is_empty());
        assert!(manager.tools_of("jira").is_empty());
    }

    #[tokio::test]
    async fn test_reap_dead_restores_shadowed_tool() {
        let mut manager = manager();
        let mirror = FakeSource::new(&["search"]);
        manager.add_source("primary", "", true, FakeSource::new(&["search"])).unwrap();
        manager.add_source("mirror", "", true, mirror.clone()).unwrap();
        manager.start_enabled().await;
        assert_eq!(manager.snapshot().find("search").unwrap().origin(), "mirror");

        mirror.running.store(false, Ordering::SeqCst);
        assert_eq!(manager.reap_dead().await, vec!["mirror".to_string()]);

        assert_eq!(manager.snapshot().find("search").unwrap().origin(), "primary");
        assert!(manager.collisions().is_empty());
        let status = &manager.status()[1];
        assert!(status.enabled);
        assert!(!status.running);
        assert_eq!(status.last_error.as_deref(), Some("tool source exited"));
        assert!(manager.reap_dead().await.is_empty());

        // An exited source can be started again
        assert_eq!(manager.start("mirror").await.unwrap(), 1);
        assert_eq!(manager.snapshot().find("search").unwrap().origin(), "mirror");
    }

    #[tokio::test]
    async fn test_failed_start_is_unavailable() {
        let mut manager = manager();
        manager.add_source("cloud", "", true, FakeSource::failing()).unwrap();

        let err = manager.start("cloud").await.unwrap_err();
        assert!(matches!(err, ToolSourceError::Unavailable { .. }));
        let status = &manager.status()[0];
        assert!(!status.running);
        assert!(status.last_error.as_deref().unwrap().contains("connection refused"));
        assert!(manager.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let mut manager = manager();
        assert!(matches!(
            manager.start("nope").await,
            Err(ToolSourceError::NotConfigured { .. })
        ));
        assert!(matches!(
            manager.stop("nope").await,
            Err(ToolSourceError::NotConfigured { .. })
        ));
    }

    #[tokio::test]
    async fn test_invoke_routes_through_snapshot() {
        let mut manager = manager();
        manager.add_source("jira", "", true, FakeSource::new(&["search"])).unwrap();
        manager.start("jira").await.unwrap();
        let snapshot = manager.snapshot();

        let out = manager
            .invoke(&snapshot, "search", json!({"q": 1}))
            .await
            .unwrap();
        assert_eq!(out, "search {\"q\":1}");

        assert!(matches!(
            manager.invoke(&snapshot, "missing", json!({})).await,
            Err(ToolSourceError::UnknownTool(_))
        ));

        manager.stop("jira").await.unwrap();
        assert!(matches!(
            manager.invoke(&snapshot, "search", json!({})).await,
            Err(ToolSourceError::NotRunning { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoke_timeout() {
        let mut manager = ToolSourceManager::new(vec![], Duration::from_secs(2));
        manager.add_source("jira", "", true, FakeSource::new(&["slow"])).unwrap();
        manager.start("jira").await.unwrap();
        let snapshot = manager.snapshot();

        let err = manager.invoke(&snapshot, "slow", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::Timeout { seconds: 2, .. }));
    }

    #[tokio::test]
    async fn test_start_enabled_skips_disabled() {
        let mut manager = manager();
        manager.add_source("on", "", true, FakeSource::new(&["a"])).unwrap();
        manager.add_source("off", "", false, FakeSource::new(&["b"])).unwrap();
        manager.add_source("broken", "", true, FakeSource::failing()).unwrap();

        let failures = manager.start_enabled().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "broken");

        let snapshot = manager.snapshot();
        assert!(snapshot.find("a").is_some());
        assert!(snapshot.find("b").is_none());
    }

    #[tokio::test]
    async fn test_configured_source_with_bad_command() {
        let config = ToolSourceConfig {
            name: "local".to_string(),
            description: "Local tools".to_string(),
            enabled: true,
            start_timeout_seconds: 5,
            transport: TransportConfig::Stdio {
                command: "/nonexistent/tool-server".to_string(),
                args: vec!["--stdio".to_string()],
                env: Default::default(),
                workdir: None,
            },
        };
        let mut manager = ToolSourceManager::new(vec![config], Duration::from_secs(5));

        let status = &manager.status()[0];
        assert_eq!(status.transport, "stdio");
        assert_eq!(status.target, "/nonexistent/tool-server --stdio");

        assert!(matches!(
            manager.start("local").await,
            Err(ToolSourceError::Unavailable { .. })
        ));
    }
}

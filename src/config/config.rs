//! TOML configuration parsing and management.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub agent: AgentConfig,
    pub provider: ProviderConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
    pub tool_sources: Vec<ToolSourceConfig>,
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "atlas-agent".to_string(),
            system_prompt: None,
        }
    }
}

/// Model backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend identifier: "anthropic", "openai" or "bedrock"
    pub kind: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Bedrock region
    pub region: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "anthropic".to_string(),
            model: None,
            base_url: None,
            region: None,
            max_tokens: 4096,
            temperature: 0.2,
            timeout_seconds: 120,
            max_retries: 3,
        }
    }
}

/// Conversation loop limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Model calls allowed per session before giving up
    pub max_iterations: u32,
    /// All-failed tool rounds in a row before the circuit breaker trips
    pub max_consecutive_tool_failures: u32,
    /// Rounds before the budget at which the wrap-up nudge is injected
    pub wrap_up_margin: u32,
    pub tool_timeout_seconds: u64,
    /// Same-round invocations run at once; 1 means sequential
    pub tool_concurrency: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            max_consecutive_tool_failures: 3,
            wrap_up_margin: 2,
            tool_timeout_seconds: 60,
            tool_concurrency: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Markdown transcript destination
    pub log_file: String,
    /// Transcript detail: "debug" lists every offered tool name each round
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_file: std::env::temp_dir()
                .join("atlas-agent")
                .join(format!(
                    "session_{}_{}.md",
                    Utc::now().timestamp_millis(),
                    std::process::id()
                ))
                .to_string_lossy()
                .to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// One `[[tool_sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSourceConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Start this source when the agent is built
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_start_timeout")]
    pub start_timeout_seconds: u64,
    #[serde(flatten)]
    pub transport: TransportConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_start_timeout() -> u64 {
    30
}

/// How to reach a tool source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Child process speaking newline-delimited JSON-RPC on stdin/stdout
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
        workdir: Option<PathBuf>,
    },
    /// JSON-RPC over HTTP POST to `<url>/message`
    Http {
        url: String,
        auth_token: Option<String>,
    },
}

impl TransportConfig {
    /// Short transport name for status output
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio { .. } => "stdio",
            TransportConfig::Http { .. } => "http",
        }
    }

    /// Command line or URL, for status output
    pub fn target(&self) -> String {
        match self {
            TransportConfig::Stdio { command, args, .. } if args.is_empty() => command.clone(),
            TransportConfig::Stdio { command, args, .. } => {
                format!("{} {}", command, args.join(" "))
            }
            TransportConfig::Http { url, .. } => url.clone(),
        }
    }
}

impl ToolSourceConfig {
    /// Copy of this entry with `${VAR}` and `~` references expanded.
    ///
    /// Expansion happens when a source starts so that a missing variable only
    /// disables the source that needs it.
    pub fn expanded(&self) -> Result<Self> {
        let transport = match &self.transport {
            TransportConfig::Stdio {
                command,
                args,
                env,
                workdir,
            } => TransportConfig::Stdio {
                command: expand(command)?,
                args: args.iter().map(|a| expand(a)).collect::<Result<_>>()?,
                env: env
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), expand(v)?)))
                    .collect::<Result<_>>()?,
                workdir: workdir
                    .as_ref()
                    .map(|w| expand(&w.to_string_lossy()).map(PathBuf::from))
                    .transpose()?,
            },
            TransportConfig::Http { url, auth_token } => TransportConfig::Http {
                url: expand(url)?,
                auth_token: auth_token.as_deref().map(expand).transpose()?,
            },
        };
        Ok(Self {
            transport,
            ..self.clone()
        })
    }
}

fn expand(value: &str) -> Result<String> {
    shellexpand::full(value)
        .map(|v| v.into_owned())
        .with_context(|| format!("Failed to expand '{}'", value))
}

impl Configuration {
    /// Reject configurations the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        let exec = &self.execution;
        if exec.max_iterations == 0 {
            bail!("execution.max_iterations must be greater than 0");
        }
        if exec.max_consecutive_tool_failures == 0 {
            bail!("execution.max_consecutive_tool_failures must be greater than 0");
        }
        if exec.wrap_up_margin >= exec.max_iterations {
            bail!(
                "execution.wrap_up_margin ({}) must be smaller than execution.max_iterations ({})",
                exec.wrap_up_margin,
                exec.max_iterations
            );
        }
        if exec.tool_timeout_seconds == 0 {
            bail!("execution.tool_timeout_seconds must be greater than 0");
        }
        if exec.tool_concurrency == 0 {
            bail!("execution.tool_concurrency must be at least 1");
        }

        let provider = &self.provider;
        if !(provider.temperature >= 0.0) {
            bail!("provider.temperature must be >= 0.0, got {}", provider.temperature);
        }
        if provider.max_tokens == 0 {
            bail!("provider.max_tokens must be greater than 0");
        }
        if provider.timeout_seconds == 0 {
            bail!("provider.timeout_seconds must be greater than 0");
        }

        let mut seen = HashSet::new();
        for source in &self.tool_sources {
            if source.name.trim().is_empty() {
                bail!("tool source names must not be empty");
            }
            if !seen.insert(source.name.as_str()) {
                bail!("duplicate tool source name '{}'", source.name);
            }
            match &source.transport {
                TransportConfig::Stdio { command, .. } if command.trim().is_empty() => {
                    bail!("tool source '{}' has an empty command", source.name)
                }
                TransportConfig::Http { url, .. } if url.trim().is_empty() => {
                    bail!("tool source '{}' has an empty url", source.name)
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Look up a configured tool source by name
    pub fn tool_source(&self, name: &str) -> Option<&ToolSourceConfig> {
        self.tool_sources.iter().find(|s| s.name == name)
    }
}

/// Loads and manages TOML configuration.
#[derive(Debug)]
pub struct ConfigurationLoader {
    /// File the configuration came from, if any
    pub config_path: Option<PathBuf>,
    pub config: Configuration,
}

impl ConfigurationLoader {
    /// Initialize configuration loader.
    ///
    /// # Arguments
    /// * `config_path` - Path to TOML config file. If None, uses
    ///   `~/.atlas-agent/config.toml` when it exists, else built-in defaults.
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::default_config_path().filter(|p| p.exists()),
        };

        let config = match &config_path {
            Some(path) => Self::load_config(path)?,
            None => Configuration::default(),
        };
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a configuration loader from a pre-parsed Configuration.
    pub fn from_config(config: Configuration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// `~/.atlas-agent/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".atlas-agent").join("config.toml"))
    }

    /// Load configuration from TOML file.
    fn load_config(path: &Path) -> Result<Configuration> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Configuration::default();
        assert_eq!(config.agent.name, "atlas-agent");
        assert_eq!(config.provider.kind, "anthropic");
        assert_eq!(config.execution.max_iterations, 25);
        assert_eq!(config.execution.max_consecutive_tool_failures, 3);
        assert_eq!(config.execution.wrap_up_margin, 2);
        assert_eq!(config.execution.tool_concurrency, 1);
        assert!(config.tool_sources.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tool_sources_from_toml() {
        let toml_content = r#"
[provider]
kind = "openai"
model = "gpt-4o"

[execution]
max_iterations = 10

[[tool_sources]]
name = "atlassian"
description = "Jira and Confluence"
transport = "stdio"
command = "python"
args = ["mcp-server/server.py"]
env = { JIRA_URL = "https://example.atlassian.net" }

[[tool_sources]]
name = "cloud"
transport = "http"
url = "http://localhost:9000"
auth_token = "secret"
enabled = false
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).unwrap();

        let loader = ConfigurationLoader::new(Some(temp_file.path())).unwrap();
        let config = &loader.config;
        assert_eq!(config.provider.kind, "openai");
        assert_eq!(config.provider.max_retries, 3);
        assert_eq!(config.execution.max_iterations, 10);
        assert_eq!(config.execution.wrap_up_margin, 2);
        assert_eq!(config.tool_sources.len(), 2);

        let atlassian = config.tool_source("atlassian").unwrap();
        assert!(atlassian.enabled);
        assert_eq!(atlassian.start_timeout_seconds, 30);
        assert_eq!(atlassian.transport.kind(), "stdio");
        assert_eq!(atlassian.transport.target(), "python mcp-server/server.py");

        let cloud = config.tool_source("cloud").unwrap();
        assert!(!cloud.enabled);
        assert_eq!(
            cloud.transport,
            TransportConfig::Http {
                url: "http://localhost:9000".to_string(),
                auth_token: Some("secret".to_string()),
            }
        );
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Configuration =
            toml::from_str(include_str!("../../config/agent.toml")).unwrap();
        assert!(config.validate().is_ok());

        let atlassian = config.tool_source("atlassian").unwrap();
        assert_eq!(atlassian.start_timeout_seconds, 60);
        match &atlassian.transport {
            TransportConfig::Stdio { env, .. } => {
                assert_eq!(env.get("JIRA_URL").map(String::as_str), Some("${JIRA_URL}"));
            }
            other => panic!("expected stdio transport, got {:?}", other),
        }
        assert!(!config.tool_source("cloud").unwrap().enabled);
    }

    #[test]
    fn test_validation_rejects_bad_budgets() {
        let mut config = Configuration::default();
        config.execution.max_iterations = 2;
        config.execution.wrap_up_margin = 2;
        assert!(config.validate().is_err());

        let mut config = Configuration::default();
        config.execution.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = Configuration::default();
        config.provider.temperature = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_sources() {
        let source = ToolSourceConfig {
            name: "jira".to_string(),
            description: String::new(),
            enabled: true,
            start_timeout_seconds: 5,
            transport: TransportConfig::Http {
                url: "http://localhost:1".to_string(),
                auth_token: None,
            },
        };
        let config = Configuration {
            tool_sources: vec![source.clone(), source],
            ..Configuration::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(ConfigurationLoader::new(Some(Path::new("/nonexistent/atlas.toml"))).is_err());
    }

    #[test]
    fn test_expansion() {
        std::env::set_var("ATLAS_TEST_TOKEN", "tok-123");
        let source = ToolSourceConfig {
            name: "cloud".to_string(),
            description: String::new(),
            enabled: true,
            start_timeout_seconds: 5,
            transport: TransportConfig::Http {
                url: "http://localhost:9000".to_string(),
                auth_token: Some("${ATLAS_TEST_TOKEN}".to_string()),
            },
        };
        let expanded = source.expanded().unwrap();
        match expanded.transport {
            TransportConfig::Http { auth_token, .. } => {
                assert_eq!(auth_token.as_deref(), Some("tok-123"))
            }
            _ => panic!("transport changed"),
        }

        let missing = ToolSourceConfig {
            transport: TransportConfig::Http {
                url: "${ATLAS_TEST_UNSET_VARIABLE}".to_string(),
                auth_token: None,
            },
            ..source
        };
        assert!(missing.expanded().is_err());
        std::env::remove_var("ATLAS_TEST_TOKEN");
    }
}

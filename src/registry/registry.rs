//! Tool registry merging the tool sets of every running source.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::{RegisteredTool, RegistryError, RegistryResult, ToolCollision, ToolSnapshot};
use crate::provider::types::ToolSchema;

/// Tools published by one source, kept in registration order.
#[derive(Debug, Clone)]
struct SourceEntry {
    name: String,
    tools: Vec<ToolSchema>,
}

/// Registry aggregating tools from multiple sources into one flat table.
///
/// Each source's tool list is kept separately; the flat, name-keyed table is
/// recomputed on every change. When two sources publish the same name the
/// source registered later wins and the clash is recorded. Removing the
/// winner brings the shadowed definition back.
///
/// # Example
///
/// ```rust,ignore
/// use atlas_agent::registry::ToolRegistry;
/// use atlas_agent::provider::ToolSchema;
/// use serde_json::json;
///
/// let mut registry = ToolRegistry::new();
/// registry.register_source("jira", vec![
///     ToolSchema::new("search_tickets", "Search with JQL", json!({"type": "object"})),
/// ])?;
///
/// let snapshot = registry.snapshot();
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ToolRegistry {
    /// Per-source tool lists, in registration order.
    sources: Vec<SourceEntry>,

    /// Current collisions, recomputed with the table.
    collisions: Vec<ToolCollision>,

    /// Bumped on every mutation.
    version: u64,

    /// Flat table at `version`.
    snapshot: ToolSnapshot,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a tool name.
    ///
    /// Tool names must be 1-64 characters, alphanumeric, underscores, or
    /// hyphens: the intersection of what the supported backends accept.
    pub(crate) fn validate_name(name: &str, source: &str) -> RegistryResult<()> {
        let valid = !name.is_empty()
            && name.len() <= 64
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if valid {
            Ok(())
        } else {
            Err(RegistryError::InvalidName {
                name: name.to_string(),
                source_name: source.to_string(),
            })
        }
    }

    /// Register (or re-register) the tools published by `source`.
    ///
    /// Re-registering moves the source to the end of the order, so its tools
    /// win any collisions. Nothing changes if any name is invalid.
    ///
    /// Returns the number of tools the source published.
    pub fn register_source(
        &mut self,
        source: impl Into<String>,
        tools: Vec<ToolSchema>,
    ) -> RegistryResult<usize> {
        let source = source.into();
        for tool in &tools {
            Self::validate_name(&tool.name, &source)?;
        }

        let count = tools.len();
        self.sources.retain(|s| s.name != source);
        self.sources.push(SourceEntry {
            name: source.clone(),
            tools,
        });
        self.rebuild();

        debug!(
            source = source.as_str(),
            tools = count,
            version = self.version,
            "Registered tool source"
        );
        Ok(count)
    }

    /// Remove every tool published by `source`.
    ///
    /// Returns the number of tools removed.
    pub fn remove_source(&mut self, source: &str) -> RegistryResult<usize> {
        let position = self
            .sources
            .iter()
            .position(|s| s.name == source)
            .ok_or_else(|| RegistryError::UnknownSource(source.to_string()))?;

        let removed = self.sources.remove(position);
        self.rebuild();

        debug!(
            source,
            tools = removed.tools.len(),
            version = self.version,
            "Removed tool source"
        );
        Ok(removed.tools.len())
    }

    /// Recompute the flat table and collisions from the per-source lists.
    fn rebuild(&mut self) {
        let previous: HashSet<ToolCollision> = self.collisions.drain(..).collect();

        let mut table: Vec<RegisteredTool> = Vec::new();
        let mut name_index: HashMap<String, usize> = HashMap::new();
        let mut collisions = Vec::new();

        for source in &self.sources {
            for schema in &source.tools {
                let entry = RegisteredTool::new(schema.clone(), source.name.clone());
                match name_index.get(&schema.name) {
                    Some(&idx) => {
                        let shadowed = table[idx].origin().to_string();
                        if shadowed != source.name {
                            collisions.push(ToolCollision {
                                tool: schema.name.clone(),
                                winner: source.name.clone(),
                                shadowed,
                            });
                        }
                        table[idx] = entry;
                    }
                    None => {
                        name_index.insert(schema.name.clone(), table.len());
                        table.push(entry);
                    }
                }
            }
        }

        for collision in collisions.iter().filter(|c| !previous.contains(c)) {
            warn!(
                tool = collision.tool.as_str(),
                winner = collision.winner.as_str(),
                shadowed = collision.shadowed.as_str(),
                "Tool name collision: later source wins"
            );
        }

        self.collisions = collisions;
        self.version += 1;
        self.snapshot = ToolSnapshot::new(self.version, table);
    }

    /// Immutable view of the current table.
    pub fn snapshot(&self) -> ToolSnapshot {
        self.snapshot.clone()
    }

    /// Current registry version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Name clashes in effect right now.
    pub fn collisions(&self) -> &[ToolCollision] {
        &self.collisions
    }

    /// List the tools `source` published (including shadowed ones).
    pub fn list_by_source(&self, source: &str) -> Vec<ToolSchema> {
        self.sources
            .iter()
            .find(|s| s.name == source)
            .map(|s| s.tools.clone())
            .unwrap_or_default()
    }

    /// Whether `source` currently has tools registered.
    pub fn has_source(&self, source: &str) -> bool {
        self.sources.iter().any(|s| s.name == source)
    }
}

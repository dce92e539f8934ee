//! Tool Registry Module
//!
//! Merges the tool schemas of every running tool source into one flat,
//! name-keyed table and hands out immutable, versioned snapshots of it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use atlas_agent::registry::ToolRegistry;
//! use atlas_agent::provider::ToolSchema;
//! use serde_json::json;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register_source("jira", vec![
//!     ToolSchema::new("search_tickets", "Search with JQL", json!({"type": "object"})),
//! ])?;
//!
//! // Frozen view for one round
//! let snapshot = registry.snapshot();
//! let schemas = snapshot.schemas();
//! ```

mod error;
mod registered;
#[allow(clippy::module_inception)]
mod registry;
mod snapshot;

pub use error::{RegistryError, RegistryResult};
pub use registered::{RegisteredTool, ToolCollision};
pub use registry::ToolRegistry;
pub use snapshot::ToolSnapshot;

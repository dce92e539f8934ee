//! Tool sources: external processes and services that publish tools.
//!
//! A source is either a child process speaking newline-delimited JSON-RPC on
//! stdio ([`StdioToolSource`]) or a remote server reached over HTTP
//! ([`HttpToolSource`]). The [`ToolSourceManager`] starts and stops them and
//! keeps the merged [`crate::registry::ToolRegistry`] in step.

mod error;
mod http;
mod manager;
pub(crate) mod rpc;
mod source;
mod stdio;

pub use error::ToolSourceError;
pub use http::HttpToolSource;
pub use manager::{SourceConnector, ToolSourceManager, ToolSourceStatus, TransportConnector};
pub use source::ToolSource;
pub use stdio::{StdioCommand, StdioToolSource};

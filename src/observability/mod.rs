//! Session transcripts.
//!
//! Runtime diagnostics go through `tracing`; the [`Logger`] here writes a
//! markdown transcript of what the user and the model did.
//!
//! # Example
//!
//! ```no_run
//! use atlas_agent::observability::Logger;
//!
//! let logger = Logger::new(None, Some("info")).unwrap();
//! logger.log_session_start("atlas-agent", "anthropic", "claude-3-5-sonnet-20241022").unwrap();
//! logger.log_user_message("Show me my sprint tasks").unwrap();
//! logger.log_completion("user exit").unwrap();
//! ```

pub mod logger;

pub use logger::Logger;

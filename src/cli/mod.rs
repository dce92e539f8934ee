//! The `atlas-agent` command-line host.
//!
//! # Commands
//!
//! - `chat [--message TEXT]` - interactive session, or one message and exit
//! - `sources [--check]` - table of configured tool sources
//! - `config` - check configuration and credentials
//!
//! Global flags: `--config`, `--env-file`, `--provider`, `--verbose`.

pub mod commands;
pub mod error;
pub mod runner;
pub mod utils;

pub use error::{CliError, CliResult};
pub use runner::{build_cli, init_tracing, run, run_with_matches, GlobalOptions};

use std::process::ExitCode;

use atlas_agent::cli::{self, utils::display_error_with_suggestions};

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            display_error_with_suggestions(&err, "atlas-agent could not continue");
            ExitCode::FAILURE
        }
    }
}

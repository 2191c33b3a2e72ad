//! Command-line interface for fairday.

pub mod commands;
pub mod context;
pub mod display;
pub mod id_resolver;
pub mod progress;
pub mod types;

pub use types::{Cli, Commands};

/// Print a command failure and exit with status 1.
///
/// With `--json` the error is written to stdout as `{"error": "..."}` so
/// scripts always receive a JSON document.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    tracing::debug!(error = ?err, "command failed");
    if json_mode {
        let body = serde_json::json!({ "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1)
}

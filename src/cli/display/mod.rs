//! Display framework for CLI output formatting.
//!
//! Shared primitives for colors, tables and the human/JSON output switch
//! used by every command.

pub mod colors;
pub mod table;

use serde::Serialize;
use uuid::Uuid;

pub use colors::*;
pub use table::*;

/// Trait for types that can be rendered as human-readable or JSON output.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Dispatch output based on JSON mode flag.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
        );
    } else {
        println!("{}", result.to_human());
    }
}

/// Render a success action result.
pub fn action_success(message: &str) -> String {
    format!("{} {}", console::style("\u{2713}").green().bold(), message)
}

/// Render a warning action result.
pub fn action_warning(message: &str) -> String {
    format!("{} {}", console::style("!").yellow().bold(), message)
}

/// First eight characters of an ID, enough for prefix lookups.
pub fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

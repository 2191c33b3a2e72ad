//! Reason, priority and weather color mapping for CLI output.
//!
//! Coloring is dropped automatically when stdout is not a terminal or
//! `NO_COLOR`/`CLICOLOR=0` is set, via the `console` crate.

use console::{style, StyledObject};

use crate::domain::models::{AssignmentReason, TaskPriority};

/// Returns a colored label for a candidate reason.
///
/// Green: low precipitation. Yellow: priority claim.
/// Cyan: reserve date. Dim: no weather data.
pub fn colorize_reason(reason: AssignmentReason) -> StyledObject<&'static str> {
    let label = reason.as_str();
    match reason {
        AssignmentReason::LowPrecipitation => style(label).green(),
        AssignmentReason::PriorityClaim => style(label).yellow(),
        AssignmentReason::ReserveDate => style(label).cyan(),
        AssignmentReason::NoWeatherData => style(label).dim(),
    }
}

/// High = red, Medium = default, Low = dim.
pub fn colorize_priority(priority: TaskPriority) -> StyledObject<&'static str> {
    let label = priority.as_str();
    match priority {
        TaskPriority::High => style(label).red(),
        TaskPriority::Medium => style(label),
        TaskPriority::Low => style(label).dim(),
    }
}

/// Task state: done tasks are dimmed.
pub fn colorize_state(completed: bool) -> StyledObject<&'static str> {
    if completed {
        style("done").dim()
    } else {
        style("open").green().bold()
    }
}

/// Precipitation probability, green when dry and red when wet.
pub fn format_precipitation(probability: Option<u8>) -> String {
    match probability {
        None => style("-").dim().to_string(),
        Some(p) if p <= 20 => style(format!("{p}%")).green().to_string(),
        Some(p) if p < 60 => style(format!("{p}%")).yellow().to_string(),
        Some(p) => style(format!("{p}%")).red().to_string(),
    }
}

pub fn format_temperature(temperature: Option<f64>) -> String {
    temperature.map_or_else(|| "-".to_string(), |t| format!("{t:.1}°C"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_survive_styling() {
        console::set_colors_enabled(false);
        assert_eq!(colorize_reason(AssignmentReason::ReserveDate).to_string(), "reserve_date");
        assert_eq!(colorize_priority(TaskPriority::High).to_string(), "high");
        assert_eq!(colorize_state(true).to_string(), "done");
        assert_eq!(format_precipitation(Some(5)), "5%");
        assert_eq!(format_precipitation(None), "-");
        assert_eq!(format_temperature(Some(21.04)), "21.0°C");
        assert_eq!(format_temperature(None), "-");
    }
}

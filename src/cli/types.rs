//! CLI type definitions
//!
//! Top-level clap structures. Each command group defines its own
//! arguments next to its handler in [`commands`](super::commands).

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::forecast::ForecastArgs;
use super::commands::init::InitArgs;
use super::commands::location::LocationArgs;
use super::commands::task::TaskArgs;

#[derive(Parser, Debug)]
#[command(name = "fairday")]
#[command(about = "Fairday - picks the driest day before each deadline for outdoor tasks", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .fairday/
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today when scheduling
    #[arg(long, global = true, value_parser = parse_date, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize fairday configuration and database
    Init(InitArgs),

    /// Manage the locations tasks are performed at
    Location(LocationArgs),

    /// Manage tasks and their candidate dates
    Task(TaskArgs),

    /// Inspect forecasts and the forecast cache
    Forecast(ForecastArgs),
}

/// Parse an ISO `YYYY-MM-DD` date argument.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{s}': expected YYYY-MM-DD"))
}

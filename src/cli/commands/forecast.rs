//! Forecast CLI commands.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Args, Subcommand};

use crate::adapters::sqlite::SqliteForecastCacheRepository;
use crate::cli::commands::location::{resolve_location, LocationOutput};
use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, format_precipitation, format_temperature, list_table, output, CommandOutput,
};
use crate::cli::progress::create_spinner;
use crate::domain::models::{Config, ForecastDay};
use crate::domain::ports::ForecastCacheRepository;
use crate::services::rank_days;

#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[command(subcommand)]
    pub command: ForecastCommands,
}

#[derive(Subcommand, Debug)]
pub enum ForecastCommands {
    /// Show the daily forecast for a location
    Show {
        /// Location name or ID prefix
        location: String,
        /// Number of days starting today (capped at the forecast horizon)
        #[arg(short, long, default_value = "7")]
        days: u32,
    },
    /// Delete cached forecast samples
    Purge {
        /// Delete every sample, not only stale ones
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct ForecastOutput {
    pub location: LocationOutput,
    pub days: Vec<ForecastDay>,
    /// Driest day of the range, ignoring occupancy.
    pub best: Option<NaiveDate>,
}

impl CommandOutput for ForecastOutput {
    fn to_human(&self) -> String {
        if self.days.is_empty() {
            return format!("No forecast available for {}.", self.location.name);
        }
        let mut table = list_table(&["date", "rain", "max temp", ""]);
        for day in &self.days {
            let marker = if Some(day.date) == self.best {
                console::style("best").green().bold().to_string()
            } else {
                String::new()
            };
            table.add_row(vec![
                day.date.format("%a %Y-%m-%d").to_string(),
                format_precipitation(day.precipitation_probability),
                format_temperature(day.temperature),
                marker,
            ]);
        }
        format!(
            "Forecast for {} [{}]:\n{}",
            console::style(&self.location.name).bold(),
            self.location.timezone,
            table
        )
    }
}

#[derive(Debug, serde::Serialize)]
pub struct PurgeOutput {
    pub success: bool,
    pub removed: u64,
}

impl CommandOutput for PurgeOutput {
    fn to_human(&self) -> String {
        action_success(&format!("Removed {} cached forecast sample(s)", self.removed))
    }
}

pub async fn execute(args: ForecastArgs, config: &Config, today: Option<NaiveDate>, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;

    match args.command {
        ForecastCommands::Show { location, days } => {
            let location = resolve_location(&ctx, &location).await?;

            let spinner = create_spinner(format!("Fetching forecast for {}", location.name), json_mode);
            let result = ctx.service.forecast(&location, today, days).await;
            spinner.finish_and_clear();
            let forecast = result.context("Failed to fetch forecast")?;

            let best = rank_days(&forecast)
                .into_iter()
                .find(ForecastDay::has_precipitation)
                .map(|d| d.date);
            let out = ForecastOutput {
                location: LocationOutput::from(&location),
                days: forecast,
                best,
            };
            output(&out, json_mode);
        }

        ForecastCommands::Purge { all } => {
            let max_age = if all {
                Duration::zero()
            } else {
                Duration::hours(i64::from(ctx.config.forecast.cache_max_age_hours))
            };
            let removed = SqliteForecastCacheRepository::new(ctx.pool.clone())
                .purge_older_than(max_age)
                .await
                .context("Failed to purge forecast cache")?;
            tracing::info!(removed, "forecast cache purged");
            output(&PurgeOutput { success: true, removed }, json_mode);
        }
    }

    Ok(())
}

//! Location CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::AppContext;
use crate::cli::display::{
    action_success, colorize_state, list_table, output, render_list, short_id, truncate, CommandOutput,
};
use crate::cli::id_resolver::resolve_location_id;
use crate::domain::errors::DomainError;
use crate::domain::models::{Config, Location, Task, TaskFilter};

#[derive(Args, Debug)]
pub struct LocationArgs {
    #[command(subcommand)]
    pub command: LocationCommands,
}

#[derive(Subcommand, Debug)]
pub enum LocationCommands {
    /// Register a location with explicit coordinates
    Add {
        /// Display name, unique across locations
        name: String,
        /// Latitude in degrees (-90 to 90)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees (-180 to 180)
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// IANA timezone, e.g. Asia/Tokyo (defaults to UTC)
        #[arg(long)]
        tz: Option<String>,
    },
    /// List locations
    List,
    /// Show a location and the tasks bound to it
    Show {
        /// Location name or ID prefix
        location: String,
    },
    /// Remove a location; its tasks lose their location and dates
    Remove {
        /// Location name or ID prefix
        location: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct LocationOutput {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl From<&Location> for LocationOutput {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.to_string(),
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            timezone: location.timezone_name().to_string(),
        }
    }
}

impl CommandOutput for LocationOutput {
    fn to_human(&self) -> String {
        action_success(&format!(
            "Location '{}' ({}) at {:.4}, {:.4} [{}]",
            self.name,
            &self.id[..8],
            self.latitude,
            self.longitude,
            self.timezone
        ))
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LocationListOutput {
    pub locations: Vec<LocationOutput>,
    pub total: usize,
}

impl CommandOutput for LocationListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "latitude", "longitude", "timezone"]);
        for location in &self.locations {
            table.add_row(vec![
                location.id[..8].to_string(),
                truncate(&location.name, 30),
                format!("{:.4}", location.latitude),
                format!("{:.4}", location.longitude),
                location.timezone.clone(),
            ]);
        }
        render_list("location", table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LocationDetailOutput {
    pub location: LocationOutput,
    pub tasks: Vec<Task>,
}

impl CommandOutput for LocationDetailOutput {
    fn to_human(&self) -> String {
        let loc = &self.location;
        let mut lines = vec![
            format!("Location: {}", console::style(&loc.name).bold()),
            format!("  ID:          {}", loc.id),
            format!("  Coordinates: {:.4}, {:.4}", loc.latitude, loc.longitude),
            format!("  Timezone:    {}", loc.timezone),
        ];
        if self.tasks.is_empty() {
            lines.push("  Tasks:       none".to_string());
        } else {
            lines.push(format!("  Tasks ({}):", self.tasks.len()));
            for task in &self.tasks {
                lines.push(format!(
                    "    {}  {:<4}  {}  due {}",
                    short_id(&task.id),
                    colorize_state(task.completed),
                    truncate(&task.title, 40),
                    task.deadline.map_or_else(|| "-".to_string(), |d| d.to_string())
                ));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LocationActionOutput {
    pub success: bool,
    pub location_id: String,
    pub message: String,
}

impl CommandOutput for LocationActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: LocationArgs, config: &Config, json_mode: bool) -> Result<()> {
    let ctx = AppContext::open(config).await?;

    match args.command {
        LocationCommands::Add { name, lat, lon, tz } => {
            let location = ctx
                .service
                .add_location(&name, lat, lon, tz.as_deref())
                .await
                .context("Failed to add location")?;
            output(&LocationOutput::from(&location), json_mode);
        }

        LocationCommands::List => {
            let locations = ctx.service.list_locations().await.context("Failed to list locations")?;
            let out = LocationListOutput {
                total: locations.len(),
                locations: locations.iter().map(LocationOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        LocationCommands::Show { location } => {
            let location = resolve_location(&ctx, &location).await?;
            let tasks = ctx
                .service
                .list_tasks(TaskFilter {
                    location_id: Some(location.id),
                    ..Default::default()
                })
                .await
                .context("Failed to list tasks for location")?;
            let out = LocationDetailOutput {
                location: LocationOutput::from(&location),
                tasks,
            };
            output(&out, json_mode);
        }

        LocationCommands::Remove { location } => {
            let location = resolve_location(&ctx, &location).await?;
            ctx.service
                .remove_location(location.id)
                .await
                .context("Failed to remove location")?;
            let out = LocationActionOutput {
                success: true,
                location_id: location.id.to_string(),
                message: format!("Location '{}' removed", location.name),
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

/// Find a location by name, full ID, or unique ID prefix.
pub async fn resolve_location(ctx: &AppContext, name_or_id: &str) -> Result<Location> {
    match ctx.service.resolve_location(name_or_id).await {
        Ok(location) => Ok(location),
        Err(DomainError::LocationNotFound(_)) => {
            let id = resolve_location_id(&ctx.pool, name_or_id)
                .await
                .with_context(|| format!("No location named '{name_or_id}'"))?;
            ctx.service.resolve_location(&id.to_string()).await.map_err(Into::into)
        }
        Err(err) => Err(err.into()),
    }
}

//! Fairday - weather-aware task tracker
//!
//! Fairday keeps a list of outdoor tasks, each bound to a location and a
//! deadline, and picks for every task the day with the lowest forecast
//! precipitation probability before its deadline. A date is held by at most
//! one task per location; earlier-registered tasks may take a date from
//! later ones until it is confirmed.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): candidate selection and task use cases
//! - **Adapters** (`adapters`): SQLite storage, Open-Meteo client, forecast cache
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fairday::adapters::sqlite::{initialize_database, SqliteLocationRepository, SqliteTaskRepository};
//! use fairday::adapters::open_meteo::{OpenMeteoClient, OpenMeteoConfig};
//! use fairday::{Config, TaskService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let pool = initialize_database(&config.database).await?;
//!     let service = TaskService::new(
//!         Arc::new(SqliteTaskRepository::new(pool.clone())),
//!         Arc::new(SqliteLocationRepository::new(pool)),
//!         Arc::new(OpenMeteoClient::new(OpenMeteoConfig::default())?),
//!         config.scheduler,
//!     );
//!     let tokyo = service.add_location("Tokyo", 35.68, 139.69, Some("Asia/Tokyo")).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AssignmentReason, CandidateAssignment, Config, ConflictPolicy, DateWindow, ForecastDay, Location, Task,
    TaskPriority,
};
pub use domain::ports::{ForecastCacheRepository, ForecastProvider, LocationRepository, TaskRepository};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CandidateScheduler, ConflictResolver, NewTask, ScheduleOutcome, TaskService};

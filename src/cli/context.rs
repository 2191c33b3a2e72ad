//! Wiring of configuration, storage and the forecast provider for commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;

use crate::adapters::cache::CachedForecastProvider;
use crate::adapters::open_meteo::{OpenMeteoClient, OpenMeteoConfig};
use crate::adapters::sqlite::{
    initialize_database, SqliteForecastCacheRepository, SqliteLocationRepository, SqliteTaskRepository,
};
use crate::domain::errors::DomainResult;
use crate::domain::models::{Config, ForecastDay};
use crate::domain::ports::ForecastProvider;
use crate::infrastructure::config::ConfigLoader;
use crate::services::TaskService;

/// Service type used by every command.
pub type AppTaskService = TaskService<SqliteTaskRepository, SqliteLocationRepository, ForecastSource>;

/// Forecast provider selected by `forecast.cache_enabled`.
pub enum ForecastSource {
    Live(OpenMeteoClient),
    Cached(CachedForecastProvider<OpenMeteoClient, SqliteForecastCacheRepository>),
}

#[async_trait]
impl ForecastProvider for ForecastSource {
    fn horizon_days(&self) -> u32 {
        match self {
            Self::Live(client) => client.horizon_days(),
            Self::Cached(cached) => cached.horizon_days(),
        }
    }

    async fn get_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        timezone: &str,
    ) -> DomainResult<Vec<ForecastDay>> {
        match self {
            Self::Live(client) => client.get_daily(latitude, longitude, start, end, timezone).await,
            Self::Cached(cached) => cached.get_daily(latitude, longitude, start, end, timezone).await,
        }
    }
}

/// Load configuration from an explicit file or from the project directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Everything a command needs after startup.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub service: AppTaskService,
}

impl AppContext {
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        let client = OpenMeteoClient::new(OpenMeteoConfig::from(&config.forecast))
            .context("Failed to create forecast client")?;
        let forecasts = if config.forecast.cache_enabled {
            let cache = Arc::new(SqliteForecastCacheRepository::new(pool.clone()));
            ForecastSource::Cached(CachedForecastProvider::with_max_age(
                Arc::new(client),
                cache,
                Duration::hours(i64::from(config.forecast.cache_max_age_hours)),
            ))
        } else {
            ForecastSource::Live(client)
        };

        let service = TaskService::new(
            Arc::new(SqliteTaskRepository::new(pool.clone())),
            Arc::new(SqliteLocationRepository::new(pool.clone())),
            Arc::new(forecasts),
            config.scheduler.clone(),
        );

        Ok(Self {
            config: config.clone(),
            pool,
            service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("state/fairday.db").display().to_string();

        let ctx = AppContext::open(&config).await.unwrap();
        assert!(dir.path().join("state/fairday.db").exists());
        assert!(ctx.service.list_locations().await.unwrap().is_empty());
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fairday.yaml");
        std::fs::write(&path, "scheduler:\n  max_candidates: 2\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().scheduler.max_candidates, 2);
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project directory holding config and state.
pub const PROJECT_DIR: &str = ".fairday";

/// Prefix of environment variable overrides, e.g. `FAIRDAY_SCHEDULER__FALLBACK_DAYS`.
pub const ENV_PREFIX: &str = "FAIRDAY_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid fallback_days: {0}. Must be between 1 and 30")]
    InvalidFallbackDays(u32),

    #[error("Invalid max_candidates: {0}. Must be at least 1")]
    InvalidMaxCandidates(usize),

    #[error("Invalid horizon_days: {0}. Must be between 1 and 16")]
    InvalidHorizonDays(u32),

    #[error("Invalid timeout_secs: {0}. Must be at least 1")]
    InvalidTimeout(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .fairday/config.yaml (project config, created by init)
    /// 3. .fairday/local.yaml (project local overrides, optional)
    /// 4. Environment variables (FAIRDAY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`load`](Self::load) with the project directory under `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(PROJECT_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Path of the project config file written by `init`.
    pub fn project_config_path(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(PROJECT_DIR).join("config.yaml")
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        if !(1..=30).contains(&config.scheduler.fallback_days) {
            return Err(ConfigError::InvalidFallbackDays(config.scheduler.fallback_days));
        }
        if config.scheduler.max_candidates == 0 {
            return Err(ConfigError::InvalidMaxCandidates(config.scheduler.max_candidates));
        }

        if !(1..=16).contains(&config.forecast.horizon_days) {
            return Err(ConfigError::InvalidHorizonDays(config.forecast.horizon_days));
        }
        if config.forecast.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.forecast.timeout_secs));
        }
        if !config.forecast.base_url.starts_with("http://") && !config.forecast.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "forecast.base_url must be an http(s) URL, got '{}'",
                config.forecast.base_url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ConflictPolicy;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, ".fairday/fairday.db");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.scheduler.fallback_days, 14);
        assert_eq!(config.scheduler.conflict_policy, ConflictPolicy::EvictLater);
        assert_eq!(config.forecast.horizon_days, 16);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
database:
  path: /custom/path.db
  max_connections: 2
logging:
  level: debug
  format: json
scheduler:
  fallback_days: 21
  max_candidates: 3
  conflict_policy: skip
forecast:
  base_url: http://localhost:8080
  cache_enabled: false
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.database.path, "/custom/path.db");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.rotation, "daily");
        assert_eq!(config.scheduler.fallback_days, 21);
        assert_eq!(config.scheduler.max_candidates, 3);
        assert_eq!(config.scheduler.conflict_policy, ConflictPolicy::Skip);
        assert_eq!(config.scheduler.claim_retries, 3);
        assert!(!config.forecast.cache_enabled);
        assert_eq!(config.forecast.timeout_secs, 10);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));
    }

    #[test]
    fn test_validate_scheduler_bounds() {
        let mut config = Config::default();
        config.scheduler.fallback_days = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFallbackDays(0))
        ));

        config.scheduler.fallback_days = 31;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFallbackDays(31))
        ));

        config.scheduler.fallback_days = 30;
        config.scheduler.max_candidates = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxCandidates(0))
        ));
    }

    #[test]
    fn test_validate_forecast_bounds() {
        let mut config = Config::default();
        config.forecast.horizon_days = 17;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHorizonDays(17))
        ));

        config.forecast.horizon_days = 16;
        config.forecast.base_url = "ftp://example.com".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(PROJECT_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.yaml"),
            "scheduler:\n  fallback_days: 10\n  max_candidates: 2\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        fs::write(dir.join("local.yaml"), "scheduler:\n  fallback_days: 5\n").unwrap();

        let config = temp_env::with_vars_unset(
            ["FAIRDAY_SCHEDULER__FALLBACK_DAYS", "FAIRDAY_LOGGING__LEVEL"],
            || ConfigLoader::load_from_dir(root.path()).unwrap(),
        );

        assert_eq!(config.scheduler.fallback_days, 5, "Local override should win");
        assert_eq!(config.scheduler.max_candidates, 2, "Base value should persist");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_override() {
        let root = tempfile::tempdir().unwrap();
        let config = temp_env::with_vars(
            [
                ("FAIRDAY_SCHEDULER__FALLBACK_DAYS", Some("7")),
                ("FAIRDAY_SCHEDULER__CONFLICT_POLICY", Some("skip")),
                ("FAIRDAY_LOGGING__LEVEL", Some("debug")),
            ],
            || ConfigLoader::load_from_dir(root.path()).unwrap(),
        );

        assert_eq!(config.scheduler.fallback_days, 7);
        assert_eq!(config.scheduler.conflict_policy, ConflictPolicy::Skip);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let result = temp_env::with_var("FAIRDAY_SCHEDULER__FALLBACK_DAYS", Some("90"), || {
            ConfigLoader::load_from_dir(root.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        fs::write(&path, "forecast:\n  horizon_days: 7\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.forecast.horizon_days, 7);
        assert_eq!(ConfigLoader::project_config_path(dir.path()), dir.path().join(".fairday/config.yaml"));
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::assignment::ConflictPolicy;

/// Main configuration structure for fairday
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Candidate-date selection
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Forecast provider and cache
    #[serde(default)]
    pub forecast: ForecastConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file, or `:memory:` for a throwaway database
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".fairday/fairday.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            retention_days: default_retention_days(),
        }
    }
}

/// Candidate-date selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Days searched after the deadline when the deadline window is full (1-30)
    #[serde(default = "default_fallback_days")]
    pub fallback_days: u32,

    /// Candidate dates assigned per task
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// What happens when a wanted date is already taken
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// Re-runs of selection after a concurrent claim of the same date
    #[serde(default = "default_claim_retries")]
    pub claim_retries: u32,
}

const fn default_fallback_days() -> u32 {
    14
}

const fn default_max_candidates() -> usize {
    1
}

const fn default_claim_retries() -> u32 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fallback_days: default_fallback_days(),
            max_candidates: default_max_candidates(),
            conflict_policy: ConflictPolicy::default(),
            claim_retries: default_claim_retries(),
        }
    }
}

/// Forecast provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ForecastConfig {
    /// Base URL of the Open-Meteo API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Days ahead of today the provider can forecast
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,

    /// Serve repeated queries from the local forecast cache
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Maximum age of cached forecast samples in hours
    #[serde(default = "default_cache_max_age_hours")]
    pub cache_max_age_hours: u32,
}

fn default_base_url() -> String {
    "https://api.open-meteo.com".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_horizon_days() -> u32 {
    16
}

const fn default_cache_enabled() -> bool {
    true
}

const fn default_cache_max_age_hours() -> u32 {
    6
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            horizon_days: default_horizon_days(),
            cache_enabled: default_cache_enabled(),
            cache_max_age_hours: default_cache_max_age_hours(),
        }
    }
}

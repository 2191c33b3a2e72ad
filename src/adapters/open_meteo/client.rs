//! Open-Meteo HTTP client.
//!
//! Fetches daily precipitation probability and maximum temperature from the
//! keyless `/v1/forecast` endpoint. Connection failures, 429 and 5xx
//! responses are retried with exponential backoff until the retry budget
//! runs out; other failures surface immediately as `ForecastUnavailable`.
//! Requested ranges are clamped to the horizon, today included.

use std::time::Duration;

use async_trait::async_trait;
use backoff::future::retry_notify;
use backoff::ExponentialBackoff;
use chrono::{NaiveDate, Utc};
use reqwest::{Client, StatusCode};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{parse_timezone, ForecastConfig, ForecastDay};
use crate::domain::ports::ForecastProvider;

use super::models::{ErrorResponse, ForecastResponse, DAILY_VARIABLES};

/// Default base URL of the public forecast API.
pub const OPEN_METEO_API_BASE: &str = "https://api.open-meteo.com";

/// Settings for [`OpenMeteoClient`].
#[derive(Debug, Clone)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub horizon_days: u32,
    /// Total time spent retrying transient failures. Zero disables retries.
    pub retry_budget: Duration,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_API_BASE.to_string(),
            timeout: Duration::from_secs(10),
            horizon_days: 16,
            retry_budget: Duration::from_secs(15),
        }
    }
}

impl From<&ForecastConfig> for OpenMeteoConfig {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            horizon_days: config.horizon_days,
            ..Self::default()
        }
    }
}

/// HTTP client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoClient {
    pub fn new(config: OpenMeteoConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fairday/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::ForecastUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Last date served for `timezone`. Unknown zones fall back to UTC.
    fn last_forecast_day(&self, timezone: &str) -> NaiveDate {
        let now = Utc::now();
        let today = parse_timezone(timezone)
            .map(|tz| now.with_timezone(&tz).date_naive())
            .unwrap_or_else(|_| now.date_naive());
        today
            .checked_add_signed(chrono::Duration::days(i64::from(self.config.horizon_days) - 1))
            .unwrap_or(NaiveDate::MAX)
    }

    fn forecast_url(&self) -> String {
        format!("{}/v1/forecast", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_once(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        timezone: &str,
    ) -> Result<Vec<ForecastDay>, backoff::Error<DomainError>> {
        let query = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("daily", DAILY_VARIABLES.to_string()),
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
            ("timezone", timezone.to_string()),
        ];

        let resp = self
            .http
            .get(self.forecast_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                let err = DomainError::ForecastUnavailable(format!("forecast request failed: {e}"));
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.reason)
                .unwrap_or(body);
            let err = DomainError::ForecastUnavailable(format!("forecast API returned {status}: {reason}"));
            return Err(if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let body: ForecastResponse = resp.json().await.map_err(|e| {
            backoff::Error::permanent(DomainError::ForecastUnavailable(format!(
                "forecast response parse failed: {e}"
            )))
        })?;

        body.daily
            .unwrap_or_default()
            .into_forecast_days()
            .map_err(backoff::Error::permanent)
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    fn horizon_days(&self) -> u32 {
        self.config.horizon_days
    }

    #[tracing::instrument(skip(self), fields(provider = "open-meteo"))]
    async fn get_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        timezone: &str,
    ) -> DomainResult<Vec<ForecastDay>> {
        let end = end.min(self.last_forecast_day(timezone));
        if end < start {
            tracing::debug!(%start, %end, "range outside forecast horizon, skipping request");
            return Ok(Vec::new());
        }

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_elapsed_time: Some(self.config.retry_budget),
            ..ExponentialBackoff::default()
        };

        let days = retry_notify(
            policy,
            || self.fetch_once(latitude, longitude, start, end, timezone),
            |err: DomainError, wait: Duration| {
                tracing::warn!(error = %err, wait_ms = wait.as_millis() as u64, "retrying forecast request");
            },
        )
        .await?;

        tracing::debug!(days = days.len(), "fetched forecast");
        Ok(days)
    }
}

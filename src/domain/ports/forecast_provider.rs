//! Port for daily weather forecasts.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::errors::DomainResult;
use crate::domain::models::ForecastDay;

/// Source of per-day precipitation probability and temperature.
///
/// Treated as an oracle that may return partial or empty data. Dates
/// beyond [`horizon_days`](ForecastProvider::horizon_days) are omitted, not
/// erred. Failures are reported as `DomainError::ForecastUnavailable`.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    /// How many days the provider can forecast, today included.
    fn horizon_days(&self) -> u32;

    /// Daily forecast for `[start, end]` in the given IANA timezone.
    async fn get_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        timezone: &str,
    ) -> DomainResult<Vec<ForecastDay>>;
}

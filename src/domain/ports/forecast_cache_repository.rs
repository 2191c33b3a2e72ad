//! Repository port for stored forecast samples.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::domain::errors::DomainResult;
use crate::domain::models::ForecastDay;

#[async_trait]
pub trait ForecastCacheRepository: Send + Sync {
    /// Samples for `[start, end]` fetched no longer than `max_age` ago.
    ///
    /// Returns `None` unless every date in the range has a fresh sample.
    async fn get_range(
        &self,
        cache_key: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_age: Duration,
    ) -> DomainResult<Option<Vec<ForecastDay>>>;

    /// Insert or refresh samples under `cache_key`.
    async fn store(&self, cache_key: &str, days: &[ForecastDay]) -> DomainResult<()>;

    /// Delete samples fetched longer than `age` ago. Returns rows removed.
    async fn purge_older_than(&self, age: Duration) -> DomainResult<u64>;
}

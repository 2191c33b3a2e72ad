//! Cached wrapper for ForecastProvider backed by stored forecast samples.
//!
//! A range is served from the cache only when every day in it was fetched
//! within `max_age`. Otherwise the inner provider is called and its answer
//! stored. Cache failures never fail a forecast request.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::domain::errors::DomainResult;
use crate::domain::models::ForecastDay;
use crate::domain::ports::{ForecastCacheRepository, ForecastProvider};

/// Default freshness window for cached samples.
pub const DEFAULT_MAX_AGE_HOURS: i64 = 6;

/// Cache key for a location's samples. Coordinates are rounded to about 10 m.
pub fn cache_key(latitude: f64, longitude: f64, timezone: &str) -> String {
    format!("{latitude:.4},{longitude:.4}@{timezone}")
}

/// Cached forecast provider decorator.
pub struct CachedForecastProvider<P: ForecastProvider, C: ForecastCacheRepository> {
    inner: Arc<P>,
    cache: Arc<C>,
    max_age: Duration,
}

impl<P: ForecastProvider, C: ForecastCacheRepository> CachedForecastProvider<P, C> {
    pub fn new(inner: Arc<P>, cache: Arc<C>) -> Self {
        Self::with_max_age(inner, cache, Duration::hours(DEFAULT_MAX_AGE_HOURS))
    }

    pub fn with_max_age(inner: Arc<P>, cache: Arc<C>, max_age: Duration) -> Self {
        Self { inner, cache, max_age }
    }
}

#[async_trait]
impl<P: ForecastProvider + 'static, C: ForecastCacheRepository + 'static> ForecastProvider
    for CachedForecastProvider<P, C>
{
    fn horizon_days(&self) -> u32 {
        self.inner.horizon_days()
    }

    async fn get_daily(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        timezone: &str,
    ) -> DomainResult<Vec<ForecastDay>> {
        let key = cache_key(latitude, longitude, timezone);

        match self.cache.get_range(&key, start, end, self.max_age).await {
            Ok(Some(days)) => {
                tracing::debug!(%key, %start, %end, "forecast cache hit");
                return Ok(days);
            }
            Ok(None) => tracing::debug!(%key, %start, %end, "forecast cache miss"),
            Err(err) => tracing::warn!(error = %err, "forecast cache read failed"),
        }

        let days = self.inner.get_daily(latitude, longitude, start, end, timezone).await?;
        if let Err(err) = self.cache.store(&key, &days).await {
            tracing::warn!(error = %err, "forecast cache write failed");
        }
        Ok(days)
    }
}

//! Mock forecast provider for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ForecastDay;
use crate::domain::ports::ForecastProvider;

/// Serves a fixed set of forecast days and records every request.
#[derive(Debug)]
pub struct MockForecastProvider {
    days: Vec<ForecastDay>,
    horizon_days: u32,
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl MockForecastProvider {
    pub fn new(days: Vec<ForecastDay>) -> Self {
        Self {
            days,
            horizon_days: 16,
            fail: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Build from `(date, probability)` pairs with no temperature.
    pub fn from_probabilities(entries: &[(NaiveDate, u8)]) -> Self {
        Self::new(
            entries
                .iter()
                .map(|(date, p)| ForecastDay::new(*date, Some(*p), None))
                .collect(),
        )
    }

    /// A provider that returns no data for any range.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// A provider whose every call fails, as on a network error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn with_horizon(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every `(start, end)` range requested so far, in order.
    pub async fn requests(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl ForecastProvider for MockForecastProvider {
    fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    async fn get_daily(
        &self,
        _latitude: f64,
        _longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        _timezone: &str,
    ) -> DomainResult<Vec<ForecastDay>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push((start, end));

        if self.fail {
            return Err(DomainError::ForecastUnavailable("mock provider failure".to_string()));
        }

        Ok(self
            .days
            .iter()
            .filter(|d| start <= d.date && d.date <= end)
            .cloned()
            .collect())
    }
}

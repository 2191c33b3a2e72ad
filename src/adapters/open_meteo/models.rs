//! Open-Meteo forecast API response models.
//!
//! Only the fields the scheduler reads are mapped. Daily series are
//! parallel arrays indexed by `time`; any entry may be `null`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{clamp_probability, ForecastDay};

/// Daily variables requested from the forecast endpoint.
pub const DAILY_VARIABLES: &str = "precipitation_probability_mean,temperature_2m_max";

/// Body of a successful `/v1/forecast` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub daily: Option<DailySeries>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailySeries {
    /// ISO dates, local to the requested timezone.
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub precipitation_probability_mean: Vec<Option<f64>>,
    #[serde(default)]
    pub temperature_2m_max: Vec<Option<f64>>,
}

/// Body returned with a 4xx status, e.g. a date beyond the forecast range.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub reason: String,
}

impl DailySeries {
    /// Zip the parallel arrays into forecast days. Missing trailing values
    /// are treated as `null`.
    pub fn into_forecast_days(self) -> DomainResult<Vec<ForecastDay>> {
        self.time
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                    DomainError::ForecastUnavailable(format!("unparseable forecast date '{raw}': {e}"))
                })?;
                let probability = self
                    .precipitation_probability_mean
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(clamp_probability);
                let temperature = self
                    .temperature_2m_max
                    .get(i)
                    .copied()
                    .flatten()
                    .filter(|t| t.is_finite());
                Ok(ForecastDay::new(date, probability, temperature))
            })
            .collect()
    }
}

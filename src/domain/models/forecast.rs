//! Daily forecast data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of forecast for a location.
///
/// Either field may be absent when the provider has no value for that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// Probability of precipitation in percent (0-100).
    pub precipitation_probability: Option<u8>,
    /// Daily temperature in degrees Celsius.
    pub temperature: Option<f64>,
}

impl ForecastDay {
    pub fn new(date: NaiveDate, precipitation_probability: Option<u8>, temperature: Option<f64>) -> Self {
        Self {
            date,
            precipitation_probability: precipitation_probability.map(|p| p.min(100)),
            temperature,
        }
    }

    /// A day with no weather information at all.
    pub fn unknown(date: NaiveDate) -> Self {
        Self {
            date,
            precipitation_probability: None,
            temperature: None,
        }
    }

    pub fn has_precipitation(&self) -> bool {
        self.precipitation_probability.is_some()
    }
}

/// Convert a provider percentage into the 0-100 range, dropping non-finite values.
pub fn clamp_probability(value: f64) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    // Clamped to [0, 100] before the cast, so truncation cannot occur.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(value.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_probability() {
        assert_eq!(clamp_probability(42.4), Some(42));
        assert_eq!(clamp_probability(-3.0), Some(0));
        assert_eq!(clamp_probability(250.0), Some(100));
        assert_eq!(clamp_probability(f64::NAN), None);
    }

    #[test]
    fn test_new_caps_probability_at_100() {
        let day = ForecastDay::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), Some(180), None);
        assert_eq!(day.precipitation_probability, Some(100));
    }
}

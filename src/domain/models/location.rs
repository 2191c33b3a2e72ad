//! Location domain model.
//!
//! A location is resolved once (name, coordinates, timezone) and then shared
//! by every task performed there. Occupancy is scoped per location.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// A named place with coordinates and an optional IANA timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    /// Display name, unique across the location cache.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone identifier, e.g. `Asia/Tokyo`. Absent means UTC.
    pub timezone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            latitude,
            longitude,
            timezone: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Check that the coordinates can be sent to a forecast provider.
    pub fn validate(&self) -> DomainResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::InvalidLocation(format!(
                "latitude {} of '{}' must be within [-90, 90]",
                self.latitude, self.name
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::InvalidLocation(format!(
                "longitude {} of '{}' must be within [-180, 180]",
                self.longitude, self.name
            )));
        }
        Ok(())
    }

    /// Resolved timezone, falling back to UTC for absent or unknown zones.
    pub fn tz(&self) -> Tz {
        self.timezone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// Name of the resolved timezone, as sent to forecast providers.
    pub fn timezone_name(&self) -> &'static str {
        self.tz().name()
    }

    /// Today's calendar date at this location.
    pub fn today(&self) -> NaiveDate {
        self.today_at(Utc::now())
    }

    /// Calendar date at this location for the given instant.
    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz()).date_naive()
    }
}

/// Parse a user-supplied IANA timezone, rejecting unknown identifiers.
pub fn parse_timezone(name: &str) -> DomainResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| DomainError::ValidationFailed(format!("Unknown timezone '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_rejects_out_of_range_coordinates() {
        assert!(Location::new("Sapporo", 43.06, 141.34).validate().is_ok());
        assert!(matches!(
            Location::new("Nowhere", 91.0, 0.0).validate(),
            Err(DomainError::InvalidLocation(_))
        ));
        assert!(matches!(
            Location::new("Nowhere", 0.0, -180.5).validate(),
            Err(DomainError::InvalidLocation(_))
        ));
        assert!(matches!(
            Location::new("Nowhere", f64::NAN, 0.0).validate(),
            Err(DomainError::InvalidLocation(_))
        ));
    }

    #[test]
    fn test_today_uses_location_timezone() {
        let tokyo = Location::new("Tokyo", 35.68, 139.69).with_timezone("Asia/Tokyo");
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 16, 0, 0).unwrap();
        assert_eq!(tokyo.today_at(now), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let utc = Location::new("Null Island", 0.0, 0.0);
        assert_eq!(utc.today_at(now), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let loc = Location::new("Somewhere", 10.0, 10.0).with_timezone("Mars/Olympus");
        assert_eq!(loc.timezone_name(), "UTC");
        assert!(parse_timezone("Mars/Olympus").is_err());
        assert!(parse_timezone("Europe/Paris").is_ok());
    }
}

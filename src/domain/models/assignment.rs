//! Candidate assignments and the occupancy records they create.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::forecast::ForecastDay;

/// Why a candidate date was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentReason {
    /// Best-ranked free day inside the deadline window.
    LowPrecipitation,
    /// Taken over from a later-registered, unconfirmed occupant.
    PriorityClaim,
    /// Best-ranked free day after the deadline.
    ReserveDate,
    /// Chosen without any precipitation value.
    NoWeatherData,
}

impl AssignmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowPrecipitation => "low_precipitation",
            Self::PriorityClaim => "priority_claim",
            Self::ReserveDate => "reserve_date",
            Self::NoWeatherData => "no_weather_data",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low_precipitation" => Some(Self::LowPrecipitation),
            "priority_claim" => Some(Self::PriorityClaim),
            "reserve_date" => Some(Self::ReserveDate),
            "no_weather_data" => Some(Self::NoWeatherData),
            _ => None,
        }
    }

    /// Sentence shown to the user next to the date.
    pub fn description(&self) -> &'static str {
        match self {
            Self::LowPrecipitation => "lowest precipitation probability before the deadline",
            Self::PriorityClaim => "claimed from a later-registered task",
            Self::ReserveDate => "reserve date after the deadline",
            Self::NoWeatherData => "no weather data available",
        }
    }
}

impl std::fmt::Display for AssignmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A date chosen for a task.
///
/// Produced by the scheduler, persisted by the task repository. An
/// unconfirmed assignment is superseded by the next scheduling run; a
/// confirmed one stays until its task is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAssignment {
    pub date: NaiveDate,
    pub precipitation_probability: Option<u8>,
    pub temperature: Option<f64>,
    pub reason: AssignmentReason,
    pub confirmed: bool,
    /// The date lies after the task's deadline.
    pub reserve: bool,
    /// Occupant the caller must invalidate before persisting this date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evicts: Option<Uuid>,
}

impl CandidateAssignment {
    pub fn from_forecast(day: &ForecastDay, reason: AssignmentReason, reserve: bool) -> Self {
        Self {
            date: day.date,
            precipitation_probability: day.precipitation_probability,
            temperature: day.temperature,
            reason,
            confirmed: false,
            reserve,
            evicts: None,
        }
    }

    /// A date picked by calendar enumeration, with no weather attached.
    pub fn without_weather(date: NaiveDate, reserve: bool) -> Self {
        Self {
            date,
            precipitation_probability: None,
            temperature: None,
            reason: AssignmentReason::NoWeatherData,
            confirmed: false,
            reserve,
            evicts: None,
        }
    }

    pub fn evicting(mut self, occupant: Uuid) -> Self {
        self.evicts = Some(occupant);
        self.reason = AssignmentReason::PriorityClaim;
        self
    }
}

/// The task currently holding a (location, date) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub task_id: Uuid,
    pub task_created_at: DateTime<Utc>,
    pub confirmed: bool,
    pub reserve: bool,
}

/// The task asking for a date; used to decide eviction rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub task_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// How a requested date that is already occupied is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Earlier-registered tasks may take dates from later-registered,
    /// unconfirmed occupants.
    #[default]
    EvictLater,
    /// Strict first-come-first-served: occupied dates are always skipped.
    Skip,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvictLater => "evict_later",
            Self::Skip => "skip",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_round_trip() {
        for reason in [
            AssignmentReason::LowPrecipitation,
            AssignmentReason::PriorityClaim,
            AssignmentReason::ReserveDate,
            AssignmentReason::NoWeatherData,
        ] {
            assert_eq!(AssignmentReason::from_str(reason.as_str()), Some(reason));
        }
        assert_eq!(AssignmentReason::NoWeatherData.description(), "no weather data available");
    }

    #[test]
    fn test_evicting_switches_reason() {
        let day = ForecastDay::new(NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(), Some(5), Some(8.0));
        let victim = Uuid::new_v4();
        let assignment = CandidateAssignment::from_forecast(&day, AssignmentReason::LowPrecipitation, false)
            .evicting(victim);
        assert_eq!(assignment.evicts, Some(victim));
        assert_eq!(assignment.reason, AssignmentReason::PriorityClaim);
        assert_eq!(assignment.precipitation_probability, Some(5));
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: ConflictPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, ConflictPolicy::Skip);
        assert_eq!(ConflictPolicy::default().as_str(), "evict_later");
    }
}

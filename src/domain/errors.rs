//! Domain errors for the fairday scheduler.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur while tracking and scheduling tasks.
///
/// None of these are fatal to the process. The caller decides whether to
/// retry, prompt for different input, or keep the task without a date.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("No candidate date found for task {task_id}")]
    NoCandidateFound { task_id: Uuid },

    #[error("Occupancy conflict: {date} is already claimed at location {location_id}")]
    OccupancyConflict { location_id: Uuid, date: NaiveDate },

    #[error("Deadline {deadline} is before {today} and no fallback date is available")]
    EmptyForecastWindow { deadline: NaiveDate, today: NaiveDate },

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Task {0} has a confirmed candidate date and cannot be rescheduled")]
    AssignmentConfirmed(Uuid),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DomainError {
    /// Whether re-running the selection may succeed without user input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OccupancyConflict { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

//! Task domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority of a tracked task. Informational only; scheduling order is
/// decided by registration time, not by priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked task, optionally bound to a location and a deadline.
///
/// Only tasks with both a location and a deadline receive candidate dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub location_id: Option<Uuid>,
    /// Calendar date, local to the location's timezone.
    pub deadline: Option<NaiveDate>,
    pub priority: TaskPriority,
    pub completed: bool,
    /// Registration time; earlier tasks win date conflicts.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            location_id: None,
            deadline: None,
            priority: TaskPriority::Medium,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_location(mut self, location_id: Uuid) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = created_at;
        self
    }

    /// Whether the task carries everything the scheduler needs.
    pub fn is_schedulable(&self) -> bool {
        !self.completed && self.location_id.is_some() && self.deadline.is_some()
    }
}

/// Filter for listing tasks.
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub location_id: Option<Uuid>,
    pub completed: Option<bool>,
    pub limit: Option<usize>,
}

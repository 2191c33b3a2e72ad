//! Task service implementing business logic.
//!
//! Orchestrates tasks, locations and candidate scheduling. This is the
//! only place where a selection is turned into storage writes: evictions
//! first, then the assignment itself, retried when another writer claims
//! the same date in between.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    parse_timezone, CandidateAssignment, DateWindow, ForecastDay, Location, SchedulerConfig, Task,
    TaskFilter, TaskPriority,
};
use crate::domain::ports::{ForecastProvider, LocationRepository, TaskRepository};
use crate::services::candidate_scheduler::{CandidateScheduler, ScheduleRequest};

/// Upper bound on tasks rescheduled by one eviction cascade.
const MAX_CASCADE: usize = 32;

/// Input for [`TaskService::create_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub location_id: Option<Uuid>,
    pub deadline: Option<NaiveDate>,
    pub priority: TaskPriority,
}

/// Partial update for [`TaskService::update_task`]. `None` leaves a field as is;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub location_id: Option<Option<Uuid>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub priority: Option<TaskPriority>,
}

impl TaskUpdate {
    fn touches_schedule(&self) -> bool {
        self.location_id.is_some() || self.deadline.is_some()
    }
}

/// Result of a successful scheduling run.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub task: Task,
    pub assignments: Vec<CandidateAssignment>,
    /// Tasks whose candidate dates were invalidated to make room.
    pub evicted: Vec<Uuid>,
}

/// Result of [`TaskService::update_task`].
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub task: Task,
    /// Present when the change caused a successful reschedule.
    pub schedule: Option<ScheduleOutcome>,
}

pub struct TaskService<T: TaskRepository, L: LocationRepository, F: ForecastProvider> {
    tasks: Arc<T>,
    locations: Arc<L>,
    forecasts: Arc<F>,
    scheduler: CandidateScheduler<F, T>,
    config: SchedulerConfig,
}

impl<T: TaskRepository, L: LocationRepository, F: ForecastProvider> TaskService<T, L, F> {
    pub fn new(tasks: Arc<T>, locations: Arc<L>, forecasts: Arc<F>, config: SchedulerConfig) -> Self {
        let scheduler = CandidateScheduler::new(forecasts.clone(), tasks.clone(), &config);
        Self {
            tasks,
            locations,
            forecasts,
            scheduler,
            config,
        }
    }

    // ---- Tasks ----

    pub async fn create_task(&self, new: NewTask) -> DomainResult<Task> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(DomainError::ValidationFailed("task title cannot be empty".to_string()));
        }
        if let Some(location_id) = new.location_id {
            self.get_location(location_id).await?;
        }

        let mut task = Task::new(title).with_priority(new.priority);
        task.location_id = new.location_id;
        task.deadline = new.deadline;

        self.tasks.create(&task).await?;
        tracing::info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    pub async fn get_task(&self, id: Uuid) -> DomainResult<Option<Task>> {
        self.tasks.get(id).await
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        self.tasks.list(filter).await
    }

    pub async fn assignments(&self, task_id: Uuid) -> DomainResult<Vec<CandidateAssignment>> {
        self.tasks.assignments(task_id).await
    }

    /// Apply an update. A changed deadline or location reschedules the task;
    /// a confirmed date keeps its deadline change unscheduled and refuses a
    /// location change.
    pub async fn update_task(
        &self,
        id: Uuid,
        update: TaskUpdate,
        today: Option<NaiveDate>,
    ) -> DomainResult<UpdateOutcome> {
        let mut task = self.require_task(id).await?;
        let confirmed = self.has_confirmed(id).await?;

        if let Some(title) = &update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(DomainError::ValidationFailed("task title cannot be empty".to_string()));
            }
            task.title = title.to_string();
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(location_id) = update.location_id {
            if confirmed && location_id != task.location_id {
                return Err(DomainError::AssignmentConfirmed(id));
            }
            if let Some(location_id) = location_id {
                self.get_location(location_id).await?;
            }
            task.location_id = location_id;
        }
        if let Some(deadline) = update.deadline {
            task.deadline = deadline;
        }

        task.updated_at = Utc::now();
        self.tasks.update(&task).await?;

        if !update.touches_schedule() || confirmed {
            return Ok(UpdateOutcome { task, schedule: None });
        }
        if !task.is_schedulable() {
            self.tasks.invalidate(id).await?;
            return Ok(UpdateOutcome { task, schedule: None });
        }

        match self.schedule_task(id, today).await {
            Ok(outcome) => Ok(UpdateOutcome {
                task: outcome.task.clone(),
                schedule: Some(outcome),
            }),
            Err(DomainError::NoCandidateFound { .. } | DomainError::EmptyForecastWindow { .. }) => {
                tracing::warn!(task_id = %id, "task updated but no candidate date is available");
                Ok(UpdateOutcome { task, schedule: None })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn delete_task(&self, id: Uuid) -> DomainResult<()> {
        self.tasks.delete(id).await?;
        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Mark a task done and release its unconfirmed dates.
    pub async fn complete_task(&self, id: Uuid) -> DomainResult<Task> {
        let mut task = self.require_task(id).await?;
        if task.completed {
            return Ok(task);
        }
        task.completed = true;
        task.updated_at = Utc::now();
        self.tasks.update(&task).await?;
        let released = self.tasks.invalidate(id).await?;
        tracing::info!(task_id = %id, released, "task completed");
        Ok(task)
    }

    // ---- Scheduling ----

    /// Select candidate dates for a task and persist them.
    ///
    /// `today` defaults to the current date in the location's timezone.
    /// Fails with `NoCandidateFound` when nothing can be assigned; the task
    /// is kept with no dates in that case.
    #[tracing::instrument(skip(self))]
    pub async fn schedule_task(&self, task_id: Uuid, today: Option<NaiveDate>) -> DomainResult<ScheduleOutcome> {
        let task = self.require_task(task_id).await?;
        if task.completed {
            return Err(DomainError::ValidationFailed(format!("task {task_id} is already completed")));
        }
        let location_id = task
            .location_id
            .ok_or_else(|| DomainError::ValidationFailed(format!("task {task_id} has no location")))?;
        let deadline = task
            .deadline
            .ok_or_else(|| DomainError::ValidationFailed(format!("task {task_id} has no deadline")))?;
        if self.has_confirmed(task_id).await? {
            return Err(DomainError::AssignmentConfirmed(task_id));
        }

        let location = self.get_location(location_id).await?;
        let today = today.unwrap_or_else(|| location.today());
        let request = ScheduleRequest {
            task_id,
            task_created_at: task.created_at,
            location: &location,
            deadline,
        };

        // Evictions persist across retries.
        let mut evicted = Vec::new();
        let mut attempt = 0;
        loop {
            let picks = match self.scheduler.select(&request, today, self.config.max_candidates).await {
                Ok(picks) => picks,
                Err(err @ DomainError::EmptyForecastWindow { .. }) => {
                    self.tasks.invalidate(task_id).await?;
                    return Err(err);
                }
                Err(err) => return Err(err),
            };
            if picks.is_empty() {
                self.tasks.invalidate(task_id).await?;
                return Err(DomainError::NoCandidateFound { task_id });
            }

            for victim in picks.iter().filter_map(|p| p.evicts) {
                if !evicted.contains(&victim) {
                    self.scheduler.resolver().evict(victim).await?;
                    evicted.push(victim);
                }
            }

            match self.tasks.assign(task_id, location_id, &picks).await {
                Ok(()) => {
                    tracing::info!(
                        %task_id,
                        date = %picks[0].date,
                        reason = %picks[0].reason,
                        evicted = evicted.len(),
                        "candidate date assigned"
                    );
                    return Ok(ScheduleOutcome {
                        task,
                        assignments: picks,
                        evicted,
                    });
                }
                Err(err) if err.is_retryable() && attempt < self.config.claim_retries => {
                    attempt += 1;
                    tracing::warn!(%task_id, attempt, error = %err, "date claimed concurrently, selecting again");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Reschedule tasks that lost their dates to an eviction, following any
    /// further evictions they cause. Failures are reported per task.
    pub async fn reschedule_evicted(
        &self,
        evicted: &[Uuid],
        today: Option<NaiveDate>,
    ) -> Vec<(Uuid, DomainResult<ScheduleOutcome>)> {
        let mut queue: VecDeque<Uuid> = evicted.iter().copied().collect();
        let mut results = Vec::new();

        while let Some(task_id) = queue.pop_front() {
            if results.len() >= MAX_CASCADE {
                tracing::warn!(remaining = queue.len() + 1, "eviction cascade limit reached");
                break;
            }
            let result = self.schedule_task(task_id, today).await;
            if let Ok(outcome) = &result {
                queue.extend(outcome.evicted.iter().copied());
            }
            results.push((task_id, result));
        }
        results
    }

    /// Lock one candidate date. Without `date`, the task must have exactly one.
    pub async fn confirm_candidate(&self, task_id: Uuid, date: Option<NaiveDate>) -> DomainResult<CandidateAssignment> {
        self.require_task(task_id).await?;
        let assignments = self.tasks.assignments(task_id).await?;

        let chosen = match date {
            Some(date) => assignments.into_iter().find(|a| a.date == date).ok_or_else(|| {
                DomainError::ValidationFailed(format!("task {task_id} has no candidate on {date}"))
            })?,
            None => match assignments.len() {
                0 => {
                    return Err(DomainError::ValidationFailed(format!(
                        "task {task_id} has no candidate date to confirm"
                    )))
                }
                1 => assignments.into_iter().next().ok_or(DomainError::TaskNotFound(task_id))?,
                n => {
                    return Err(DomainError::ValidationFailed(format!(
                        "task {task_id} has {n} candidate dates; choose one"
                    )))
                }
            },
        };

        if chosen.confirmed {
            return Ok(chosen);
        }
        self.tasks.confirm(task_id, chosen.date).await?;
        tracing::info!(%task_id, date = %chosen.date, "candidate date confirmed");
        Ok(CandidateAssignment {
            confirmed: true,
            ..chosen
        })
    }

    // ---- Locations ----

    pub async fn add_location(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
        timezone: Option<&str>,
    ) -> DomainResult<Location> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::ValidationFailed("location name cannot be empty".to_string()));
        }
        let mut location = Location::new(name, latitude, longitude);
        if let Some(tz) = timezone {
            location = location.with_timezone(parse_timezone(tz)?.name());
        }
        location.validate()?;

        self.locations.create(&location).await?;
        tracing::info!(location_id = %location.id, name = %location.name, "location added");
        Ok(location)
    }

    pub async fn list_locations(&self) -> DomainResult<Vec<Location>> {
        self.locations.list().await
    }

    /// Look a location up by UUID or by name (case-insensitive).
    pub async fn resolve_location(&self, name_or_id: &str) -> DomainResult<Location> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            if let Some(location) = self.locations.get(id).await? {
                return Ok(location);
            }
        }
        self.locations
            .get_by_name(name_or_id)
            .await?
            .ok_or_else(|| DomainError::LocationNotFound(name_or_id.to_string()))
    }

    pub async fn remove_location(&self, id: Uuid) -> DomainResult<()> {
        self.locations.delete(id).await?;
        tracing::info!(location_id = %id, "location removed");
        Ok(())
    }

    /// Forecast for the next `days` days at a location, capped at the
    /// provider horizon.
    pub async fn forecast(&self, location: &Location, today: Option<NaiveDate>, days: u32) -> DomainResult<Vec<ForecastDay>> {
        location.validate()?;
        let today = today.unwrap_or_else(|| location.today());
        let horizon = self.forecasts.horizon_days().max(1);
        let window = DateWindow::starting_at(today, days.min(horizon));
        if window.is_empty() {
            return Ok(Vec::new());
        }
        self.forecasts
            .get_daily(
                location.latitude,
                location.longitude,
                window.start,
                window.end,
                location.timezone_name(),
            )
            .await
    }

    async fn require_task(&self, id: Uuid) -> DomainResult<Task> {
        self.tasks.get(id).await?.ok_or(DomainError::TaskNotFound(id))
    }

    async fn get_location(&self, id: Uuid) -> DomainResult<Location> {
        self.locations
            .get(id)
            .await?
            .ok_or_else(|| DomainError::LocationNotFound(id.to_string()))
    }

    async fn has_confirmed(&self, task_id: Uuid) -> DomainResult<bool> {
        Ok(self.tasks.assignments(task_id).await?.iter().any(|a| a.confirmed))
    }
}

//! Repository port for tasks and their candidate assignments.
//!
//! Besides plain task CRUD, this is the only surface through which the
//! per-location occupancy set is read or written. Implementations own that
//! state; the scheduler never caches it across calls.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CandidateAssignment, Occupant, Task, TaskFilter};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task.
    async fn create(&self, task: &Task) -> DomainResult<()>;

    /// Get a task by ID.
    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>>;

    /// Update an existing task.
    async fn update(&self, task: &Task) -> DomainResult<()>;

    /// Delete a task and all of its assignments.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;

    /// List tasks, oldest registration first.
    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>>;

    /// Current candidate assignments of a task, ascending by date.
    async fn assignments(&self, task_id: Uuid) -> DomainResult<Vec<CandidateAssignment>>;

    /// Dates already assigned to any task at the location.
    async fn occupied_dates(&self, location_id: Uuid) -> DomainResult<BTreeSet<NaiveDate>>;

    /// The strongest claim on a (location, date) pair: a confirmed occupant
    /// first, then an in-deadline one, then the earliest-registered.
    async fn occupant(&self, location_id: Uuid, date: NaiveDate) -> DomainResult<Option<Occupant>>;

    /// Replace every assignment of `task_id` with `assignments`.
    ///
    /// Fails with `OccupancyConflict` when a non-reserve date is claimed by
    /// another task in the meantime.
    async fn assign(
        &self,
        task_id: Uuid,
        location_id: Uuid,
        assignments: &[CandidateAssignment],
    ) -> DomainResult<()>;

    /// Clear the unconfirmed assignments of a task. Returns the number removed.
    async fn invalidate(&self, task_id: Uuid) -> DomainResult<u64>;

    /// Lock one of the task's assignments and drop its other candidates.
    async fn confirm(&self, task_id: Uuid, date: NaiveDate) -> DomainResult<()>;
}

//! SQLite implementation of the TaskRepository.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_date, format_datetime, parse_date, parse_datetime, parse_optional_date, parse_optional_uuid, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AssignmentReason, CandidateAssignment, Occupant, Task, TaskFilter, TaskPriority};
use crate::domain::ports::TaskRepository;

#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &Task) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO tasks (id, title, location_id, deadline, priority, completed, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#
        )
        .bind(task.id.to_string())
        .bind(&task.title)
        .bind(task.location_id.map(|id| id.to_string()))
        .bind(task.deadline.map(format_date))
        .bind(task.priority.as_str())
        .bind(task.completed)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Task>> {
        let row: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Task::try_from).transpose()
    }

    async fn update(&self, task: &Task) -> DomainResult<()> {
        let result = sqlx::query(
            r#"UPDATE tasks SET title = ?, location_id = ?, deadline = ?, priority = ?,
               completed = ?, updated_at = ?
               WHERE id = ?"#
        )
        .bind(&task.title)
        .bind(task.location_id.map(|id| id.to_string()))
        .bind(task.deadline.map(format_date))
        .bind(task.priority.as_str())
        .bind(task.completed)
        .bind(format_datetime(&task.updated_at))
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(task.id));
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::TaskNotFound(id));
        }

        Ok(())
    }

    async fn list(&self, filter: TaskFilter) -> DomainResult<Vec<Task>> {
        let mut query = String::from("SELECT * FROM tasks WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(location_id) = &filter.location_id {
            query.push_str(" AND location_id = ?");
            bindings.push(location_id.to_string());
        }
        if let Some(completed) = filter.completed {
            query.push_str(if completed { " AND completed = 1" } else { " AND completed = 0" });
        }

        query.push_str(" ORDER BY created_at ASC");
        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, TaskRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TaskRow> = q.fetch_all(&self.pool).await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn assignments(&self, task_id: Uuid) -> DomainResult<Vec<CandidateAssignment>> {
        let rows: Vec<AssignmentRow> = sqlx::query_as(
            r#"SELECT date, precipitation_probability, temperature, reason, confirmed, reserve
               FROM candidate_assignments WHERE task_id = ? ORDER BY date"#
        )
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CandidateAssignment::try_from).collect()
    }

    async fn occupied_dates(&self, location_id: Uuid) -> DomainResult<BTreeSet<NaiveDate>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT date FROM candidate_assignments WHERE location_id = ?")
                .bind(location_id.to_string())
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(|(date,)| parse_date(date)).collect()
    }

    async fn occupant(&self, location_id: Uuid, date: NaiveDate) -> DomainResult<Option<Occupant>> {
        let row: Option<OccupantRow> = sqlx::query_as(
            r#"SELECT a.task_id, t.created_at AS task_created_at, a.confirmed, a.reserve
               FROM candidate_assignments a
               JOIN tasks t ON t.id = a.task_id
               WHERE a.location_id = ? AND a.date = ?
               ORDER BY a.confirmed DESC, a.reserve ASC, t.created_at ASC
               LIMIT 1"#
        )
        .bind(location_id.to_string())
        .bind(format_date(date))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Occupant::try_from).transpose()
    }

    async fn assign(
        &self,
        task_id: Uuid,
        location_id: Uuid,
        assignments: &[CandidateAssignment],
    ) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM candidate_assignments WHERE task_id = ?")
            .bind(task_id.to_string())
            .execute(&mut *tx)
            .await?;

        let now = format_datetime(&Utc::now());
        for assignment in assignments {
            sqlx::query(
                r#"INSERT INTO candidate_assignments (task_id, location_id, date, precipitation_probability,
                   temperature, reason, confirmed, reserve, created_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#
            )
            .bind(task_id.to_string())
            .bind(location_id.to_string())
            .bind(format_date(assignment.date))
            .bind(assignment.precipitation_probability.map(i64::from))
            .bind(assignment.temperature)
            .bind(assignment.reason.as_str())
            .bind(assignment.confirmed)
            .bind(assignment.reserve)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|err| {
                if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                    DomainError::OccupancyConflict {
                        location_id,
                        date: assignment.date,
                    }
                } else {
                    DomainError::from(err)
                }
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn invalidate(&self, task_id: Uuid) -> DomainResult<u64> {
        let result = sqlx::query("DELETE FROM candidate_assignments WHERE task_id = ? AND confirmed = 0")
            .bind(task_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn confirm(&self, task_id: Uuid, date: NaiveDate) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE candidate_assignments SET confirmed = 1 WHERE task_id = ? AND date = ?")
            .bind(task_id.to_string())
            .bind(format_date(date))
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ValidationFailed(format!(
                "task {task_id} has no candidate on {date}"
            )));
        }

        sqlx::query("DELETE FROM candidate_assignments WHERE task_id = ? AND date != ?")
            .bind(task_id.to_string())
            .bind(format_date(date))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    location_id: Option<String>,
    deadline: Option<String>,
    priority: String,
    completed: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = DomainError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let priority = TaskPriority::from_str(&row.priority)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid priority: {}", row.priority)))?;

        Ok(Task {
            id: parse_uuid(&row.id)?,
            title: row.title,
            location_id: parse_optional_uuid(row.location_id)?,
            deadline: parse_optional_date(row.deadline)?,
            priority,
            completed: row.completed,
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    date: String,
    precipitation_probability: Option<i64>,
    temperature: Option<f64>,
    reason: String,
    confirmed: bool,
    reserve: bool,
}

impl TryFrom<AssignmentRow> for CandidateAssignment {
    type Error = DomainError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let reason = AssignmentReason::from_str(&row.reason)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid reason: {}", row.reason)))?;
        let precipitation_probability = row
            .precipitation_probability
            .map(u8::try_from)
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(CandidateAssignment {
            date: parse_date(&row.date)?,
            precipitation_probability,
            temperature: row.temperature,
            reason,
            confirmed: row.confirmed,
            reserve: row.reserve,
            evicts: None,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OccupantRow {
    task_id: String,
    task_created_at: String,
    confirmed: bool,
    reserve: bool,
}

impl TryFrom<OccupantRow> for Occupant {
    type Error = DomainError;

    fn try_from(row: OccupantRow) -> Result<Self, Self::Error> {
        Ok(Occupant {
            task_id: parse_uuid(&row.task_id)?,
            task_created_at: parse_datetime(&row.task_created_at)?,
            confirmed: row.confirmed,
            reserve: row.reserve,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteLocationRepository};
    use crate::domain::models::{ForecastDay, Location};
    use crate::domain::ports::LocationRepository;
    use chrono::Duration;

    async fn setup_test_repo() -> (SqliteTaskRepository, Location) {
        let pool = create_migrated_test_pool().await.unwrap();
        let location = Location::new("Allotment", 51.5, -0.12);
        SqliteLocationRepository::new(pool.clone()).create(&location).await.unwrap();
        (SqliteTaskRepository::new(pool), location)
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    fn candidate(day: u32, reserve: bool) -> CandidateAssignment {
        CandidateAssignment::from_forecast(
            &ForecastDay::new(d(day), Some(10), Some(12.5)),
            AssignmentReason::LowPrecipitation,
            reserve,
        )
    }

    #[tokio::test]
    async fn test_create_get_update_task() {
        let (repo, location) = setup_test_repo().await;
        let mut task = Task::new("Mow lawn").with_location(location.id).with_deadline(d(5));

        repo.create(&task).await.unwrap();
        let stored = repo.get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Mow lawn");
        assert_eq!(stored.deadline, Some(d(5)));
        assert_eq!(stored.created_at, task.created_at);

        task.completed = true;
        task.priority = TaskPriority::High;
        repo.update(&task).await.unwrap();
        let stored = repo.get(task.id).await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.priority, TaskPriority::High);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_task() {
        let (repo, _) = setup_test_repo().await;
        let task = Task::new("Ghost");
        assert!(matches!(repo.update(&task).await, Err(DomainError::TaskNotFound(_))));
        assert!(matches!(repo.delete(task.id).await, Err(DomainError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_orders_by_registration() {
        let (repo, location) = setup_test_repo().await;
        let base = Utc::now();
        let later = Task::new("Later").with_created_at(base + Duration::seconds(5));
        let earlier = Task::new("Earlier").with_location(location.id).with_created_at(base);
        repo.create(&later).await.unwrap();
        repo.create(&earlier).await.unwrap();

        let all = repo.list(TaskFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(), vec!["Earlier", "Later"]);

        let at_location = repo
            .list(TaskFilter {
                location_id: Some(location.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(at_location.len(), 1);
    }

    #[tokio::test]
    async fn test_assign_replaces_previous_candidates() {
        let (repo, location) = setup_test_repo().await;
        let task = Task::new("Paint").with_location(location.id);
        repo.create(&task).await.unwrap();

        repo.assign(task.id, location.id, &[candidate(2, false)]).await.unwrap();
        repo.assign(task.id, location.id, &[candidate(4, false), candidate(9, true)]).await.unwrap();

        let stored = repo.assignments(task.id).await.unwrap();
        assert_eq!(stored.iter().map(|a| a.date).collect::<Vec<_>>(), vec![d(4), d(9)]);
        assert!(stored[1].reserve);
        assert_eq!(stored[0].precipitation_probability, Some(10));

        let occupied = repo.occupied_dates(location.id).await.unwrap();
        assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec![d(4), d(9)]);
    }

    #[tokio::test]
    async fn test_second_claim_on_same_day_conflicts() {
        let (repo, location) = setup_test_repo().await;
        let first = Task::new("First").with_location(location.id);
        let second = Task::new("Second").with_location(location.id);
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        repo.assign(first.id, location.id, &[candidate(3, false)]).await.unwrap();
        let err = repo.assign(second.id, location.id, &[candidate(3, false)]).await.unwrap_err();
        assert!(matches!(err, DomainError::OccupancyConflict { date, .. } if date == d(3)));
        assert!(repo.assignments(second.id).await.unwrap().is_empty());

        // Reserve dates may overlap.
        repo.assign(second.id, location.id, &[candidate(3, true)]).await.unwrap();
    }

    #[tokio::test]
    async fn test_occupant_prefers_confirmed_then_in_deadline() {
        let (repo, location) = setup_test_repo().await;
        let base = Utc::now();
        let early = Task::new("Early").with_location(location.id).with_created_at(base);
        let late = Task::new("Late")
            .with_location(location.id)
            .with_created_at(base + Duration::hours(1));
        repo.create(&early).await.unwrap();
        repo.create(&late).await.unwrap();

        repo.assign(early.id, location.id, &[candidate(6, true)]).await.unwrap();
        repo.assign(late.id, location.id, &[candidate(6, false)]).await.unwrap();

        let occupant = repo.occupant(location.id, d(6)).await.unwrap().unwrap();
        assert_eq!(occupant.task_id, late.id);
        assert_eq!(occupant.task_created_at, late.created_at);

        repo.confirm(early.id, d(6)).await.unwrap();
        let occupant = repo.occupant(location.id, d(6)).await.unwrap().unwrap();
        assert_eq!(occupant.task_id, early.id);
        assert!(occupant.confirmed);

        assert!(repo.occupant(location.id, d(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_confirm_drops_other_candidates_and_survives_invalidate() {
        let (repo, location) = setup_test_repo().await;
        let task = Task::new("Harvest").with_location(location.id);
        repo.create(&task).await.unwrap();
        repo.assign(task.id, location.id, &[candidate(2, false), candidate(3, false)]).await.unwrap();

        assert!(matches!(
            repo.confirm(task.id, d(8)).await,
            Err(DomainError::ValidationFailed(_))
        ));

        repo.confirm(task.id, d(3)).await.unwrap();
        assert_eq!(repo.invalidate(task.id).await.unwrap(), 0);

        let stored = repo.assignments(task.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].confirmed);
    }

    #[tokio::test]
    async fn test_delete_task_frees_its_dates() {
        let (repo, location) = setup_test_repo().await;
        let task = Task::new("Prune").with_location(location.id);
        repo.create(&task).await.unwrap();
        repo.assign(task.id, location.id, &[candidate(2, false)]).await.unwrap();

        repo.delete(task.id).await.unwrap();
        assert!(repo.occupied_dates(location.id).await.unwrap().is_empty());
    }
}

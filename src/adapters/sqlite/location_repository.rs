//! SQLite implementation of the LocationRepository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Location;
use crate::domain::ports::LocationRepository;

#[derive(Clone)]
pub struct SqliteLocationRepository {
    pool: SqlitePool,
}

impl SqliteLocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for SqliteLocationRepository {
    async fn create(&self, location: &Location) -> DomainResult<()> {
        location.validate()?;

        sqlx::query(
            r#"INSERT INTO locations (id, name, latitude, longitude, timezone, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#
        )
        .bind(location.id.to_string())
        .bind(&location.name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.timezone)
        .bind(format_datetime(&location.created_at))
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation()) {
                DomainError::ValidationFailed(format!("location '{}' already exists", location.name))
            } else {
                DomainError::from(err)
            }
        })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Location>> {
        let row: Option<LocationRow> = sqlx::query_as("SELECT * FROM locations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Location::try_from).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DomainResult<Option<Location>> {
        let row: Option<LocationRow> = sqlx::query_as("SELECT * FROM locations WHERE name = ? COLLATE NOCASE")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Location::try_from).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Location>> {
        let rows: Vec<LocationRow> = sqlx::query_as("SELECT * FROM locations ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Location::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::LocationNotFound(id.to_string()));
        }

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
    created_at: String,
}

impl TryFrom<LocationRow> for Location {
    type Error = DomainError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Location {
            id: parse_uuid(&row.id)?,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            timezone: row.timezone,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTaskRepository};
    use crate::domain::models::{CandidateAssignment, Task};
    use crate::domain::ports::TaskRepository;
    use chrono::NaiveDate;

    async fn setup_test_repo() -> (SqliteLocationRepository, SqliteTaskRepository) {
        let pool = create_migrated_test_pool().await.unwrap();
        (SqliteLocationRepository::new(pool.clone()), SqliteTaskRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_lookup_by_name() {
        let (repo, _) = setup_test_repo().await;
        let location = Location::new("Kyoto", 35.01, 135.77).with_timezone("Asia/Tokyo");
        repo.create(&location).await.unwrap();

        let by_name = repo.get_by_name("kyoto").await.unwrap().unwrap();
        assert_eq!(by_name.id, location.id);
        assert_eq!(by_name.timezone.as_deref(), Some("Asia/Tokyo"));
        assert!(repo.get_by_name("Osaka").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_and_invalid_coordinates_rejected() {
        let (repo, _) = setup_test_repo().await;
        repo.create(&Location::new("Home", 10.0, 10.0)).await.unwrap();

        let dup = repo.create(&Location::new("Home", 11.0, 11.0)).await;
        assert!(matches!(dup, Err(DomainError::ValidationFailed(_))));

        let bad = repo.create(&Location::new("Nowhere", 95.0, 0.0)).await;
        assert!(matches!(bad, Err(DomainError::InvalidLocation(_))));
    }

    #[tokio::test]
    async fn test_delete_unlinks_tasks_and_drops_assignments() {
        let (repo, tasks) = setup_test_repo().await;
        let location = Location::new("Cabin", 60.0, 10.0);
        repo.create(&location).await.unwrap();

        let task = Task::new("Chop wood").with_location(location.id);
        tasks.create(&task).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        tasks
            .assign(task.id, location.id, &[CandidateAssignment::without_weather(date, false)])
            .await
            .unwrap();

        repo.delete(location.id).await.unwrap();

        let task = tasks.get(task.id).await.unwrap().unwrap();
        assert_eq!(task.location_id, None);
        assert!(tasks.assignments(task.id).await.unwrap().is_empty());
        assert!(matches!(repo.delete(location.id).await, Err(DomainError::LocationNotFound(_))));
    }
}

//! SQLite implementation of the ForecastCacheRepository.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::SqlitePool;

use super::{format_date, format_datetime, parse_date};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DateWindow, ForecastDay};
use crate::domain::ports::ForecastCacheRepository;

#[derive(Clone)]
pub struct SqliteForecastCacheRepository {
    pool: SqlitePool,
}

impl SqliteForecastCacheRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ForecastCacheRepository for SqliteForecastCacheRepository {
    async fn get_range(
        &self,
        cache_key: &str,
        start: NaiveDate,
        end: NaiveDate,
        max_age: Duration,
    ) -> DomainResult<Option<Vec<ForecastDay>>> {
        let window = DateWindow::new(start, end);
        if window.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let fresh_since = format_datetime(&(Utc::now() - max_age));
        let rows: Vec<SampleRow> = sqlx::query_as(
            r#"SELECT date, precipitation_probability, temperature
               FROM forecast_samples
               WHERE cache_key = ? AND date >= ? AND date <= ? AND fetched_at >= ?
               ORDER BY date"#
        )
        .bind(cache_key)
        .bind(format_date(start))
        .bind(format_date(end))
        .bind(fresh_since)
        .fetch_all(&self.pool)
        .await?;

        if rows.len() < window.len() {
            return Ok(None);
        }

        rows.into_iter().map(ForecastDay::try_from).collect::<DomainResult<Vec<_>>>().map(Some)
    }

    async fn store(&self, cache_key: &str, days: &[ForecastDay]) -> DomainResult<()> {
        let now = format_datetime(&Utc::now());
        let mut tx = self.pool.begin().await?;

        for day in days {
            sqlx::query(
                r#"INSERT INTO forecast_samples (cache_key, date, precipitation_probability, temperature, fetched_at)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT(cache_key, date) DO UPDATE SET
                       precipitation_probability = excluded.precipitation_probability,
                       temperature = excluded.temperature,
                       fetched_at = excluded.fetched_at"#
            )
            .bind(cache_key)
            .bind(format_date(day.date))
            .bind(day.precipitation_probability.map(i64::from))
            .bind(day.temperature)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn purge_older_than(&self, age: Duration) -> DomainResult<u64> {
        let cutoff = format_datetime(&(Utc::now() - age));
        let result = sqlx::query("DELETE FROM forecast_samples WHERE fetched_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct SampleRow {
    date: String,
    precipitation_probability: Option<i64>,
    temperature: Option<f64>,
}

impl TryFrom<SampleRow> for ForecastDay {
    type Error = DomainError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        let probability = row
            .precipitation_probability
            .map(u8::try_from)
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;
        Ok(ForecastDay::new(parse_date(&row.date)?, probability, row.temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, day).unwrap()
    }

    async fn setup_test_repo() -> SqliteForecastCacheRepository {
        SqliteForecastCacheRepository::new(create_migrated_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_full_range_hit_and_partial_miss() {
        let repo = setup_test_repo().await;
        let days = vec![
            ForecastDay::new(d(1), Some(20), Some(18.5)),
            ForecastDay::new(d(2), None, None),
        ];
        repo.store("35.0100,135.7700", &days).await.unwrap();

        let hit = repo
            .get_range("35.0100,135.7700", d(1), d(2), Duration::hours(6))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit, days);

        let miss = repo.get_range("35.0100,135.7700", d(1), d(3), Duration::hours(6)).await.unwrap();
        assert!(miss.is_none());

        let other_key = repo.get_range("0.0000,0.0000", d(1), d(2), Duration::hours(6)).await.unwrap();
        assert!(other_key.is_none());
    }

    #[tokio::test]
    async fn test_store_refreshes_and_purge_removes_stale() {
        let repo = setup_test_repo().await;
        repo.store("k", &[ForecastDay::new(d(1), Some(90), None)]).await.unwrap();
        repo.store("k", &[ForecastDay::new(d(1), Some(5), None)]).await.unwrap();

        let hit = repo.get_range("k", d(1), d(1), Duration::hours(1)).await.unwrap().unwrap();
        assert_eq!(hit[0].precipitation_probability, Some(5));

        assert_eq!(repo.purge_older_than(Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(repo.purge_older_than(Duration::seconds(-1)).await.unwrap(), 1);
        assert!(repo.get_range("k", d(1), d(1), Duration::hours(1)).await.unwrap().is_none());
    }
}

//! Common test utilities for integration tests
//!
//! Builds a task service over an in-memory database and a scripted
//! forecast, and registers tasks with controlled registration times.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use fairday::adapters::mock_forecast::MockForecastProvider;
use fairday::adapters::sqlite::{create_migrated_test_pool, SqliteLocationRepository, SqliteTaskRepository};
use fairday::domain::models::{Location, SchedulerConfig, Task};
use fairday::services::{CandidateScheduler, ScheduleRequest, TaskService};
use fairday::TaskRepository;

pub type Service = TaskService<SqliteTaskRepository, SqliteLocationRepository, MockForecastProvider>;
pub type Scheduler = CandidateScheduler<MockForecastProvider, SqliteTaskRepository>;

/// A service, its scheduler, and the repositories behind them.
pub struct Harness {
    pub service: Service,
    pub scheduler: Scheduler,
    pub tasks: Arc<SqliteTaskRepository>,
    pub provider: Arc<MockForecastProvider>,
    pub location: Location,
}

impl Harness {
    /// Scheduler request for a registered task at the harness location.
    pub fn request<'a>(&'a self, task: &Task) -> ScheduleRequest<'a> {
        ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &self.location,
            deadline: task.deadline.unwrap(),
        }
    }
}

/// Day of January 2026.
pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
}

/// Fixed base instant for registration times.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap()
}

/// Forecast for Tokyo, 2026-01-01..05 as 80/10/50/5/90, then a stretch
/// after the deadline whose driest day is 01-07.
pub fn tokyo_forecast() -> MockForecastProvider {
    MockForecastProvider::from_probabilities(&[
        (d(1), 80),
        (d(2), 10),
        (d(3), 50),
        (d(4), 5),
        (d(5), 90),
        (d(6), 40),
        (d(7), 20),
        (d(8), 30),
        (d(9), 60),
        (d(10), 70),
    ])
}

pub fn config() -> SchedulerConfig {
    SchedulerConfig {
        fallback_days: 14,
        ..Default::default()
    }
}

pub async fn harness(provider: MockForecastProvider, config: SchedulerConfig) -> Harness {
    let pool = create_migrated_test_pool().await.unwrap();
    let tasks = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let provider = Arc::new(provider);
    let service = TaskService::new(
        tasks.clone(),
        Arc::new(SqliteLocationRepository::new(pool)),
        provider.clone(),
        config.clone(),
    );
    let scheduler = CandidateScheduler::new(provider.clone(), tasks.clone(), &config);
    let location = service
        .add_location("Tokyo", 35.6762, 139.6503, Some("Asia/Tokyo"))
        .await
        .unwrap();

    Harness {
        service,
        scheduler,
        tasks,
        provider,
        location,
    }
}

/// Register a task at the harness location, `offset_minutes` after the base time.
pub async fn register(h: &Harness, title: &str, deadline: NaiveDate, offset_minutes: i64) -> Task {
    let task = Task::new(title)
        .with_location(h.location.id)
        .with_deadline(deadline)
        .with_created_at(base_time() + Duration::minutes(offset_minutes));
    h.tasks.create(&task).await.unwrap();
    task
}

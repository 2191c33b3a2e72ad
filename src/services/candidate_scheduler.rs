//! Candidate-date selection.
//!
//! Picks the best day(s) to perform a task at a location before its
//! deadline, avoiding dates other tasks already hold there. Selection
//! degrades in stages:
//!
//! 1. Primary window `[today, deadline]`: days ranked by precipitation
//!    probability (unknown last), then warmer first, then earlier. Free days
//!    are taken in rank order. Only when no day is free are dates held by
//!    evictable occupants claimed, latest-registered occupant first.
//! 2. Fallback window after the deadline, capped at the provider horizon:
//!    forecast days ranked the same way, tagged as reserve dates.
//! 3. Bounded calendar enumeration after the deadline with no weather.
//!
//! The scheduler is read-only. Callers evict and persist what it returns.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AssignmentReason, CandidateAssignment, DateWindow, ForecastDay, Location, Occupant, Requester,
    SchedulerConfig,
};
use crate::domain::ports::{ForecastProvider, TaskRepository};
use crate::services::conflict_resolver::ConflictResolver;

/// Everything the scheduler needs to know about the task asking for a date.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRequest<'a> {
    pub task_id: Uuid,
    pub task_created_at: DateTime<Utc>,
    pub location: &'a Location,
    pub deadline: NaiveDate,
}

impl ScheduleRequest<'_> {
    fn requester(&self) -> Requester {
        Requester {
            task_id: self.task_id,
            created_at: self.task_created_at,
        }
    }
}

/// How a ranked day relates to the current occupancy at the location.
enum DayState {
    Free,
    Evictable(Occupant),
    Taken,
}

pub struct CandidateScheduler<F: ForecastProvider, T: TaskRepository> {
    forecasts: Arc<F>,
    resolver: ConflictResolver<T>,
    fallback_days: u32,
}

impl<F: ForecastProvider, T: TaskRepository> CandidateScheduler<F, T> {
    pub fn new(forecasts: Arc<F>, repo: Arc<T>, config: &SchedulerConfig) -> Self {
        Self {
            forecasts,
            resolver: ConflictResolver::new(repo, config.conflict_policy),
            fallback_days: config.fallback_days,
        }
    }

    pub fn resolver(&self) -> &ConflictResolver<T> {
        &self.resolver
    }

    /// Select up to `max_candidates` dates for the request.
    ///
    /// Returns an empty list only when every day of the bounded search is
    /// occupied; when the deadline has already passed that case is reported
    /// as `EmptyForecastWindow` instead.
    #[tracing::instrument(
        skip(self, request),
        fields(task_id = %request.task_id, location = %request.location.name, deadline = %request.deadline)
    )]
    pub async fn select(
        &self,
        request: &ScheduleRequest<'_>,
        today: NaiveDate,
        max_candidates: usize,
    ) -> DomainResult<Vec<CandidateAssignment>> {
        request.location.validate()?;
        if max_candidates == 0 {
            return Ok(Vec::new());
        }

        let (fallback_start, fallback_end, enumeration_end) = self.fallback_bounds(request.deadline, today)?;
        let occupied = self.resolver.occupied_dates(request.location.id).await?;
        let horizon_end = last_forecast_day(today, self.forecasts.horizon_days());

        let primary = DateWindow::new(today, request.deadline);
        if primary.is_empty() {
            tracing::debug!(%today, "deadline already passed, skipping to fallback window");
        } else {
            let picks = self
                .select_in_primary(request, primary, horizon_end, &occupied, max_candidates)
                .await?;
            if !picks.is_empty() {
                return Ok(picks);
            }
        }

        let fallback = DateWindow::new(fallback_start, fallback_end).capped_at(horizon_end);

        let picks = self
            .select_in_fallback(request, fallback, &occupied, max_candidates)
            .await?;
        if !picks.is_empty() {
            return Ok(picks);
        }

        let enumeration = DateWindow::new(fallback_start, enumeration_end);
        let picks = self
            .enumerate_free_days(request, enumeration, &occupied, max_candidates)
            .await?;
        if !picks.is_empty() {
            tracing::info!(date = %picks[0].date, "no forecast-backed date free, using first free calendar day");
            return Ok(picks);
        }

        tracing::warn!(window = %enumeration, "every day of the bounded search is occupied");
        if request.deadline < today {
            return Err(DomainError::EmptyForecastWindow {
                deadline: request.deadline,
                today,
            });
        }
        Ok(Vec::new())
    }

    /// Start and end of the fallback window, and the end of the calendar
    /// enumeration that follows it. Dates past the calendar range fail
    /// validation instead of overflowing.
    fn fallback_bounds(
        &self,
        deadline: NaiveDate,
        today: NaiveDate,
    ) -> DomainResult<(NaiveDate, NaiveDate, NaiveDate)> {
        let out_of_range =
            || DomainError::ValidationFailed(format!("deadline {deadline} is too far in the future to schedule"));
        let span = Duration::days(i64::from(self.fallback_days));
        let start = deadline
            .checked_add_signed(Duration::days(1))
            .ok_or_else(out_of_range)?
            .max(today);
        let end = deadline.checked_add_signed(span).ok_or_else(out_of_range)?;
        let enumeration_end = start
            .pred_opt()
            .and_then(|before| before.checked_add_signed(span))
            .ok_or_else(out_of_range)?;
        Ok((start, end, enumeration_end))
    }

    async fn select_in_primary(
        &self,
        request: &ScheduleRequest<'_>,
        window: DateWindow,
        horizon_end: NaiveDate,
        occupied: &BTreeSet<NaiveDate>,
        max_candidates: usize,
    ) -> DomainResult<Vec<CandidateAssignment>> {
        let forecast = self.fetch(request.location, window.capped_at(horizon_end)).await;
        let days: Vec<ForecastDay> = window
            .days()
            .map(|date| forecast.get(&date).cloned().unwrap_or_else(|| ForecastDay::unknown(date)))
            .collect();
        let ranked = rank_days(&days);
        let requester = request.requester();

        let mut picks = Vec::new();
        let mut evictable = Vec::new();
        for day in &ranked {
            if picks.len() >= max_candidates {
                break;
            }
            match self.day_state(request.location.id, &requester, day.date, occupied).await? {
                DayState::Free => {
                    picks.push(CandidateAssignment::from_forecast(day, primary_reason(day), false));
                }
                DayState::Evictable(occupant) => evictable.push((day, occupant)),
                DayState::Taken => {}
            }
        }

        if picks.is_empty() && !evictable.is_empty() {
            // Stable sort keeps weather rank among occupants registered together.
            evictable.sort_by(|a, b| b.1.task_created_at.cmp(&a.1.task_created_at));
            picks = evictable
                .into_iter()
                .take(max_candidates)
                .map(|(day, occupant)| {
                    tracing::info!(date = %day.date, victim = %occupant.task_id, "claiming date by registration priority");
                    CandidateAssignment::from_forecast(day, primary_reason(day), false).evicting(occupant.task_id)
                })
                .collect();
        }

        if let Some(best) = picks.first() {
            tracing::info!(date = %best.date, reason = %best.reason, "selected candidate date");
        }
        Ok(picks)
    }

    async fn select_in_fallback(
        &self,
        request: &ScheduleRequest<'_>,
        window: DateWindow,
        occupied: &BTreeSet<NaiveDate>,
        max_candidates: usize,
    ) -> DomainResult<Vec<CandidateAssignment>> {
        if window.is_empty() {
            return Ok(Vec::new());
        }
        let forecast: Vec<ForecastDay> = self.fetch(request.location, window).await.into_values().collect();
        let requester = request.requester();

        let mut picks = Vec::new();
        for day in rank_days(&forecast) {
            if picks.len() >= max_candidates {
                break;
            }
            if let DayState::Free = self.day_state(request.location.id, &requester, day.date, occupied).await? {
                picks.push(CandidateAssignment::from_forecast(&day, AssignmentReason::ReserveDate, true));
            }
        }

        if let Some(best) = picks.first() {
            tracing::info!(date = %best.date, %window, "selected reserve date after deadline");
        }
        Ok(picks)
    }

    async fn enumerate_free_days(
        &self,
        request: &ScheduleRequest<'_>,
        window: DateWindow,
        occupied: &BTreeSet<NaiveDate>,
        max_candidates: usize,
    ) -> DomainResult<Vec<CandidateAssignment>> {
        let requester = request.requester();
        let mut picks = Vec::new();
        for date in window.days() {
            if picks.len() >= max_candidates {
                break;
            }
            if let DayState::Free = self.day_state(request.location.id, &requester, date, occupied).await? {
                picks.push(CandidateAssignment::without_weather(date, date > request.deadline));
            }
        }
        Ok(picks)
    }

    async fn day_state(
        &self,
        location_id: Uuid,
        requester: &Requester,
        date: NaiveDate,
        occupied: &BTreeSet<NaiveDate>,
    ) -> DomainResult<DayState> {
        if !occupied.contains(&date) {
            return Ok(DayState::Free);
        }
        let state = match self.resolver.is_occupied(location_id, date).await? {
            None => DayState::Free,
            Some(occupant) if occupant.task_id == requester.task_id => DayState::Free,
            Some(occupant) if self.resolver.may_evict(requester, &occupant) => DayState::Evictable(occupant),
            Some(_) => DayState::Taken,
        };
        Ok(state)
    }

    /// Forecast days inside `window`, keyed by date. Provider failures
    /// degrade to an empty map.
    async fn fetch(&self, location: &Location, window: DateWindow) -> BTreeMap<NaiveDate, ForecastDay> {
        if window.is_empty() {
            return BTreeMap::new();
        }
        let result = self
            .forecasts
            .get_daily(
                location.latitude,
                location.longitude,
                window.start,
                window.end,
                location.timezone_name(),
            )
            .await;

        match result {
            Ok(days) => {
                if days.is_empty() {
                    tracing::warn!(%window, "provider returned no forecast, precipitation unknown");
                }
                days.into_iter()
                    .filter(|d| window.contains(d.date))
                    .map(|d| (d.date, d))
                    .collect()
            }
            Err(err) => {
                tracing::warn!(error = %err, %window, "forecast unavailable, precipitation unknown");
                BTreeMap::new()
            }
        }
    }
}

/// Last date the provider forecasts, counting today as the first of
/// `horizon_days`. Before `today` when the horizon is zero.
fn last_forecast_day(today: NaiveDate, horizon_days: u32) -> NaiveDate {
    today
        .checked_add_signed(Duration::days(i64::from(horizon_days) - 1))
        .unwrap_or(NaiveDate::MAX)
}

fn primary_reason(day: &ForecastDay) -> AssignmentReason {
    if day.has_precipitation() {
        AssignmentReason::LowPrecipitation
    } else {
        AssignmentReason::NoWeatherData
    }
}

/// Order days best-first.
///
/// Known precipitation probability ascending with unknown last, then
/// temperature descending with unknown last, then date ascending.
pub fn rank_days(days: &[ForecastDay]) -> Vec<ForecastDay> {
    let mut ranked = days.to_vec();
    ranked.sort_by(compare_days);
    ranked
}

pub fn compare_days(a: &ForecastDay, b: &ForecastDay) -> Ordering {
    let pa = a.precipitation_probability.map_or(u16::MAX, u16::from);
    let pb = b.precipitation_probability.map_or(u16::MAX, u16::from);
    pa.cmp(&pb)
        .then_with(|| match (a.temperature, b.temperature) {
            (Some(ta), Some(tb)) => tb.total_cmp(&ta),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.date.cmp(&b.date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_forecast::MockForecastProvider;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteLocationRepository, SqliteTaskRepository};
    use crate::domain::models::{ConflictPolicy, Task};
    use crate::domain::ports::LocationRepository;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn test_rank_orders_by_probability_then_temperature_then_date() {
        let days = vec![
            ForecastDay::new(d(1, 1), Some(20), Some(10.0)),
            ForecastDay::new(d(1, 2), None, Some(30.0)),
            ForecastDay::new(d(1, 3), Some(20), Some(15.0)),
            ForecastDay::new(d(1, 4), Some(5), None),
            ForecastDay::new(d(1, 5), Some(20), Some(15.0)),
            ForecastDay::new(d(1, 6), Some(100), None),
        ];
        let order: Vec<_> = rank_days(&days).into_iter().map(|day| day.date).collect();
        assert_eq!(order, vec![d(1, 4), d(1, 3), d(1, 5), d(1, 1), d(1, 6), d(1, 2)]);
    }

    #[test]
    fn test_unknown_temperature_ranks_after_known() {
        let days = vec![
            ForecastDay::new(d(1, 1), Some(10), None),
            ForecastDay::new(d(1, 2), Some(10), Some(-5.0)),
        ];
        assert_eq!(rank_days(&days)[0].date, d(1, 2));
    }

    async fn setup(
        provider: MockForecastProvider,
        policy: ConflictPolicy,
    ) -> (CandidateScheduler<MockForecastProvider, SqliteTaskRepository>, Location) {
        let pool = create_migrated_test_pool().await.unwrap();
        let locations = SqliteLocationRepository::new(pool.clone());
        let location = Location::new("Kyoto", 35.01, 135.77).with_timezone("Asia/Tokyo");
        locations.create(&location).await.unwrap();

        let config = SchedulerConfig {
            conflict_policy: policy,
            fallback_days: 7,
            ..Default::default()
        };
        let scheduler = CandidateScheduler::new(
            Arc::new(provider),
            Arc::new(SqliteTaskRepository::new(pool)),
            &config,
        );
        (scheduler, location)
    }

    #[tokio::test]
    async fn test_invalid_location_fails_before_fetching() {
        let (scheduler, mut location) = setup(MockForecastProvider::empty(), ConflictPolicy::default()).await;
        location.latitude = 123.0;
        let task = Task::new("Paint fence");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: d(1, 5),
        };
        let result = scheduler.select(&request, d(1, 1), 1).await;
        assert!(matches!(result, Err(DomainError::InvalidLocation(_))));
        assert_eq!(scheduler.forecasts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_candidates_returns_empty() {
        let provider = MockForecastProvider::from_probabilities(&[(d(1, 1), 0)]);
        let (scheduler, location) = setup(provider, ConflictPolicy::default()).await;
        let task = Task::new("Paint fence");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: d(1, 5),
        };
        assert!(scheduler.select(&request, d(1, 1), 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_request_is_capped_at_horizon() {
        let provider = MockForecastProvider::from_probabilities(&[(d(1, 2), 30)]).with_horizon(3);
        let (scheduler, location) = setup(provider, ConflictPolicy::default()).await;
        let task = Task::new("Clean gutters");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: d(1, 20),
        };
        let picks = scheduler.select(&request, d(1, 1), 1).await.unwrap();
        assert_eq!(picks[0].date, d(1, 2));
        assert_eq!(scheduler.forecasts.requests().await, vec![(d(1, 1), d(1, 3))]);
    }

    #[tokio::test]
    async fn test_full_horizon_request_spans_exactly_horizon_days() {
        let entries: Vec<_> = (1..=16).map(|day| (d(1, day), if day == 4 { 0 } else { 60 })).collect();
        let provider = MockForecastProvider::from_probabilities(&entries);
        let (scheduler, location) = setup(provider, ConflictPolicy::default()).await;
        let task = Task::new("Clean gutters");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: d(1, 21),
        };
        let picks = scheduler.select(&request, d(1, 1), 1).await.unwrap();
        assert_eq!(picks[0].date, d(1, 4));
        assert_eq!(picks[0].reason, AssignmentReason::LowPrecipitation);
        assert_eq!(scheduler.forecasts.requests().await, vec![(d(1, 1), d(1, 16))]);
    }

    #[tokio::test]
    async fn test_deadline_at_end_of_calendar_is_rejected() {
        let (scheduler, location) = setup(MockForecastProvider::empty(), ConflictPolicy::default()).await;
        let task = Task::new("Someday");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: NaiveDate::MAX,
        };
        let result = scheduler.select(&request, d(1, 1), 1).await;
        assert!(matches!(result, Err(DomainError::ValidationFailed(_))));
        assert_eq!(scheduler.forecasts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_candidates_follow_rank() {
        let provider = MockForecastProvider::from_probabilities(&[
            (d(1, 1), 80),
            (d(1, 2), 10),
            (d(1, 3), 50),
        ]);
        let (scheduler, location) = setup(provider, ConflictPolicy::default()).await;
        let task = Task::new("Hike");
        let request = ScheduleRequest {
            task_id: task.id,
            task_created_at: task.created_at,
            location: &location,
            deadline: d(1, 3),
        };
        let picks = scheduler.select(&request, d(1, 1), 2).await.unwrap();
        let dates: Vec<_> = picks.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(1, 2), d(1, 3)]);
        assert!(picks.iter().all(|p| p.reason == AssignmentReason::LowPrecipitation && !p.reserve));
    }
}

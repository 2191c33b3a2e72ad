//! Occupancy policy for candidate dates.
//!
//! Decides, for a date already claimed at a location, whether the requesting
//! task must skip it or may evict the current occupant. Policy in order:
//!
//! 1. A confirmed assignment is never evicted.
//! 2. Under [`ConflictPolicy::EvictLater`] a task may evict an occupant
//!    registered strictly after it; equal timestamps keep the occupant.
//!    Under [`ConflictPolicy::Skip`] nothing is ever evicted.
//! 3. Eviction clears every assignment of the evicted task. Rescheduling
//!    it is left to the caller.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ConflictPolicy, Occupant, Requester};
use crate::domain::ports::TaskRepository;

pub struct ConflictResolver<T: TaskRepository> {
    repo: Arc<T>,
    policy: ConflictPolicy,
}

impl<T: TaskRepository> ConflictResolver<T> {
    pub fn new(repo: Arc<T>, policy: ConflictPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Dates assigned to any task at the location.
    pub async fn occupied_dates(&self, location_id: Uuid) -> DomainResult<BTreeSet<NaiveDate>> {
        self.repo.occupied_dates(location_id).await
    }

    /// The occupant holding `date` at the location, if any.
    pub async fn is_occupied(&self, location_id: Uuid, date: NaiveDate) -> DomainResult<Option<Occupant>> {
        self.repo.occupant(location_id, date).await
    }

    /// Whether `requester` may take the date held by `occupant`.
    pub fn may_evict(&self, requester: &Requester, occupant: &Occupant) -> bool {
        if occupant.confirmed || occupant.task_id == requester.task_id {
            return false;
        }
        match self.policy {
            ConflictPolicy::Skip => false,
            ConflictPolicy::EvictLater => occupant.task_created_at > requester.created_at,
        }
    }

    /// Invalidate every unconfirmed assignment of the evicted task.
    pub async fn evict(&self, task_id: Uuid) -> DomainResult<u64> {
        let removed = self.repo.invalidate(task_id).await?;
        tracing::info!(%task_id, removed, "evicted candidate assignments of later-registered task");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTaskRepository};
    use chrono::{Duration, Utc};

    async fn resolver(policy: ConflictPolicy) -> ConflictResolver<SqliteTaskRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        ConflictResolver::new(Arc::new(SqliteTaskRepository::new(pool)), policy)
    }

    fn occupant(created_offset_hours: i64, confirmed: bool) -> (Requester, Occupant) {
        let now = Utc::now();
        let requester = Requester {
            task_id: Uuid::new_v4(),
            created_at: now,
        };
        let occupant = Occupant {
            task_id: Uuid::new_v4(),
            task_created_at: now + Duration::hours(created_offset_hours),
            confirmed,
            reserve: false,
        };
        (requester, occupant)
    }

    #[tokio::test]
    async fn test_confirmed_occupant_is_never_evicted() {
        let resolver = resolver(ConflictPolicy::EvictLater).await;
        let (requester, occupant) = occupant(5, true);
        assert!(!resolver.may_evict(&requester, &occupant));
    }

    #[tokio::test]
    async fn test_earlier_task_evicts_later_occupant() {
        let resolver = resolver(ConflictPolicy::EvictLater).await;

        let (requester, later) = occupant(1, false);
        assert!(resolver.may_evict(&requester, &later));

        let (requester, earlier) = occupant(-1, false);
        assert!(!resolver.may_evict(&requester, &earlier));

        let (requester, same_time) = occupant(0, false);
        assert!(!resolver.may_evict(&requester, &same_time));
    }

    #[tokio::test]
    async fn test_skip_policy_never_evicts() {
        let resolver = resolver(ConflictPolicy::Skip).await;
        let (requester, later) = occupant(24, false);
        assert!(!resolver.may_evict(&requester, &later));
    }

    #[tokio::test]
    async fn test_task_never_evicts_itself() {
        let resolver = resolver(ConflictPolicy::EvictLater).await;
        let (requester, mut own) = occupant(1, false);
        own.task_id = requester.task_id;
        assert!(!resolver.may_evict(&requester, &own));
    }

    #[tokio::test]
    async fn test_evict_clears_whole_candidate_set() {
        use crate::adapters::sqlite::SqliteLocationRepository;
        use crate::domain::models::{CandidateAssignment, Location, Task};
        use crate::domain::ports::{LocationRepository, TaskRepository};

        let pool = create_migrated_test_pool().await.unwrap();
        let location = Location::new("Orchard", 40.0, -3.7);
        SqliteLocationRepository::new(pool.clone()).create(&location).await.unwrap();
        let repo = Arc::new(SqliteTaskRepository::new(pool));
        let victim = Task::new("Spray trees").with_location(location.id);
        repo.create(&victim).await.unwrap();

        let d = |day| NaiveDate::from_ymd_opt(2026, 6, day).unwrap();
        repo.assign(
            victim.id,
            location.id,
            &[
                CandidateAssignment::without_weather(d(1), false),
                CandidateAssignment::without_weather(d(2), false),
            ],
        )
        .await
        .unwrap();

        let resolver = ConflictResolver::new(repo.clone(), ConflictPolicy::EvictLater);
        assert!(resolver.is_occupied(location.id, d(2)).await.unwrap().is_some());
        assert_eq!(resolver.evict(victim.id).await.unwrap(), 2);
        assert!(resolver.occupied_dates(location.id).await.unwrap().is_empty());
    }
}

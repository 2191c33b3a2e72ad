//! Application services.
//!
//! - [`CandidateScheduler`]: picks candidate dates from forecast and occupancy
//! - [`ConflictResolver`]: decides whether an occupied date may be taken
//! - [`TaskService`]: task and location use cases, persists selections

pub mod candidate_scheduler;
pub mod conflict_resolver;
pub mod task_service;

pub use candidate_scheduler::{compare_days, rank_days, CandidateScheduler, ScheduleRequest};
pub use conflict_resolver::ConflictResolver;
pub use task_service::{NewTask, ScheduleOutcome, TaskService, TaskUpdate, UpdateOutcome};

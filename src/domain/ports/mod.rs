//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - ForecastProvider: daily weather for a location and date range
//! - TaskRepository: tasks, candidate assignments, and occupancy queries
//! - LocationRepository: the location cache
//! - ForecastCacheRepository: stored forecast samples
//!
//! The scheduler depends only on these traits, never on a concrete engine.

pub mod forecast_cache_repository;
pub mod forecast_provider;
pub mod location_repository;
pub mod task_repository;

pub use forecast_cache_repository::ForecastCacheRepository;
pub use forecast_provider::ForecastProvider;
pub use location_repository::LocationRepository;
pub use task_repository::TaskRepository;

//! Caching decorators for port implementations.

pub mod cached_forecast_provider;

pub use cached_forecast_provider::{cache_key, CachedForecastProvider};

//! Infrastructure adapters for external systems.

pub mod cache;
pub mod mock_forecast;
pub mod open_meteo;
pub mod sqlite;

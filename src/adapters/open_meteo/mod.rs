//! Open-Meteo forecast adapter.
//!
//! Implements [`ForecastProvider`](crate::domain::ports::ForecastProvider)
//! against the public Open-Meteo API. No API key is required.

pub mod client;
pub mod models;

pub use client::{OpenMeteoClient, OpenMeteoConfig, OPEN_METEO_API_BASE};

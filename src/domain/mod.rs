//! Domain layer for the fairday task tracker.
//!
//! This module contains the scheduling models, the error taxonomy, and the
//! port traits that storage and forecast adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};

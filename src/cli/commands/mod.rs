//! CLI command implementations.

pub mod forecast;
pub mod init;
pub mod location;
pub mod task;

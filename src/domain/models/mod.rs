pub mod assignment;
pub mod config;
pub mod forecast;
pub mod location;
pub mod task;
pub mod window;

pub use assignment::{AssignmentReason, CandidateAssignment, ConflictPolicy, Occupant, Requester};
pub use config::{Config, DatabaseConfig, ForecastConfig, LoggingConfig, SchedulerConfig};
pub use forecast::{clamp_probability, ForecastDay};
pub use location::{parse_timezone, Location};
pub use task::{Task, TaskFilter, TaskPriority};
pub use window::DateWindow;

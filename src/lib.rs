pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::adapters::{HttpEventStore, InMemoryEventStore, SystemClock};
pub use crate::config::PlanConfig;
pub use crate::core::{
    attendance::{AttendanceSnapshot, AttendanceTokenSession, SessionConfig, SessionState},
    planner::EventPlanner,
    submitter::SeriesSubmitter,
};
pub use crate::utils::error::{Result, SchedulerError};

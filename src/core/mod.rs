pub mod attendance;
pub mod expander;
pub mod planner;
pub mod schedule;
pub mod submitter;

pub use crate::domain::model::{
    DailyScheduleEntry, EventId, EventTemplate, Occurrence, PlanRequest, PlannedOccurrence,
    RecurrenceRule, SeriesSubmissionResult,
};
pub use crate::domain::ports::{AttendanceService, Clock, EventStore};
pub use crate::utils::error::Result;

use crate::domain::model::{
    DailyScheduleEntry, EventId, EventTemplate, Occurrence, TokenGrant,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persists one occurrence as a live event. Sibling occurrences of a series
/// are created concurrently through the same store.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(
        &self,
        occurrence: &Occurrence,
        template: &EventTemplate,
        schedule: &[DailyScheduleEntry],
    ) -> Result<EventId>;
}

#[async_trait]
pub trait AttendanceService: Send + Sync {
    async fn issue_token(&self, event_id: &EventId) -> Result<TokenGrant>;
    async fn attendance_count(&self, event_id: &EventId) -> Result<u64>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

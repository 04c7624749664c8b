use crate::domain::model::{DailyScheduleEntry, EventId, EventTemplate, Occurrence};
use crate::domain::ports::EventStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: EventId,
    pub title: String,
    pub occurrence: Occurrence,
    pub schedule: Vec<DailyScheduleEntry>,
}

/// Keeps created events in memory; backs dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventStore {
    next_id: Arc<AtomicU64>,
    events: Arc<Mutex<Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<StoredEvent> {
        let mut events = self.events.lock().await.clone();
        events.sort_by_key(|event| event.occurrence.index);
        events
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create_event(
        &self,
        occurrence: &Occurrence,
        template: &EventTemplate,
        schedule: &[DailyScheduleEntry],
    ) -> Result<EventId> {
        let id = EventId::new(format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1));
        self.events.lock().await.push(StoredEvent {
            id: id.clone(),
            title: template.title.clone(),
            occurrence: occurrence.clone(),
            schedule: schedule.to_vec(),
        });
        Ok(id)
    }
}

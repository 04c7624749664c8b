use crate::domain::model::{
    EventTemplate, OccurrenceFailure, PlannedOccurrence, SeriesSubmissionResult,
};
use crate::domain::ports::EventStore;
use crate::utils::error::{Result, SchedulerError};
use futures::future::join_all;
use uuid::Uuid;

/// Persists every occurrence of a series concurrently and gathers the
/// per-occurrence outcomes. One failing occurrence never cancels its siblings.
pub struct SeriesSubmitter<S: EventStore> {
    store: S,
}

impl<S: EventStore> SeriesSubmitter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn submit(
        &self,
        template: &EventTemplate,
        planned: Vec<PlannedOccurrence>,
    ) -> Result<SeriesSubmissionResult> {
        if planned.is_empty() {
            return Err(SchedulerError::validation("nothing to submit"));
        }

        let series_id = (planned.len() > 1).then(|| Uuid::new_v4().to_string());
        let attempted = planned.len();

        tracing::info!(
            "Submitting {} occurrence(s) of '{}'{}",
            attempted,
            template.title,
            series_id
                .as_deref()
                .map(|id| format!(" as series {}", id))
                .unwrap_or_default()
        );

        let calls = planned.into_iter().map(|item| {
            let occurrence = item.occurrence.with_series(series_id.clone());
            async move {
                let outcome = self
                    .store
                    .create_event(&occurrence, template, &item.schedule)
                    .await;
                (occurrence.index, outcome)
            }
        });

        // Wait for every call to settle, successful or not.
        let outcomes = join_all(calls).await;

        let mut result = SeriesSubmissionResult {
            series_id,
            attempted,
            ..Default::default()
        };
        for (index, outcome) in outcomes {
            match outcome {
                Ok(event_id) => {
                    tracing::debug!("Occurrence #{} created as {}", index, event_id);
                    result.created.push((index, event_id));
                }
                Err(e) => {
                    tracing::warn!("Occurrence #{} failed: {}", index, e);
                    result.failures.push(OccurrenceFailure {
                        index,
                        message: failure_message(e),
                    });
                }
            }
        }
        result.created.sort_by_key(|(index, _)| *index);
        result.failures.sort_by_key(|failure| failure.index);

        tracing::info!("{}", result.summary());
        Ok(result)
    }
}

fn failure_message(error: SchedulerError) -> String {
    match error {
        SchedulerError::Persist { message, .. } => message,
        other => other.to_string(),
    }
}

impl SeriesSubmissionResult {
    /// Any created occurrence makes the submission a success; only a batch
    /// with zero successes becomes a hard failure.
    pub fn into_outcome(self) -> Result<SeriesSubmissionResult> {
        if self.succeeded_count() > 0 {
            Ok(self)
        } else {
            Err(SchedulerError::SeriesFailed {
                attempted: self.attempted,
                errors: self.distinct_errors(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DailyScheduleEntry, EventId, Occurrence};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone, Default)]
    struct MockStore {
        failing: HashSet<u32>,
        calls: Arc<Mutex<Vec<Occurrence>>>,
    }

    impl MockStore {
        fn failing(indexes: &[u32]) -> Self {
            Self {
                failing: indexes.iter().copied().collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EventStore for MockStore {
        async fn create_event(
            &self,
            occurrence: &Occurrence,
            _template: &EventTemplate,
            _schedule: &[DailyScheduleEntry],
        ) -> Result<EventId> {
            // Later occurrences finish first to shake out ordering assumptions.
            tokio::time::sleep(std::time::Duration::from_millis(
                50 - u64::from(occurrence.index) * 10,
            ))
            .await;
            self.calls.lock().await.push(occurrence.clone());
            if self.failing.contains(&occurrence.index) {
                Err(SchedulerError::Persist {
                    index: occurrence.index,
                    message: "venue unavailable".to_string(),
                })
            } else {
                Ok(EventId::new(format!("evt-{}", occurrence.index)))
            }
        }
    }

    fn planned(count: u32) -> Vec<PlannedOccurrence> {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        (0..count)
            .map(|index| {
                let start = base + Duration::weeks(i64::from(index));
                PlannedOccurrence {
                    occurrence: Occurrence {
                        series_id: None,
                        index,
                        start,
                        end: start + Duration::hours(2),
                    },
                    schedule: Vec::new(),
                }
            })
            .collect()
    }

    fn template() -> EventTemplate {
        EventTemplate {
            title: "Tutoring night".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_single_submission_has_no_series() {
        let submitter = SeriesSubmitter::new(MockStore::default());
        let result = submitter.submit(&template(), planned(1)).await.unwrap();

        assert_eq!(result.series_id, None);
        assert_eq!(result.succeeded_count(), 1);
        let calls = submitter.store().calls.lock().await;
        assert_eq!(calls[0].series_id, None);
    }

    #[tokio::test]
    async fn test_series_shares_one_generated_id() {
        let submitter = SeriesSubmitter::new(MockStore::default());
        let result = submitter.submit(&template(), planned(3)).await.unwrap();

        let series_id = result.series_id.clone().expect("series id");
        assert!(Uuid::parse_str(&series_id).is_ok());
        let calls = submitter.store().calls.lock().await;
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|o| o.series_id.as_deref() == Some(series_id.as_str())));
        assert!(result.is_complete_success());
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_as_success() {
        let submitter = SeriesSubmitter::new(MockStore::failing(&[2]));
        let result = submitter
            .submit(&template(), planned(4))
            .await
            .unwrap()
            .into_outcome()
            .unwrap();

        assert_eq!(result.succeeded_count(), 3);
        assert_eq!(
            result.failures,
            vec![OccurrenceFailure {
                index: 2,
                message: "venue unavailable".to_string()
            }]
        );
        let created: Vec<u32> = result.created.iter().map(|(index, _)| *index).collect();
        assert_eq!(created, vec![0, 1, 3]);
        assert_eq!(
            result.summary(),
            "3 of 4 occurrences created (failed: venue unavailable)"
        );
    }

    #[tokio::test]
    async fn test_all_failures_escalate_with_distinct_errors() {
        let submitter = SeriesSubmitter::new(MockStore::failing(&[0, 1, 2]));
        let result = submitter.submit(&template(), planned(3)).await.unwrap();
        assert_eq!(result.failed_count(), 3);

        match result.into_outcome() {
            Err(SchedulerError::SeriesFailed { attempted, errors }) => {
                assert_eq!(attempted, 3);
                assert_eq!(errors, vec!["venue unavailable".to_string()]);
            }
            other => panic!("expected series failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_waits_for_every_call() {
        let submitter = SeriesSubmitter::new(MockStore::failing(&[0]));
        let result = submitter.submit(&template(), planned(5)).await.unwrap();

        assert_eq!(submitter.store().calls.lock().await.len(), 5);
        assert_eq!(result.succeeded_count() + result.failed_count(), 5);
    }

    #[tokio::test]
    async fn test_empty_submission_is_rejected() {
        let submitter = SeriesSubmitter::new(MockStore::default());
        let result = submitter.submit(&template(), Vec::new()).await;
        assert!(matches!(result, Err(SchedulerError::Validation { .. })));
    }
}

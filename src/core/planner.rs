use crate::core::{expander, schedule, submitter::SeriesSubmitter};
use crate::domain::model::{PlanRequest, PlannedOccurrence, SeriesSubmissionResult};
use crate::domain::ports::EventStore;
use crate::utils::error::Result;

/// Expands the request, attaches a schedule to every occurrence and validates
/// the whole series before anything is persisted.
pub fn plan(request: &PlanRequest) -> Result<Vec<PlannedOccurrence>> {
    let occurrences = expander::expand(&request.template, request.start, request.end, &request.rule)?;

    occurrences
        .into_iter()
        .map(|occurrence| {
            let schedule =
                schedule::schedule_for(&request.template, &occurrence, &request.daily, &request.defaults)?;
            Ok(PlannedOccurrence {
                occurrence,
                schedule,
            })
        })
        .collect()
}

pub struct EventPlanner<S: EventStore> {
    submitter: SeriesSubmitter<S>,
}

impl<S: EventStore> EventPlanner<S> {
    pub fn new(store: S) -> Self {
        Self {
            submitter: SeriesSubmitter::new(store),
        }
    }

    pub fn store(&self) -> &S {
        self.submitter.store()
    }

    #[tracing::instrument(name = "series", skip_all, fields(title = %request.template.title))]
    pub async fn run(&self, request: &PlanRequest) -> Result<SeriesSubmissionResult> {
        tracing::info!("Planning '{}'", request.template.title);

        let planned = plan(request)?;
        tracing::info!("Planned {} occurrence(s)", planned.len());

        let result = self.submitter.submit(&request.template, planned).await?;
        result.into_outcome()
    }
}

use crate::domain::model::{
    DailyScheduleEntry, EventId, EventTemplate, Occurrence, TokenGrant,
};
use crate::domain::ports::{AttendanceService, EventStore};
use crate::utils::error::{Result, SchedulerError};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Portal REST API client: creates events and drives attendance endpoints.
#[derive(Debug, Clone)]
pub struct HttpEventStore {
    client: Client,
    base_url: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

#[derive(Debug, Serialize)]
struct CreateEventRequest<'a> {
    #[serde(flatten)]
    template: &'a EventTemplate,
    start: NaiveDateTime,
    end: NaiveDateTime,
    series_id: Option<&'a str>,
    occurrence_index: u32,
    daily_schedule: &'a [DailyScheduleEntry],
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: EventId,
}

#[derive(Debug, Deserialize)]
struct AttendanceCount {
    count: u64,
}

impl HttpEventStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn prepare(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    /// `{base}/events/{id}/{tail}` with the id percent-encoded as one segment.
    fn event_url(&self, event_id: &EventId, tail: &str) -> std::result::Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid endpoint {}: {}", self.base_url, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("endpoint {} cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["events", event_id.as_str(), tail]);
        Ok(url)
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    async fn create_event(
        &self,
        occurrence: &Occurrence,
        template: &EventTemplate,
        schedule: &[DailyScheduleEntry],
    ) -> Result<EventId> {
        let body = CreateEventRequest {
            template,
            start: occurrence.start,
            end: occurrence.end,
            series_id: occurrence.series_id.as_deref(),
            occurrence_index: occurrence.index,
            daily_schedule: schedule,
        };

        let url = format!("{}/events", self.base_url);
        tracing::debug!("POST {} (occurrence #{})", url, occurrence.index);
        let response = self
            .prepare(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Persist {
                index: occurrence.index,
                message: status_message(status, &detail),
            });
        }

        let body = response.text().await?;
        let created: CreatedEvent = serde_json::from_str(&body)?;
        Ok(created.id)
    }
}

#[async_trait]
impl AttendanceService for HttpEventStore {
    async fn issue_token(&self, event_id: &EventId) -> Result<TokenGrant> {
        let url = self
            .event_url(event_id, "attendance-token")
            .map_err(|message| SchedulerError::TokenIssue { message })?;
        let response = self
            .prepare(self.client.post(url))
            .send()
            .await
            .map_err(|e| SchedulerError::TokenIssue {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SchedulerError::TokenIssue {
                message: status_message(status, &detail),
            });
        }

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| SchedulerError::TokenIssue {
                message: e.to_string(),
            })
    }

    async fn attendance_count(&self, event_id: &EventId) -> Result<u64> {
        let url = self
            .event_url(event_id, "attendance-count")
            .map_err(|message| SchedulerError::Poll { message })?;
        let response = self
            .prepare(self.client.get(url))
            .send()
            .await
            .map_err(|e| SchedulerError::Poll {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SchedulerError::Poll {
                message: format!("API request failed with status: {}", status),
            });
        }

        let body: AttendanceCount = response.json().await.map_err(|e| SchedulerError::Poll {
            message: e.to_string(),
        })?;
        Ok(body.count)
    }
}

fn status_message(status: reqwest::StatusCode, detail: &str) -> String {
    let detail = detail.trim();
    if detail.is_empty() {
        format!("API request failed with status: {}", status)
    } else {
        format!("API request failed with status: {} ({})", status, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_url_encodes_the_id_as_one_segment() {
        let store = HttpEventStore::new("https://portal.example.edu/api/");
        let url = store
            .event_url(&EventId::new("evt/9?x#y"), "attendance-token")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://portal.example.edu/api/events/evt%2F9%3Fx%23y/attendance-token"
        );
    }

    #[test]
    fn test_event_url_on_bare_host() {
        let store = HttpEventStore::new("http://127.0.0.1:8080");
        let url = store
            .event_url(&EventId::new("evt-7"), "attendance-count")
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/events/evt-7/attendance-count");
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_a_transient_poll_error() {
        let store = HttpEventStore::new("not a url");
        let err = store
            .attendance_count(&EventId::new("evt-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Poll { .. }));
    }
}

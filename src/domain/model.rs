use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolunteerSettings {
    #[serde(default)]
    pub max_volunteers: Option<u32>,
    #[serde(default)]
    pub service_hours: Option<f32>,
    #[serde(default)]
    pub requirements: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// The proposed event as entered by the organiser. Every occurrence of a
/// series shares one template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub is_open_for_donation: bool,
    #[serde(default)]
    pub is_open_for_volunteer: bool,
    #[serde(default)]
    pub volunteer_settings: VolunteerSettings,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    #[default]
    None,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    #[serde(default)]
    pub pattern: RecurrencePattern,
    #[serde(default = "default_one")]
    pub interval: u32,
    #[serde(default = "default_one")]
    pub count: u32,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default)]
    pub weekday: Option<u8>,
    #[serde(default)]
    pub day_of_month: Option<u8>,
}

fn default_one() -> u32 {
    1
}

impl RecurrenceRule {
    pub const MAX_OCCURRENCES: u32 = 24;

    pub fn none() -> Self {
        Self {
            pattern: RecurrencePattern::None,
            interval: 1,
            count: 1,
            weekday: None,
            day_of_month: None,
        }
    }

    pub fn weekly(interval: u32, count: u32) -> Self {
        Self {
            pattern: RecurrencePattern::Weekly,
            interval,
            count,
            ..Self::none()
        }
    }

    pub fn monthly(interval: u32, count: u32) -> Self {
        Self {
            pattern: RecurrencePattern::Monthly,
            interval,
            count,
            ..Self::none()
        }
    }

    pub fn on_weekday(mut self, weekday: u8) -> Self {
        self.weekday = Some(weekday);
        self
    }

    pub fn on_day_of_month(mut self, day: u8) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn effective_count(&self) -> u32 {
        self.count.clamp(1, Self::MAX_OCCURRENCES)
    }

    pub fn effective_interval(&self) -> u32 {
        self.interval.max(1)
    }
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub series_id: Option<String>,
    pub index: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Occurrence {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn with_series(&self, series_id: Option<String>) -> Self {
        Self {
            series_id,
            ..self.clone()
        }
    }
}

/// A day entry as the caller filled it in; either time may still be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub time_in: Option<NaiveTime>,
    #[serde(default)]
    pub time_out: Option<NaiveTime>,
    #[serde(default)]
    pub notes: String,
}

impl ScheduleDraft {
    pub fn is_complete(&self) -> bool {
        self.time_in.is_some() && self.time_out.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyScheduleEntry {
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_out: NaiveTime,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDefaults {
    pub time_in: NaiveTime,
    pub time_out: NaiveTime,
}

impl Default for ScheduleDefaults {
    fn default() -> Self {
        Self {
            time_in: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            time_out: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOccurrence {
    pub occurrence: Occurrence,
    pub schedule: Vec<DailyScheduleEntry>,
}

/// Everything needed to turn one event form into a submitted series.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub template: EventTemplate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub rule: RecurrenceRule,
    pub daily: Vec<ScheduleDraft>,
    pub defaults: ScheduleDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the issuing service hands back before the session stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl AttendanceToken {
    /// Saturates at the latest representable instant for oversized TTLs.
    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.issued_at && now < self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceFailure {
    pub index: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesSubmissionResult {
    pub series_id: Option<String>,
    pub attempted: usize,
    pub created: Vec<(u32, EventId)>,
    pub failures: Vec<OccurrenceFailure>,
}

impl SeriesSubmissionResult {
    pub fn succeeded_count(&self) -> usize {
        self.created.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.succeeded_count() == self.attempted
    }

    /// Failure messages with duplicates removed, in first-seen order.
    pub fn distinct_errors(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for failure in &self.failures {
            if !seen.contains(&failure.message) {
                seen.push(failure.message.clone());
            }
        }
        seen
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} of {} occurrences created",
            self.succeeded_count(),
            self.attempted
        );
        let errors = self.distinct_errors();
        if !errors.is_empty() {
            line.push_str(&format!(" (failed: {})", errors.join("; ")));
        }
        line
    }
}

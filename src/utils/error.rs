use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Incomplete schedule: check-in and check-out are required for {date}")]
    IncompleteSchedule { date: NaiveDate },

    #[error("Failed to create occurrence #{index}: {message}")]
    Persist { index: u32, message: String },

    #[error("No occurrences created out of {attempted}: {}", .errors.join("; "))]
    SeriesFailed { attempted: usize, errors: Vec<String> },

    #[error("Attendance token issue failed: {message}")]
    TokenIssue { message: String },

    #[error("Attendance count poll failed: {message}")]
    Poll { message: String },

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SchedulerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TokenIssue { .. } | Self::Poll { .. } => ErrorSeverity::Low,
            Self::Persist { .. } | Self::Api(_) | Self::Serialization(_) => ErrorSeverity::Medium,
            Self::Validation { .. }
            | Self::IncompleteSchedule { .. }
            | Self::SeriesFailed { .. }
            | Self::InvalidTransition { .. }
            | Self::ConfigValidation { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => ErrorSeverity::High,
            Self::Io(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Validation { message } => format!("Invalid event input: {}", message),
            Self::IncompleteSchedule { date } => {
                format!("Please set both check-in and check-out times for {}", date)
            }
            Self::SeriesFailed { attempted, errors } => format!(
                "0 of {} occurrences created. Reasons: {}",
                attempted,
                errors.join(", ")
            ),
            Self::Api(e) => format!("Could not reach the event service: {}", e),
            Self::ConfigValidation { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => format!("Configuration problem: {}", self),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Check that the event ends after it starts and the recurrence values are in range",
            Self::IncompleteSchedule { .. } => "Add time_in and time_out to the [[schedule.daily]] entries",
            Self::SeriesFailed { .. } | Self::Persist { .. } | Self::Api(_) | Self::Serialization(_) => {
                "Verify the event service endpoint is reachable and retry"
            }
            Self::TokenIssue { .. } | Self::Poll { .. } => "The session retries automatically on the next tick",
            Self::InvalidTransition { .. } => "Create a new attendance session instead of restarting a stopped one",
            Self::ConfigValidation { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => "Fix the plan file and run again",
            Self::Io(_) => "Check that the plan file exists and is readable",
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

use crate::core::attendance::SessionConfig;
use crate::domain::model::{
    EventTemplate, PlanRequest, RecurrenceRule, ScheduleDefaults, ScheduleDraft,
};
use crate::utils::error::{Result, SchedulerError};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// One event form plus everything needed to submit and run it, as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub event: EventTemplate,
    pub schedule: ScheduleConfig,
    pub recurrence: Option<RecurrenceRule>,
    pub attendance: Option<AttendanceConfig>,
    pub store: Option<StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub daily: Vec<ScheduleDraft>,
    pub defaults: Option<ScheduleDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    pub rotation_seconds: Option<u64>,
    pub poll_seconds: Option<u64>,
    pub token_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}

impl PlanConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SchedulerError::Io)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SchedulerError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SchedulerError::ConfigValidation {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("event.title", &self.event.title)?;

        if self.schedule.end <= self.schedule.start {
            return Err(SchedulerError::InvalidConfigValue {
                field: "schedule.end".to_string(),
                value: self.schedule.end.to_string(),
                reason: format!("must be after schedule.start ({})", self.schedule.start),
            });
        }

        if let Some(rule) = &self.recurrence {
            if let Some(weekday) = rule.weekday {
                validation::validate_range("recurrence.weekday", weekday, 0, 6)?;
            }
            if let Some(day) = rule.day_of_month {
                validation::validate_range("recurrence.day_of_month", day, 1, 31)?;
            }
            if rule.count > RecurrenceRule::MAX_OCCURRENCES {
                tracing::warn!(
                    "recurrence.count {} exceeds {}, the series will be capped",
                    rule.count,
                    RecurrenceRule::MAX_OCCURRENCES
                );
            }
        }

        if let Some(attendance) = &self.attendance {
            for (field, value) in [
                ("attendance.rotation_seconds", attendance.rotation_seconds),
                ("attendance.poll_seconds", attendance.poll_seconds),
                ("attendance.token_ttl_seconds", attendance.token_ttl_seconds),
            ] {
                if let Some(value) = value {
                    validation::validate_positive_number(field, value, 1)?;
                }
            }
        }

        if let Some(store) = &self.store {
            validation::validate_url("store.endpoint", &store.endpoint)?;
        }

        if self.event.is_open_for_volunteer {
            for draft in self.schedule.daily.iter().filter(|draft| !draft.is_complete()) {
                tracing::warn!(
                    "Daily entry for {} is missing a check-in or check-out time",
                    draft.date
                );
            }
        }

        Ok(())
    }

    pub fn to_plan_request(&self) -> PlanRequest {
        PlanRequest {
            template: self.event.clone(),
            start: self.schedule.start,
            end: self.schedule.end,
            rule: self.recurrence.clone().unwrap_or_default(),
            daily: self.schedule.daily.clone(),
            defaults: self.schedule.defaults.unwrap_or_default(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        match &self.attendance {
            Some(attendance) => SessionConfig {
                rotation_interval: attendance
                    .rotation_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.rotation_interval),
                poll_interval: attendance
                    .poll_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.poll_interval),
                token_ttl: attendance
                    .token_ttl_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.token_ttl),
                ..defaults
            },
            None => defaults,
        }
    }

    pub fn store_endpoint(&self) -> Option<&str> {
        self.store.as_ref().map(|store| store.endpoint.as_str())
    }

    pub fn store_timeout(&self) -> Option<Duration> {
        self.store
            .as_ref()
            .and_then(|store| store.timeout_seconds)
            .map(Duration::from_secs)
    }

    pub fn store_headers(&self) -> HashMap<String, String> {
        self.store
            .as_ref()
            .and_then(|store| store.headers.clone())
            .unwrap_or_default()
    }
}

impl Validate for PlanConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

pub mod plan_config;

pub use plan_config::PlanConfig;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "campus-scheduler")]
#[command(about = "Expands, submits and runs attendance for campus event series")]
pub struct CliConfig {
    #[arg(long, help = "TOML plan describing the event and its recurrence")]
    pub plan: String,

    #[arg(long, help = "Event service base URL; overrides [store].endpoint")]
    pub api_endpoint: Option<String>,

    #[arg(long, help = "Expand and submit against an in-memory store")]
    pub dry_run: bool,

    #[arg(long, value_name = "EVENT_ID", help = "Run an attendance session for an open event")]
    pub attend: Option<String>,

    #[arg(long, help = "Stop the attendance session after this many seconds")]
    pub attend_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("plan", &self.plan)?;
        if let Some(endpoint) = &self.api_endpoint {
            validation::validate_url("api_endpoint", endpoint)?;
        }
        if let Some(event_id) = &self.attend {
            validation::validate_non_empty_string("attend", event_id)?;
        }
        if let Some(seconds) = self.attend_seconds {
            validation::validate_positive_number("attend_seconds", seconds, 1)?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_flags() {
        let config = CliConfig::parse_from([
            "campus-scheduler",
            "--plan",
            "plans/cleanup.toml",
            "--dry-run",
            "--attend",
            "evt-9",
        ]);
        assert_eq!(config.plan, "plans/cleanup.toml");
        assert!(config.dry_run);
        assert_eq!(config.attend.as_deref(), Some("evt-9"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let config = CliConfig::parse_from([
            "campus-scheduler",
            "--plan",
            "plan.toml",
            "--api-endpoint",
            "ftp://portal",
        ]);
        assert!(config.validate().is_err());
    }
}

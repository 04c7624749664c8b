use campus_scheduler::domain::model::{EventId, SeriesSubmissionResult};
use campus_scheduler::utils::error::ErrorSeverity;
use campus_scheduler::utils::{logger, validation::Validate};
use campus_scheduler::{
    AttendanceTokenSession, CliConfig, EventPlanner, HttpEventStore, InMemoryEventStore,
    PlanConfig, SchedulerError, SessionConfig, SystemClock,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting campus-scheduler");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let plan = match load_plan(&cli) {
        Ok(plan) => plan,
        Err(e) => fail(e),
    };

    let endpoint = cli
        .api_endpoint
        .clone()
        .or_else(|| plan.store_endpoint().map(str::to_string));

    if let Some(event_id) = &cli.attend {
        let Some(endpoint) = endpoint else {
            fail(SchedulerError::MissingConfig {
                field: "store.endpoint".to_string(),
            });
        };
        let store = http_store(&plan, endpoint);
        run_attendance(store, plan.session_config(), EventId::new(event_id.clone()), cli.attend_seconds).await?;
        return Ok(());
    }

    let request = plan.to_plan_request();
    let outcome = if cli.dry_run {
        tracing::info!("Dry run: submitting to an in-memory store");
        let planner = EventPlanner::new(InMemoryEventStore::new());
        let outcome = planner.run(&request).await;
        for event in planner.store().events().await {
            println!(
                "  #{} {} {} -> {} ({} schedule day(s))",
                event.occurrence.index,
                event.id,
                event.occurrence.start,
                event.occurrence.end,
                event.schedule.len()
            );
        }
        outcome
    } else {
        match endpoint {
            Some(endpoint) => EventPlanner::new(http_store(&plan, endpoint)).run(&request).await,
            None => Err(SchedulerError::MissingConfig {
                field: "store.endpoint".to_string(),
            }),
        }
    };

    match outcome {
        Ok(result) => report(&result),
        Err(e) => fail(e),
    }

    Ok(())
}

fn load_plan(cli: &CliConfig) -> campus_scheduler::Result<PlanConfig> {
    cli.validate()?;
    tracing::info!("Loading plan from: {}", cli.plan);
    let plan = PlanConfig::from_file(&cli.plan)?;
    plan.validate()?;
    Ok(plan)
}

fn http_store(plan: &PlanConfig, endpoint: String) -> HttpEventStore {
    let store = HttpEventStore::new(endpoint).with_headers(plan.store_headers());
    match plan.store_timeout() {
        Some(timeout) => store.with_timeout(timeout),
        None => store,
    }
}

fn report(result: &SeriesSubmissionResult) {
    tracing::info!("{}", result.summary());
    println!("✅ {} of {} occurrences created", result.succeeded_count(), result.attempted);
    if let Some(series_id) = &result.series_id {
        println!("🔗 Series: {}", series_id);
    }
    for (index, event_id) in &result.created {
        println!("  #{} -> {}", index, event_id);
    }
    for reason in result.distinct_errors() {
        println!("⚠️  {}", reason);
    }
}

async fn run_attendance(
    store: HttpEventStore,
    config: SessionConfig,
    event_id: EventId,
    limit_seconds: Option<u64>,
) -> anyhow::Result<()> {
    let mut session = AttendanceTokenSession::new(Arc::new(store), Arc::new(SystemClock), config);
    let mut updates = session.subscribe();
    session.start(event_id).await?;

    let deadline = async {
        match limit_seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut last_token = String::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, closing attendance");
                break;
            }
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.current_token != last_token {
                    last_token = snapshot.current_token.clone();
                    if last_token.is_empty() {
                        println!("⏳ token unavailable, retrying");
                    } else {
                        println!("🔑 {} (valid {}s)", last_token, snapshot.seconds_remaining);
                    }
                }
                tracing::debug!(
                    "count={:?} remaining={}s",
                    snapshot.live_count,
                    snapshot.seconds_remaining
                );
            }
        }
    }

    session.stop();
    let snapshot = session.snapshot();
    println!(
        "👥 Attendance: {}",
        snapshot
            .live_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    );
    Ok(())
}

fn fail(e: SchedulerError) -> ! {
    tracing::error!("❌ {} (severity: {:?})", e, e.severity());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

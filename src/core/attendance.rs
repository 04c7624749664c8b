use crate::domain::model::{AttendanceToken, EventId};
use crate::domain::ports::{AttendanceService, Clock};
use crate::utils::error::{Result, SchedulerError};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub rotation_interval: Duration,
    pub poll_interval: Duration,
    /// Nominal token lifetime the countdown resets to.
    pub token_ttl: Duration,
    pub countdown_tick: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            token_ttl: Duration::from_secs(30),
            countdown_tick: Duration::from_secs(1),
        }
    }
}

/// Read-only view of a session, as handed to displays and scanners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSnapshot {
    pub state: SessionState,
    pub event_id: Option<EventId>,
    /// Empty when the last issue attempt failed.
    pub current_token: String,
    pub token: Option<AttendanceToken>,
    pub seconds_remaining: u64,
    pub live_count: Option<u64>,
    pub issue_failures: u64,
    pub poll_failures: u64,
}

impl Default for AttendanceSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            event_id: None,
            current_token: String::new(),
            token: None,
            seconds_remaining: 0,
            live_count: None,
            issue_failures: 0,
            poll_failures: 0,
        }
    }
}

/// Rotating attendance token plus a polled head count for one open event.
///
/// `start` issues the first token and spawns three independent timers:
/// rotation, count polling and a one-second countdown. `stop` cancels all of
/// them before returning; results of calls still in flight at that point are
/// dropped instead of applied.
pub struct AttendanceTokenSession<A, C>
where
    A: AttendanceService + 'static,
    C: Clock + 'static,
{
    service: Arc<A>,
    clock: Arc<C>,
    config: SessionConfig,
    state: Arc<watch::Sender<AttendanceSnapshot>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

struct SessionContext<A, C> {
    service: Arc<A>,
    clock: Arc<C>,
    state: Arc<watch::Sender<AttendanceSnapshot>>,
    event_id: EventId,
    token_ttl_secs: u64,
}

impl<A, C> AttendanceTokenSession<A, C>
where
    A: AttendanceService + 'static,
    C: Clock + 'static,
{
    pub fn new(service: Arc<A>, clock: Arc<C>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(AttendanceSnapshot::default());
        Self {
            service,
            clock,
            config,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().state
    }

    pub fn snapshot(&self) -> AttendanceSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AttendanceSnapshot> {
        self.state.subscribe()
    }

    pub async fn start(&mut self, event_id: EventId) -> Result<()> {
        let current = self.state();
        if current != SessionState::Idle {
            return Err(SchedulerError::InvalidTransition {
                from: current.to_string(),
                to: SessionState::Active.to_string(),
            });
        }

        self.state.send_modify(|snapshot| {
            snapshot.state = SessionState::Active;
            snapshot.event_id = Some(event_id.clone());
        });
        let span = tracing::info_span!("attendance", event_id = %event_id);
        span.in_scope(|| tracing::info!("Attendance session started"));

        let context = Arc::new(SessionContext {
            service: Arc::clone(&self.service),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
            event_id,
            token_ttl_secs: self.config.token_ttl.as_secs(),
        });

        context.rotate().instrument(span.clone()).await;

        let rotation = Arc::clone(&context);
        self.tasks.push(tokio::spawn(run_periodic(
            self.config.rotation_interval,
            false,
            self.cancel.clone(),
            move || {
                let context = Arc::clone(&rotation);
                async move { context.rotate().await }
            },
        )
        .instrument(span.clone())));

        let polling = Arc::clone(&context);
        self.tasks.push(tokio::spawn(run_periodic(
            self.config.poll_interval,
            true,
            self.cancel.clone(),
            move || {
                let context = Arc::clone(&polling);
                async move { context.poll().await }
            },
        )
        .instrument(span.clone())));

        let countdown = Arc::clone(&context);
        self.tasks.push(tokio::spawn(run_periodic(
            self.config.countdown_tick,
            false,
            self.cancel.clone(),
            move || {
                countdown.tick();
                std::future::ready(())
            },
        )
        .instrument(span)));

        Ok(())
    }

    /// Idempotent; also valid before `start`.
    pub fn stop(&mut self) {
        let stopped_now = self.state.send_if_modified(|snapshot| {
            if snapshot.state == SessionState::Terminated {
                return false;
            }
            snapshot.state = SessionState::Terminated;
            true
        });

        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }

        if stopped_now {
            tracing::info!("Attendance session stopped");
        }
    }
}

impl<A, C> Drop for AttendanceTokenSession<A, C>
where
    A: AttendanceService + 'static,
    C: Clock + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<A, C> SessionContext<A, C>
where
    A: AttendanceService,
    C: Clock,
{
    async fn rotate(&self) {
        let outcome = self.service.issue_token(&self.event_id).await;
        let issued_at = self.clock.now();

        if let Err(e) = &outcome {
            tracing::warn!(
                "Token issue for event {} failed, retrying next rotation: {}",
                self.event_id,
                e
            );
        }

        let ttl = self.token_ttl_secs;
        let applied = self.state.send_if_modified(|snapshot| {
            if snapshot.state != SessionState::Active {
                return false;
            }
            match &outcome {
                Ok(grant) => {
                    snapshot.current_token = grant.token.clone();
                    snapshot.token = Some(AttendanceToken {
                        token: grant.token.clone(),
                        issued_at,
                        ttl_seconds: grant.ttl_seconds,
                    });
                }
                Err(_) => {
                    snapshot.current_token.clear();
                    snapshot.token = None;
                    snapshot.issue_failures += 1;
                }
            }
            snapshot.seconds_remaining = ttl;
            true
        });

        if applied && outcome.is_ok() {
            tracing::debug!("Rotated attendance token");
        }
    }

    async fn poll(&self) {
        let outcome = self.service.attendance_count(&self.event_id).await;

        self.state.send_if_modified(|snapshot| {
            if snapshot.state != SessionState::Active {
                return false;
            }
            match &outcome {
                Ok(count) => {
                    let changed = snapshot.live_count != Some(*count);
                    snapshot.live_count = Some(*count);
                    changed
                }
                Err(e) => {
                    tracing::debug!("Attendance count poll failed, keeping last value: {}", e);
                    snapshot.poll_failures += 1;
                    true
                }
            }
        });
    }

    fn tick(&self) {
        self.state.send_if_modified(|snapshot| {
            if snapshot.state != SessionState::Active || snapshot.seconds_remaining == 0 {
                return false;
            }
            snapshot.seconds_remaining -= 1;
            true
        });
    }
}

async fn run_periodic<F, Fut>(
    period: Duration,
    fire_immediately: bool,
    cancel: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let first = if fire_immediately {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = interval_at(first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = job() => {}
        }
    }
}

//! Scheduler background loop.
//!
//! Spawns one tokio task that runs the [`Workflow`] immediately, then once
//! per interval until stopped. Status is kept behind a single `RwLock`; the
//! loop and the control operations are the only writers.

use super::status::{RunOutcome, SchedulerStatus};
use super::workflow::{Workflow, panic_message};
use crate::config::SchedulerConfig;
use crate::error::{Result, WatchError};
use chrono::Utc;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Mutable scheduler state. Fields updated together are written under one
/// lock acquisition so readers never see a torn snapshot.
#[derive(Default)]
struct LoopState {
    /// Token of the active loop; `Some` exactly while running.
    cancel: Option<CancellationToken>,
    /// Runs currently executing (loop and manual triggers).
    in_flight: usize,
    last_run_time: Option<chrono::DateTime<Utc>>,
    last_run: Option<RunOutcome>,
    next_run_time: Option<chrono::DateTime<Utc>>,
}

struct Inner {
    workflow: Workflow,
    interval: Duration,
    quantum: Duration,
    state: RwLock<LoopState>,
}

impl Inner {
    fn read(&self) -> RwLockReadGuard<'_, LoopState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LoopState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Periodic workflow scheduler.
///
/// Cheap to clone; all clones control the same background loop. Construct
/// one per process and hand clones to whoever needs status or control.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Create a stopped scheduler running `workflow` every
    /// `config.interval_secs`.
    pub fn new(config: &SchedulerConfig, workflow: Workflow) -> Self {
        let interval = Duration::from_secs(config.interval_secs.max(1));
        let quantum = Duration::from_secs(config.poll_quantum_secs.max(1)).min(interval);
        Self {
            inner: Arc::new(Inner {
                workflow: workflow.with_default_tags(config.default_tags.clone()),
                interval,
                quantum,
                state: RwLock::new(LoopState::default()),
            }),
        }
    }

    /// Seconds between ticks.
    pub fn interval_secs(&self) -> u64 {
        self.inner.interval.as_secs()
    }

    /// Start the background loop.
    ///
    /// Returns `Ok(false)` without spawning anything when already running.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn start(&self) -> Result<bool> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WatchError::Scheduler(format!("no tokio runtime: {e}")))?;

        let token = {
            let mut state = self.inner.write();
            if state.cancel.is_some() {
                info!("scheduler is already running");
                return Ok(false);
            }
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            token
        };

        let inner = Arc::clone(&self.inner);
        runtime.spawn(run_loop(inner, token));
        info!(
            interval_secs = self.interval_secs(),
            "article scheduler started"
        );
        Ok(true)
    }

    /// Signal the background loop to exit.
    ///
    /// `running` and `next_run_time` are cleared immediately; a run already
    /// in progress is left to finish. Returns `false` when not running.
    pub fn stop(&self) -> bool {
        let mut state = self.inner.write();
        let Some(token) = state.cancel.take() else {
            debug!("scheduler stop requested while stopped");
            return false;
        };
        token.cancel();
        state.next_run_time = None;
        drop(state);
        info!("article scheduler stopped");
        true
    }

    /// Whether the background loop is active.
    pub fn is_running(&self) -> bool {
        self.inner.read().cancel.is_some()
    }

    /// Snapshot of the current status.
    pub fn status(&self) -> SchedulerStatus {
        let state = self.inner.read();
        let running = state.cancel.is_some();
        SchedulerStatus {
            running,
            fetching: running && state.in_flight > 0,
            last_run_time: state.last_run_time,
            last_run_result: state.last_run.as_ref().map(|o| o.result),
            last_run_message: state.last_run.as_ref().map(|o| o.message.clone()),
            next_run_time: if running { state.next_run_time } else { None },
            interval_seconds: self.interval_secs(),
        }
    }

    /// Run the workflow once on the caller's task, outside the cadence.
    ///
    /// Status is updated exactly as for a scheduled run; `next_run_time` is
    /// left untouched.
    pub async fn run_now(&self) -> RunOutcome {
        info!("manual article fetch triggered");
        execute(&self.inner).await
    }
}

async fn run_loop(inner: Arc<Inner>, token: CancellationToken) {
    debug!("scheduler loop entered");
    loop {
        if token.is_cancelled() {
            break;
        }

        execute(&inner).await;

        if !publish_next_run(&inner, &token) {
            break;
        }
        if !wait_for_next_tick(&token, inner.interval, inner.quantum).await {
            break;
        }
    }
    debug!("scheduler loop exited");
}

/// Record `now + interval` as the next tick unless the loop was stopped.
///
/// The token is checked under the status write lock, the same lock `stop()`
/// holds while cancelling, so a stop is never followed by a stale
/// `next_run_time`.
fn publish_next_run(inner: &Inner, token: &CancellationToken) -> bool {
    let mut state = inner.write();
    if token.is_cancelled() {
        return false;
    }
    state.next_run_time = chrono::Duration::from_std(inner.interval)
        .ok()
        .and_then(|interval| Utc::now().checked_add_signed(interval));
    true
}

/// Sleep for `interval` in `quantum` steps. Returns `false` if cancelled.
async fn wait_for_next_tick(
    token: &CancellationToken,
    interval: Duration,
    quantum: Duration,
) -> bool {
    let mut waited = Duration::ZERO;
    while waited < interval {
        let step = quantum.min(interval - waited);
        tokio::select! {
            _ = token.cancelled() => return false,
            _ = tokio::time::sleep(step) => waited += step,
        }
        if token.is_cancelled() {
            return false;
        }
    }
    true
}

/// Run the workflow once with status bookkeeping. A panic escaping the
/// workflow (e.g. from the execution scope itself) is recorded as an error.
async fn execute(inner: &Inner) -> RunOutcome {
    {
        let mut state = inner.write();
        state.in_flight += 1;
        state.last_run_time = Some(Utc::now());
    }
    info!("starting scheduled article fetch and processing");

    let outcome = match AssertUnwindSafe(inner.workflow.run()).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!("error in scheduled article processing: {reason}");
            RunOutcome::error(reason)
        }
    };

    if outcome.is_success() {
        info!(message = %outcome.message, "scheduled run finished");
    } else {
        warn!(message = %outcome.message, "scheduled run failed");
    }

    let mut state = inner.write();
    state.in_flight = state.in_flight.saturating_sub(1);
    state.last_run = Some(outcome.clone());
    outcome
}

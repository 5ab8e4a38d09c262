//! Scheduler status snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of the most recently completed workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    Success,
    Error,
}

/// Outcome of one workflow run: result plus a human-readable summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub result: RunResult,
    pub message: String,
}

impl RunOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            result: RunResult::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: RunResult::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == RunResult::Success
    }
}

/// Point-in-time view of the scheduler, safe to hand to any reader.
///
/// Invariants: `fetching` implies `running`, and `next_run_time` is `None`
/// whenever `running` is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Background loop is active.
    pub running: bool,
    /// A workflow run is in progress.
    #[serde(rename = "is_fetching")]
    pub fetching: bool,
    /// Start time of the most recent run.
    pub last_run_time: Option<DateTime<Utc>>,
    /// Result of the most recent completed run (`None` before the first).
    #[serde(rename = "last_run_status")]
    pub last_run_result: Option<RunResult>,
    /// Summary of the most recent completed run.
    pub last_run_message: Option<String>,
    /// Predicted start of the next tick.
    pub next_run_time: Option<DateTime<Utc>>,
    /// Seconds between ticks.
    pub interval_seconds: u64,
}

impl SchedulerStatus {
    /// Status of a scheduler that has never been started.
    pub fn stopped(interval_seconds: u64) -> Self {
        Self {
            running: false,
            fetching: false,
            last_run_time: None,
            last_run_result: None,
            last_run_message: None,
            next_run_time: None,
            interval_seconds,
        }
    }
}

//! Signal Watch: periodic article ingestion with in-process log capture.
//!
//! # Architecture
//!
//! - **Scheduler**: a background loop that runs the fetch → process
//!   [`Workflow`](scheduler::Workflow) on a fixed interval and publishes a
//!   status snapshot. Collaborators (config store, fetcher, processor,
//!   execution scope) are injected as trait objects.
//! - **Logging**: a `tracing` layer that renders every event once and hands
//!   the line to a bounded in-memory [`LogBuffer`](logging::LogBuffer) and a
//!   rolling file sink. Emitters never block on the buffer.
//! - **API**: an `axum` control surface for querying logs and driving the
//!   scheduler.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;

#[cfg(test)]
mod test_utils;

pub use api::{ApiServer, AppState};
pub use config::WatchConfig;
pub use error::{Result, WatchError};
pub use logging::{LogBuffer, LogService, LoggingHandle};
pub use scheduler::{Scheduler, SchedulerStatus, Workflow};

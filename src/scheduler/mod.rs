//! Periodic article fetch-and-process scheduler.
//!
//! [`Scheduler`] owns one background loop that runs a [`Workflow`] on a
//! fixed interval and publishes a [`SchedulerStatus`] snapshot for readers.

pub mod runner;
pub mod status;
pub mod workflow;

pub use runner::Scheduler;
pub use status::{RunOutcome, RunResult, SchedulerStatus};
pub use workflow::{
    Article, ArticleFetcher, ArticleProcessor, ConfigStore, ExecutionScope, FetchError,
    MemoryConfigStore, NoopScope, ProcessedArticle, ProcessingError, Workflow,
};

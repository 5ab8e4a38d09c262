//! Fetch-then-process workflow executed once per scheduler tick.
//!
//! The workflow only orchestrates; fetching, classification, configuration
//! lookup and the data-access scope are supplied by the caller through the
//! traits below. Each stage returns an explicit `Result` and the run
//! branches on it, producing a [`RunOutcome`] instead of an error.

use super::status::RunOutcome;
use crate::config::DEFAULT_TAG;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use tracing::{error, info};

/// Config key holding the comma-separated tag list.
pub const TAGS_KEY: &str = "tags";

/// An article returned by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An article after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedArticle {
    pub article_id: String,
    /// Whether the article was flagged as a potential signal.
    pub is_signal: bool,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Failure reported by an [`ArticleFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Failure reported by an [`ArticleProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProcessingError(pub String);

/// Key/value configuration lookup.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Fetches candidate articles for a tag list.
#[async_trait]
pub trait ArticleFetcher: Send + Sync {
    async fn fetch_articles(&self, tags: &[String]) -> std::result::Result<Vec<Article>, FetchError>;
}

/// Classifies fetched articles. `batch_size` of `None` means all at once.
#[async_trait]
pub trait ArticleProcessor: Send + Sync {
    async fn process_batch(
        &self,
        articles: Vec<Article>,
        batch_size: Option<usize>,
    ) -> std::result::Result<Vec<ProcessedArticle>, ProcessingError>;
}

/// Ambient context (e.g. a database session) held for the length of a run.
#[async_trait]
pub trait ExecutionScope: Send + Sync {
    async fn enter(&self) -> Result<()>;
    async fn exit(&self);
}

/// Scope that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScope;

#[async_trait]
impl ExecutionScope for NoopScope {
    async fn enter(&self) -> Result<()> {
        Ok(())
    }

    async fn exit(&self) {}
}

/// In-memory [`ConfigStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "workflow panicked".to_owned()
    }
}

/// Split a comma-separated tag list, trimming and dropping empty entries.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The fetch-then-process sequence and its collaborators.
#[derive(Clone)]
pub struct Workflow {
    config: Arc<dyn ConfigStore>,
    fetcher: Arc<dyn ArticleFetcher>,
    processor: Arc<dyn ArticleProcessor>,
    scope: Arc<dyn ExecutionScope>,
    default_tags: Vec<String>,
}

impl Workflow {
    pub fn new(
        config: Arc<dyn ConfigStore>,
        fetcher: Arc<dyn ArticleFetcher>,
        processor: Arc<dyn ArticleProcessor>,
    ) -> Self {
        Self {
            config,
            fetcher,
            processor,
            scope: Arc::new(NoopScope),
            default_tags: vec![DEFAULT_TAG.to_owned()],
        }
    }

    /// Run inside `scope` (entered before and exited after every run).
    pub fn with_scope(mut self, scope: Arc<dyn ExecutionScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Tags used when the config store has none. Ignored if empty.
    pub fn with_default_tags(mut self, tags: Vec<String>) -> Self {
        if !tags.is_empty() {
            self.default_tags = tags;
        }
        self
    }

    /// Execute one run and summarise it. Never returns an error.
    pub async fn run(&self) -> RunOutcome {
        if let Err(e) = self.scope.enter().await {
            error!("cannot enter execution scope: {e}");
            return RunOutcome::error(format!("Execution scope unavailable: {e}"));
        }
        let outcome = match AssertUnwindSafe(self.run_stages()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!("workflow panicked: {reason}");
                RunOutcome::error(reason)
            }
        };
        self.scope.exit().await;
        outcome
    }

    async fn run_stages(&self) -> RunOutcome {
        let tags = match self.resolve_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                error!("tag lookup failed: {e}");
                return RunOutcome::error(format!("Tag lookup failed: {e}"));
            }
        };
        info!(?tags, "fetching articles");

        let articles = match self.fetcher.fetch_articles(&tags).await {
            Ok(articles) => articles,
            Err(e) => {
                error!("article fetch error: {e}");
                return RunOutcome::error(format!("Article fetch failed: {e}"));
            }
        };

        if articles.is_empty() {
            info!("no new articles found during scheduled fetch");
            return RunOutcome::success("No new articles found");
        }

        let processed = match self.processor.process_batch(articles, None).await {
            Ok(processed) => processed,
            Err(e) => {
                error!("article processing error: {e}");
                return RunOutcome::error(format!("Processing failed: {e}"));
            }
        };

        let signals = processed.iter().filter(|p| p.is_signal).count();
        let message = format!(
            "Processed {} articles, {signals} potential signals",
            processed.len()
        );
        info!("scheduled processing complete: {message}");
        RunOutcome::success(message)
    }

    async fn resolve_tags(&self) -> Result<Vec<String>> {
        let configured = self
            .config
            .get(TAGS_KEY)
            .await
            .map_err(|e| WatchError::Config(format!("cannot read '{TAGS_KEY}': {e}")))?
            .map(|raw| parse_tags(&raw))
            .unwrap_or_default();

        if configured.is_empty() {
            Ok(self.default_tags.clone())
        } else {
            Ok(configured)
        }
    }
}

//! Shared fakes for the workflow collaborators used across unit tests.

use crate::error::{Result, WatchError};
use crate::scheduler::workflow::{
    Article, ArticleFetcher, ArticleProcessor, ConfigStore, ExecutionScope, FetchError,
    ProcessedArticle, ProcessingError,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// `n` distinct articles.
pub fn articles(n: usize) -> Vec<Article> {
    (0..n)
        .map(|i| Article {
            id: format!("article-{i}"),
            title: format!("Article {i}"),
            url: format!("https://news.example/{i}"),
            tags: Vec::new(),
        })
        .collect()
}

enum FetchBehaviour {
    Return(Vec<Article>),
    Fail(String),
    Panic,
}

/// Scripted fetcher counting its calls.
pub struct FakeFetcher {
    behaviour: FetchBehaviour,
    gate: Option<Arc<Notify>>,
    pub calls: AtomicUsize,
    tags: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with(behaviour: FetchBehaviour) -> Self {
        Self {
            behaviour,
            gate: None,
            calls: AtomicUsize::new(0),
            tags: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(articles: Vec<Article>) -> Self {
        Self::with(FetchBehaviour::Return(articles))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(FetchBehaviour::Fail(message.to_owned()))
    }

    pub fn panicking() -> Self {
        Self::with(FetchBehaviour::Panic)
    }

    /// Block every fetch until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn last_tags(&self) -> Vec<String> {
        self.tags.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ArticleFetcher for FakeFetcher {
    async fn fetch_articles(&self, tags: &[String]) -> std::result::Result<Vec<Article>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.tags.lock().unwrap_or_else(|e| e.into_inner()) = tags.to_vec();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.behaviour {
            FetchBehaviour::Return(articles) => Ok(articles.clone()),
            FetchBehaviour::Fail(message) => Err(FetchError(message.clone())),
            FetchBehaviour::Panic => panic!("fetcher exploded"),
        }
    }
}

/// Processor flagging the first `signals` articles, or failing.
pub struct FakeProcessor {
    signals: usize,
    failure: Option<String>,
    pub calls: AtomicUsize,
    batch_size: Mutex<Option<Option<usize>>>,
}

impl FakeProcessor {
    pub fn flagging(signals: usize) -> Self {
        Self {
            signals,
            failure: None,
            calls: AtomicUsize::new(0),
            batch_size: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_owned()),
            ..Self::flagging(0)
        }
    }

    /// Batch size of the last call (`None` when never called).
    pub fn last_batch_size(&self) -> Option<Option<usize>> {
        *self.batch_size.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ArticleProcessor for FakeProcessor {
    async fn process_batch(
        &self,
        articles: Vec<Article>,
        batch_size: Option<usize>,
    ) -> std::result::Result<Vec<ProcessedArticle>, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.batch_size.lock().unwrap_or_else(|e| e.into_inner()) = Some(batch_size);
        if let Some(message) = &self.failure {
            return Err(ProcessingError(message.clone()));
        }
        Ok(articles
            .into_iter()
            .enumerate()
            .map(|(i, a)| ProcessedArticle {
                article_id: a.id,
                is_signal: i < self.signals,
                summary: None,
            })
            .collect())
    }
}

/// Config store whose lookups always fail.
pub struct FailingConfig;

#[async_trait]
impl ConfigStore for FailingConfig {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(WatchError::Config("database locked".to_owned()))
    }
}

/// Scope counting enter/exit calls.
#[derive(Default)]
pub struct RecordingScope {
    refuse: bool,
    pub entered: AtomicUsize,
    pub exited: AtomicUsize,
}

impl RecordingScope {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ExecutionScope for RecordingScope {
    async fn enter(&self) -> Result<()> {
        if self.refuse {
            return Err(WatchError::Config("no database session".to_owned()));
        }
        self.entered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn exit(&self) {
        self.exited.fetch_add(1, Ordering::SeqCst);
    }
}

//! Shared helpers for integration tests.

use async_trait::async_trait;
use signal_watch::logging::{CaptureLayer, LogBuffer};
use signal_watch::scheduler::{
    Article, ArticleFetcher, ArticleProcessor, FetchError, MemoryConfigStore, ProcessedArticle,
    ProcessingError, Workflow,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;

/// Articles titled after `titles`, with sequential ids.
pub(crate) fn articles(titles: &[&str]) -> Vec<Article> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| Article {
            id: format!("a{i}"),
            title: (*title).to_owned(),
            url: format!("https://news.example/a{i}"),
            tags: Vec::new(),
        })
        .collect()
}

/// Fetcher returning a fixed article list and remembering the tags it got.
pub(crate) struct StaticFetcher {
    articles: Vec<Article>,
    pub(crate) calls: AtomicUsize,
    seen_tags: Mutex<Vec<Vec<String>>>,
}

impl StaticFetcher {
    pub(crate) fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            calls: AtomicUsize::new(0),
            seen_tags: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn seen_tags(&self) -> Vec<Vec<String>> {
        self.seen_tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleFetcher for StaticFetcher {
    async fn fetch_articles(&self, tags: &[String]) -> Result<Vec<Article>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tags.lock().unwrap().push(tags.to_vec());
        Ok(self.articles.clone())
    }
}

/// Processor flagging every article whose title contains `keyword`.
pub(crate) struct KeywordProcessor {
    keyword: String,
}

impl KeywordProcessor {
    pub(crate) fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
        }
    }
}

#[async_trait]
impl ArticleProcessor for KeywordProcessor {
    async fn process_batch(
        &self,
        articles: Vec<Article>,
        _batch_size: Option<usize>,
    ) -> Result<Vec<ProcessedArticle>, ProcessingError> {
        Ok(articles
            .into_iter()
            .map(|a| ProcessedArticle {
                is_signal: a.title.to_lowercase().contains(&self.keyword),
                article_id: a.id,
                summary: None,
            })
            .collect())
    }
}

/// Workflow over `fetcher` with a keyword processor and a fresh config store.
pub(crate) fn workflow(
    fetcher: Arc<StaticFetcher>,
    keyword: &str,
) -> (Workflow, MemoryConfigStore) {
    let store = MemoryConfigStore::new();
    let workflow = Workflow::new(
        Arc::new(store.clone()),
        fetcher,
        Arc::new(KeywordProcessor::new(keyword)),
    );
    (workflow, store)
}

/// Install a thread-local subscriber capturing every event into a new
/// buffer of `capacity` records.
pub(crate) fn capture(capacity: usize) -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::new(capacity);
    let subscriber =
        tracing_subscriber::registry().with(CaptureLayer::new().with_buffer(buffer.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

/// Let spawned tasks on the current-thread runtime make progress.
pub(crate) async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

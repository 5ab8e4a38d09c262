//! Scheduler driving a real workflow end to end.
//!
//! Runs on a paused clock so interval cadence can be checked without waiting.

use crate::helpers::{StaticFetcher, articles, settle, workflow};
use signal_watch::config::SchedulerConfig;
use signal_watch::scheduler::workflow::TAGS_KEY;
use signal_watch::scheduler::{RunResult, Scheduler};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn config(interval_secs: u64) -> SchedulerConfig {
    SchedulerConfig {
        interval_secs,
        poll_quantum_secs: 30,
        ..SchedulerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn configured_tags_flow_through_to_a_successful_summary() {
    let fetcher = Arc::new(StaticFetcher::new(articles(&[
        "Cholera outbreak reported in coastal district",
        "Regional football final",
        "Weather outlook for the week",
    ])));
    let (workflow, store) = workflow(Arc::clone(&fetcher), "outbreak");
    store.set(TAGS_KEY, "ephem emro");
    let scheduler = Scheduler::new(&config(3600), workflow);

    let outcome = scheduler.run_now().await;

    assert_eq!(outcome.result, RunResult::Success);
    assert_eq!(outcome.message, "Processed 3 articles, 1 potential signals");
    assert_eq!(fetcher.seen_tags(), vec![vec!["ephem emro".to_owned()]]);

    let status = scheduler.status();
    assert!(!status.running);
    assert!(!status.fetching);
    assert_eq!(status.last_run_result, Some(RunResult::Success));
    assert!(status.last_run_time.is_some());
    assert!(status.next_run_time.is_none());
}

#[tokio::test(start_paused = true)]
async fn missing_tag_config_falls_back_to_defaults() {
    let fetcher = Arc::new(StaticFetcher::new(Vec::new()));
    let (workflow, _store) = workflow(Arc::clone(&fetcher), "outbreak");
    let scheduler = Scheduler::new(
        &SchedulerConfig {
            default_tags: vec!["who".to_owned(), "promed".to_owned()],
            ..config(3600)
        },
        workflow,
    );

    let outcome = scheduler.run_now().await;

    assert_eq!(outcome.result, RunResult::Success);
    assert_eq!(outcome.message, "No new articles found");
    assert_eq!(
        fetcher.seen_tags(),
        vec![vec!["who".to_owned(), "promed".to_owned()]]
    );
}

#[tokio::test(start_paused = true)]
async fn runs_on_the_interval_until_stopped() {
    let fetcher = Arc::new(StaticFetcher::new(articles(&["Outbreak update"])));
    let (workflow, _store) = workflow(Arc::clone(&fetcher), "outbreak");
    let scheduler = Scheduler::new(&config(300), workflow);

    assert!(scheduler.start().unwrap());
    settle().await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    let status = scheduler.status();
    assert!(status.running);
    assert_eq!(status.interval_seconds, 300);
    assert_eq!(
        status.last_run_message.as_deref(),
        Some("Processed 1 articles, 1 potential signals")
    );
    let next = status.next_run_time.expect("next run scheduled");
    let last = status.last_run_time.expect("last run recorded");
    assert!(next > last);

    tokio::time::sleep(Duration::from_secs(301)).await;
    settle().await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

    assert!(scheduler.stop());
    settle().await;
    let status = scheduler.status();
    assert!(!status.running);
    assert!(status.next_run_time.is_none());

    tokio::time::sleep(Duration::from_secs(1200)).await;
    settle().await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_then_start_resumes_with_an_immediate_run() {
    let fetcher = Arc::new(StaticFetcher::new(Vec::new()));
    let (workflow, _store) = workflow(Arc::clone(&fetcher), "outbreak");
    let scheduler = Scheduler::new(&config(3600), workflow);

    scheduler.start().unwrap();
    settle().await;
    scheduler.stop();
    assert!(!scheduler.stop());

    assert!(scheduler.start().unwrap());
    settle().await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert!(scheduler.is_running());

    scheduler.stop();
}

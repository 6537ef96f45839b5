//! Integration tests for the fetch pipeline.
//!
//! These tests ensure the paginate/merge pipeline terminates within
//! reasonable timeouts and doesn't hang when sources fail, stall, or are
//! cancelled.
//!
//! Key scenarios tested:
//! - Many sources with uneven page counts merge without loss
//! - A failing page stops only its own source
//! - Cancellation closes the merged stream even while fetches are stuck
//! - Fetch and mirror stages compose, with blacklist and error threshold

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hoard::mirror::{MirrorError, MirrorOptions, Updater, mirror_all};
use hoard::platform::{Page, PageFetcher, PageInfo, PlatformError, Source};
use hoard::sync::{ProgressCallback, SyncProgress, stream_sources};
use hoard::{Repo, UpdateStats};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Maximum time any pipeline run should take in tests.
/// If exceeded, there's likely a hang/deadlock.
const PIPELINE_TIMEOUT: Duration = Duration::from_secs(10);

/// A source backed by a fixed list of pages, optionally failing at one index.
struct FixedPages {
    provider: &'static str,
    owner: &'static str,
    sizes: Vec<usize>,
    fail_at: Option<u32>,
    calls: Arc<AtomicUsize>,
}

impl FixedPages {
    fn new(provider: &'static str, owner: &'static str, sizes: Vec<usize>) -> Self {
        Self {
            provider,
            owner,
            sizes,
            fail_at: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing_at(mut self, page: u32) -> Self {
        self.fail_at = Some(page);
        self
    }
}

#[async_trait]
impl PageFetcher for FixedPages {
    async fn fetch_page(&self, page: u32) -> Result<Page, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.fail_at == Some(page) {
            return Err(PlatformError::api(500, "Internal Server Error"));
        }

        let offset: usize = self.sizes.iter().take(page as usize).sum();
        let size = self.sizes.get(page as usize).copied().unwrap_or(0);
        let records = (offset..offset + size)
            .map(|i| {
                let name = format!("{}/repo-{i:03}", self.owner);
                let url = format!("git@{}:{name}.git", self.provider);
                Repo::new(self.provider, name, url)
            })
            .collect();

        let last = self.sizes.len().saturating_sub(1) as u32;
        Ok(Page {
            records,
            info: PageInfo {
                next_page: (page < last).then_some(page + 1),
                last_page: Some(last),
            },
            rate: None,
        })
    }
}

/// A source whose every fetch blocks forever.
struct Stalled;

#[async_trait]
impl PageFetcher for Stalled {
    async fn fetch_page(&self, _page: u32) -> Result<Page, PlatformError> {
        std::future::pending().await
    }
}

async fn collect(mut rx: mpsc::Receiver<Repo>) -> Vec<Repo> {
    let mut out = Vec::new();
    while let Some(repo) = rx.recv().await {
        out.push(repo);
    }
    out
}

fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<SyncProgress>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: ProgressCallback = Arc::new(move |event| {
        sink.lock().expect("events lock").push(event);
    });
    (callback, events)
}

#[tokio::test]
async fn test_uneven_sources_merge_without_loss() {
    let sources = vec![
        Source::new(
            "github.com/owned",
            FixedPages::new("github.com", "alice", vec![100, 100, 37]),
        ),
        Source::new(
            "github.com/starred",
            FixedPages::new("github.com", "stars", vec![0]),
        ),
        Source::new(
            "gitlab.com/projects",
            FixedPages::new("gitlab.com", "team", vec![100, 1]),
        ),
    ];

    let cancel = CancellationToken::new();
    let repos = tokio::time::timeout(
        PIPELINE_TIMEOUT,
        collect(stream_sources(sources, &cancel, None)),
    )
    .await
    .expect("pipeline should close after every source is exhausted");

    assert_eq!(repos.len(), 237 + 101);

    // Per-source order survives the merge.
    let alice: Vec<_> = repos.iter().filter(|r| r.name.starts_with("alice/")).collect();
    assert!(alice.windows(2).all(|w| w[0].name < w[1].name));
    let team: Vec<_> = repos.iter().filter(|r| r.provider == "gitlab.com").collect();
    assert_eq!(team.len(), 101);
    assert_eq!(team.last().map(|r| r.name.as_str()), Some("team/repo-100"));
}

#[tokio::test]
async fn test_failed_page_stops_only_its_source() {
    let failing = FixedPages::new("github.com", "flaky", vec![100, 100, 100]).failing_at(2);
    let failing_calls = Arc::clone(&failing.calls);
    let sources = vec![
        Source::new("github.com/owned", failing),
        Source::new(
            "github.com/starred",
            FixedPages::new("github.com", "ok", vec![5, 5]),
        ),
    ];

    let (callback, events) = recording_callback();
    let cancel = CancellationToken::new();
    let repos = tokio::time::timeout(
        PIPELINE_TIMEOUT,
        collect(stream_sources(sources, &cancel, Some(callback))),
    )
    .await
    .expect("pipeline should close after a page error");

    let flaky = repos.iter().filter(|r| r.name.starts_with("flaky/")).count();
    let ok = repos.iter().filter(|r| r.name.starts_with("ok/")).count();
    assert_eq!(flaky, 200, "pages before the failure are still delivered");
    assert_eq!(ok, 10);
    assert_eq!(failing_calls.load(Ordering::SeqCst), 3, "no retry after a failure");
    assert!(!cancel.is_cancelled(), "a page error does not cancel other sources");

    let events = events.lock().expect("events lock");
    assert!(events.iter().any(|e| matches!(
        e,
        SyncProgress::PageError { source, page: 2, .. } if source == "github.com/owned"
    )));
    let completed: HashMap<String, usize> = events
        .iter()
        .filter_map(|e| match e {
            SyncProgress::SourceComplete { source, repos, .. } => Some((source.clone(), *repos)),
            _ => None,
        })
        .collect();
    assert_eq!(completed.get("github.com/owned"), Some(&200));
    assert_eq!(completed.get("github.com/starred"), Some(&10));
}

#[tokio::test]
async fn test_idle_consumer_bounds_fetches_per_source() {
    let pages = FixedPages::new("github.com", "big", vec![100; 20]);
    let calls = Arc::clone(&pages.calls);
    let cancel = CancellationToken::new();
    let mut rx = stream_sources(vec![Source::new("github.com/owned", pages)], &cancel, None);

    // One page waits in the merger, the next waits in the batch slot.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Draining the first page frees exactly one more fetch.
    for _ in 0..100 {
        assert!(rx.recv().await.is_some());
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    cancel.cancel();
    let rest = tokio::time::timeout(PIPELINE_TIMEOUT, collect(rx))
        .await
        .expect("stream should close after cancellation");
    assert!(rest.len() <= 200);
}

#[tokio::test]
async fn test_cancellation_closes_stream_with_stalled_fetch() {
    let sources = vec![
        Source::new("stalled", Stalled),
        Source::new("github.com/owned", FixedPages::new("github.com", "a", vec![3])),
    ];

    let cancel = CancellationToken::new();
    let mut rx = stream_sources(sources, &cancel, None);

    let mut seen = 0;
    while seen < 3 {
        let repo = tokio::time::timeout(PIPELINE_TIMEOUT, rx.recv())
            .await
            .expect("records from the healthy source should arrive");
        assert!(repo.is_some());
        seen += 1;
    }

    cancel.cancel();
    let rest = tokio::time::timeout(PIPELINE_TIMEOUT, collect(rx))
        .await
        .expect("cancellation should close the merged stream");
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_dropping_the_consumer_stops_paginators() {
    let source = FixedPages::new("github.com", "big", vec![100; 50]);
    let calls = Arc::clone(&source.calls);

    let cancel = CancellationToken::new();
    let mut rx = stream_sources(vec![Source::new("github.com/owned", source)], &cancel, None);
    assert!(rx.recv().await.is_some());
    drop(rx);

    // Backpressure plus the closed receiver bound how far the source gets.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let made = calls.load(Ordering::SeqCst);
    assert!(made < 50, "paginator kept fetching after the consumer left ({made} calls)");
}

/// Mirror stub that records names and fails on a chosen owner.
#[derive(Default)]
struct RecordingUpdater {
    fail_owner: Option<&'static str>,
    updated: Mutex<Vec<String>>,
}

#[async_trait]
impl Updater for RecordingUpdater {
    async fn update(&self, repo: &Repo) -> Result<UpdateStats, MirrorError> {
        if self.fail_owner.is_some_and(|owner| repo.namespace() == Some(owner)) {
            return Err(MirrorError::Task(format!("cannot update {}", repo.name)));
        }
        self.updated.lock().expect("lock").push(repo.name.clone());
        Ok(UpdateStats {
            bytes_downloaded: 1,
            duration: Duration::from_millis(1),
        })
    }
}

#[tokio::test]
async fn test_fetch_and_mirror_compose() {
    let sources = vec![
        Source::new("github.com/owned", FixedPages::new("github.com", "mine", vec![10, 10])),
        Source::new("github.com/starred", FixedPages::new("github.com", "huge", vec![4])),
    ];
    let options = MirrorOptions {
        concurrency: 3,
        error_threshold: 0,
        blacklist: vec!["huge".to_string()],
    };
    let updater = Arc::new(RecordingUpdater::default());
    let cancel = CancellationToken::new();

    let summary = tokio::time::timeout(
        PIPELINE_TIMEOUT,
        mirror_all(
            stream_sources(sources, &cancel, None),
            updater.clone(),
            &options,
            &cancel,
            None,
        ),
    )
    .await
    .expect("fetch and mirror should finish");

    assert_eq!(summary.updated, 20);
    assert_eq!(summary.skipped, 4);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes_downloaded, 20);

    let updated = updater.updated.lock().expect("lock");
    assert!(updated.iter().all(|name| name.starts_with("mine/")));
}

#[tokio::test]
async fn test_error_threshold_stops_fetching() {
    let broken = FixedPages::new("github.com", "broken", vec![100; 40]);
    let calls = Arc::clone(&broken.calls);
    let sources = vec![Source::new("github.com/owned", broken)];
    let options = MirrorOptions {
        concurrency: 2,
        error_threshold: 5,
        blacklist: Vec::new(),
    };
    let updater = Arc::new(RecordingUpdater {
        fail_owner: Some("broken"),
        ..RecordingUpdater::default()
    });
    let cancel = CancellationToken::new();

    let summary = tokio::time::timeout(
        PIPELINE_TIMEOUT,
        mirror_all(
            stream_sources(sources, &cancel, None),
            updater,
            &options,
            &cancel,
            None,
        ),
    )
    .await
    .expect("threshold should end the run");

    assert!(summary.threshold_reached);
    assert!(summary.failed >= 5);
    assert!(cancel.is_cancelled());
    assert!(calls.load(Ordering::SeqCst) < 40, "cancellation reached the paginator");
}

//! Drive one [`Source`] page by page onto a batch channel.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::platform::{Page, Source, short_error_message};
use crate::repo::Repo;

use super::progress::{ProgressCallback, SyncProgress, emit};

/// Capacity of each source's batch channel.
///
/// The paginator reserves this slot before each fetch, so a page is only
/// requested once the previous batch has been taken by the receiver.
const BATCH_CHANNEL_CAPACITY: usize = 1;

/// What a paginator did before it stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaginateSummary {
    /// Pages fully handed off downstream.
    pub pages: u32,
    /// Records handed off downstream.
    pub repos: usize,
    /// How the source ended.
    pub outcome: PaginateOutcome,
}

/// Why a paginator stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaginateOutcome {
    /// The provider reported the last page.
    #[default]
    Exhausted,
    /// A page fetch failed.
    Failed,
    /// The cancellation token fired.
    Cancelled,
    /// The receiving side went away.
    Disconnected,
}

/// Spawn a paginator for `source` and return its batch stream.
///
/// Each page's records arrive as one `Vec<Repo>`, in page order. The
/// channel closes when the source is exhausted, fails, is cancelled, or the
/// receiver is dropped.
pub fn paginate(
    source: Source,
    cancel: CancellationToken,
    on_progress: Option<ProgressCallback>,
) -> mpsc::Receiver<Vec<Repo>> {
    let (tx, rx) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        run_paginator(source, tx, cancel, on_progress.as_ref()).await;
    });
    rx
}

/// Fetch pages from `source` starting at index 0 and send them on `tx`.
///
/// A page fetched while cancellation is pending is dropped rather than
/// sent. No page is requested until the previous one was received.
/// Already-sent pages stay valid when a later page fails.
pub async fn run_paginator(
    source: Source,
    tx: mpsc::Sender<Vec<Repo>>,
    cancel: CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> PaginateSummary {
    let Source { name, fetcher } = source;
    let start = Instant::now();
    let mut summary = PaginateSummary::default();
    let mut page = 0u32;

    emit(
        on_progress,
        SyncProgress::FetchingSource {
            source: name.clone(),
        },
    );

    loop {
        // Claim the hand-off slot first so the next page is only requested
        // once the previous batch has been taken.
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.outcome = PaginateOutcome::Cancelled;
                break;
            }
            permit = tx.reserve() => permit,
        };
        let Ok(permit) = permit else {
            tracing::debug!(source = %name, page, "Batch receiver dropped, stopping");
            summary.outcome = PaginateOutcome::Disconnected;
            break;
        };

        let page_start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.outcome = PaginateOutcome::Cancelled;
                break;
            }
            result = fetcher.fetch_page(page) => result,
        };
        let duration = page_start.elapsed();

        let Page {
            records,
            info,
            rate,
        } = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                emit(
                    on_progress,
                    SyncProgress::PageError {
                        source: name.clone(),
                        page,
                        error: short_error_message(&e),
                    },
                );
                summary.outcome = PaginateOutcome::Failed;
                break;
            }
        };

        if cancel.is_cancelled() {
            summary.outcome = PaginateOutcome::Cancelled;
            break;
        }
        let count = records.len();
        permit.send(records);

        summary.pages += 1;
        summary.repos += count;

        emit(
            on_progress,
            SyncProgress::FetchedPage {
                source: name.clone(),
                page,
                count,
                total_so_far: summary.repos,
                duration,
                rate,
                next_page: info.next_page,
            },
        );

        if info.is_last(page) {
            break;
        }
        page += 1;
    }

    if summary.outcome == PaginateOutcome::Cancelled {
        emit(
            on_progress,
            SyncProgress::SourceCancelled {
                source: name.clone(),
                page,
            },
        );
    }

    emit(
        on_progress,
        SyncProgress::SourceComplete {
            source: name,
            pages: summary.pages,
            repos: summary.repos,
            duration: start.elapsed(),
        },
    );

    summary
}

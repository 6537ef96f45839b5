//! Progress reporting types for fetch and mirror operations.
//!
//! Events are delivered synchronously, inline with pipeline progress. The
//! callback must not block for long: it runs on the paginator and mirror
//! tasks themselves.

use std::sync::Arc;
use std::time::Duration;

use crate::platform::RateInfo;
use crate::repo::UpdateStats;

/// Progress events emitted while enumerating and mirroring repositories.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A source's paginator started.
    FetchingSource {
        /// Source label (e.g. "github.com/starred").
        source: String,
    },

    /// Fetched and handed off one page.
    FetchedPage {
        source: String,
        /// Zero-based page index.
        page: u32,
        /// Number of repos on this page.
        count: usize,
        /// Running total of repos emitted by this source.
        total_so_far: usize,
        /// Time spent on the network call.
        duration: Duration,
        /// Rate limit snapshot, when the provider reported one.
        rate: Option<RateInfo>,
        /// Next page cursor as reported by the provider.
        next_page: Option<u32>,
    },

    /// A page fetch failed; the source stops.
    PageError {
        source: String,
        page: u32,
        error: String,
    },

    /// The source observed cancellation and stopped.
    SourceCancelled { source: String, page: u32 },

    /// The source finished (successfully or not).
    SourceComplete {
        source: String,
        /// Number of pages emitted.
        pages: u32,
        /// Number of repos emitted.
        repos: usize,
        duration: Duration,
    },

    /// Starting to update a mirror.
    MirrorStarted { name: String, url: String },

    /// Mirror updated.
    Mirrored { name: String, stats: UpdateStats },

    /// Mirror update failed.
    MirrorError { name: String, error: String },

    /// Repo skipped because it matched the blacklist.
    Skipped { name: String },

    /// Too many mirror failures; the run is being cancelled.
    ErrorThresholdReached { errors: usize },

    /// All mirror updates finished.
    MirrorComplete {
        updated: usize,
        failed: usize,
        skipped: usize,
        bytes_downloaded: u64,
    },
}

/// Callback for progress updates.
///
/// Shared because every paginator task holds its own handle.
pub type ProgressCallback = Arc<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// # Example
///
/// ```ignore
/// use hoard::sync::{emit, SyncProgress, ProgressCallback};
///
/// fn report(on_progress: Option<&ProgressCallback>) {
///     emit(on_progress, SyncProgress::Skipped { name: "a/b".into() });
/// }
/// ```
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

use hoard::sync::SyncProgress;

use super::format_bytes;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::FetchingSource { source } => {
                tracing::info!(source = %source, "Fetching repositories");
            }

            SyncProgress::FetchedPage {
                source,
                page,
                count,
                total_so_far,
                duration,
                rate,
                next_page,
            } => {
                tracing::debug!(
                    source = %source,
                    page,
                    count,
                    total_so_far,
                    elapsed_ms = duration.as_millis() as u64,
                    rate_remaining = ?rate.as_ref().map(|r| r.remaining),
                    rate_limit = ?rate.as_ref().map(|r| r.limit),
                    next_page = ?next_page,
                    "Fetched page"
                );
            }

            SyncProgress::PageError {
                source,
                page,
                error,
            } => {
                tracing::error!(source = %source, page, error = %error, "Failed to fetch page");
            }

            SyncProgress::SourceCancelled { source, page } => {
                tracing::warn!(source = %source, page, "Fetch cancelled");
            }

            SyncProgress::SourceComplete {
                source,
                pages,
                repos,
                duration,
            } => {
                tracing::info!(
                    source = %source,
                    pages,
                    repos,
                    elapsed_ms = duration.as_millis() as u64,
                    "Fetch complete"
                );
            }

            SyncProgress::MirrorStarted { name, url } => {
                tracing::debug!(repo = %name, url = %url, "Updating mirror");
            }

            SyncProgress::Mirrored { name, stats } => {
                tracing::info!(
                    repo = %name,
                    downloaded = %format_bytes(stats.bytes_downloaded),
                    elapsed_ms = stats.duration.as_millis() as u64,
                    "Updated"
                );
            }

            SyncProgress::MirrorError { name, error } => {
                tracing::warn!(repo = %name, error = %error, "Failed to update");
            }

            SyncProgress::Skipped { name } => {
                tracing::debug!(repo = %name, "Skipped (blacklisted)");
            }

            SyncProgress::ErrorThresholdReached { errors } => {
                tracing::error!(errors, "Error threshold reached, stopping");
            }

            SyncProgress::MirrorComplete {
                updated,
                failed,
                skipped,
                bytes_downloaded,
            } => {
                tracing::info!(
                    updated,
                    failed,
                    skipped,
                    downloaded = %format_bytes(bytes_downloaded),
                    "Mirror complete"
                );
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use hoard::sync::SyncProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::format_bytes;

const TICK: Duration = Duration::from_millis(100);

/// Running mirror counters shown on the mirror bar.
#[derive(Default)]
struct MirrorCounts {
    updated: usize,
    failed: usize,
    skipped: usize,
    bytes: u64,
}

impl MirrorCounts {
    fn message(&self) -> String {
        format!(
            "{} updated, {} failed, {} skipped ({})",
            self.updated,
            self.failed,
            self.skipped,
            format_bytes(self.bytes)
        )
    }
}

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// One spinner per source, keyed by source label.
    fetch_bars: HashMap<String, ProgressBar>,
    /// Single counter for all mirror updates.
    mirror_bar: Option<ProgressBar>,
    counts: MirrorCounts,
}

/// Interactive progress reporter using indicatif.
///
/// Fetch spinners are stacked above a single mirror counter, which is
/// created on the first mirror event.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn mirror_bar(&self, state: &mut ProgressState) -> ProgressBar {
        state
            .mirror_bar
            .get_or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::counter_style());
                bar.set_prefix(format!("{:24}", "mirror"));
                bar.enable_steady_tick(TICK);
                bar
            })
            .clone()
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            SyncProgress::FetchingSource { source } => {
                let bar = match state.mirror_bar {
                    Some(ref mirror) => {
                        self.multi.insert_before(mirror, ProgressBar::new_spinner())
                    }
                    None => self.multi.add(ProgressBar::new_spinner()),
                };
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{source:24}"));
                bar.set_message("Fetching repositories...");
                bar.enable_steady_tick(TICK);
                state.fetch_bars.insert(source, bar);
            }

            SyncProgress::FetchedPage {
                source,
                page,
                total_so_far,
                rate,
                ..
            } => {
                if let Some(bar) = state.fetch_bars.get(&source)
                    && !bar.is_finished()
                {
                    let mut msg = format!("Page {} ({} repos)", page + 1, total_so_far);
                    if let Some(rate) = rate {
                        msg.push_str(&format!(
                            ", {}/{} API calls left",
                            rate.remaining, rate.limit
                        ));
                    }
                    bar.set_message(msg);
                }
            }

            SyncProgress::PageError {
                source,
                page,
                error,
            } => {
                if let Some(bar) = state.fetch_bars.get(&source) {
                    bar.abandon_with_message(format!(
                        "{} on page {}: {}",
                        style("Failed").red().bold(),
                        page + 1,
                        error
                    ));
                }
            }

            SyncProgress::SourceCancelled { source, .. } => {
                if let Some(bar) = state.fetch_bars.get(&source)
                    && !bar.is_finished()
                {
                    bar.abandon_with_message(style("Cancelled").yellow().to_string());
                }
            }

            SyncProgress::SourceComplete {
                source,
                pages,
                repos,
                duration,
            } => {
                if let Some(bar) = state.fetch_bars.get(&source)
                    && !bar.is_finished()
                {
                    bar.finish_with_message(format!(
                        "{} {} repos in {} pages ({:.1}s)",
                        style("✓").green(),
                        repos,
                        pages,
                        duration.as_secs_f64()
                    ));
                }
            }

            SyncProgress::MirrorStarted { name, .. } => {
                let bar = self.mirror_bar(&mut state);
                bar.set_message(format!("{} | {}", state.counts.message(), name));
            }

            SyncProgress::Mirrored { stats, .. } => {
                state.counts.updated += 1;
                state.counts.bytes += stats.bytes_downloaded;
                let bar = self.mirror_bar(&mut state);
                bar.inc(1);
                bar.set_message(state.counts.message());
            }

            SyncProgress::MirrorError { name, error } => {
                state.counts.failed += 1;
                let bar = self.mirror_bar(&mut state);
                bar.inc(1);
                bar.set_message(state.counts.message());
                self.multi
                    .println(format!("{} {}: {}", style("✗").red(), name, error))
                    .ok();
            }

            SyncProgress::Skipped { .. } => {
                state.counts.skipped += 1;
                let bar = self.mirror_bar(&mut state);
                bar.set_message(state.counts.message());
            }

            SyncProgress::ErrorThresholdReached { errors } => {
                self.multi
                    .println(format!(
                        "{} {} updates failed, stopping",
                        style("!").yellow().bold(),
                        errors
                    ))
                    .ok();
            }

            SyncProgress::MirrorComplete { .. } => {
                if let Some(ref bar) = state.mirror_bar {
                    bar.finish_with_message(state.counts.message());
                }
            }

            _ => {}
        }
    }

    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for bar in state.fetch_bars.values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
        if let Some(ref bar) = state.mirror_bar
            && !bar.is_finished()
        {
            bar.finish();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn counter_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {pos:>4} {msg}")
            .expect("Invalid template")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard::UpdateStats;

    fn hidden() -> InteractiveReporter {
        let reporter = InteractiveReporter::new();
        reporter
            .multi
            .set_draw_target(indicatif::ProgressDrawTarget::hidden());
        reporter
    }

    #[test]
    fn test_source_lifecycle_finishes_bar() {
        let reporter = hidden();
        reporter.handle(SyncProgress::FetchingSource {
            source: "github.com/owned".to_string(),
        });
        reporter.handle(SyncProgress::SourceComplete {
            source: "github.com/owned".to_string(),
            pages: 2,
            repos: 150,
            duration: Duration::from_millis(900),
        });

        let state = reporter.state.lock().expect("state");
        assert!(state.fetch_bars["github.com/owned"].is_finished());
    }

    #[test]
    fn test_mirror_counts_accumulate() {
        let reporter = hidden();
        reporter.handle(SyncProgress::Mirrored {
            name: "a/b".to_string(),
            stats: UpdateStats {
                bytes_downloaded: 2048,
                duration: Duration::from_millis(5),
            },
        });
        reporter.handle(SyncProgress::MirrorError {
            name: "a/c".to_string(),
            error: "boom".to_string(),
        });
        reporter.handle(SyncProgress::Skipped {
            name: "a/d".to_string(),
        });

        let state = reporter.state.lock().expect("state");
        assert_eq!(state.counts.message(), "1 updated, 1 failed, 1 skipped (2.0 KiB)");
        assert_eq!(state.mirror_bar.as_ref().map(|b| b.position()), Some(2));
    }

    #[test]
    fn test_events_for_unknown_sources_are_ignored() {
        let reporter = hidden();
        reporter.handle(SyncProgress::PageError {
            source: "never-started".to_string(),
            page: 0,
            error: "x".to_string(),
        });
        reporter.finish();
        assert!(reporter.state.lock().expect("state").fetch_bars.is_empty());
    }
}

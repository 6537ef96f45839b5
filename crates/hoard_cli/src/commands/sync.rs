//! `hoard sync`: fetch every configured source and update local mirrors.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use console::style;
use hoard::{Mirror, MirrorOptions, MirrorSummary, Updater, fetch_repos, mirror_all};
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressReporter, counting_page_errors, format_bytes};

/// Maximum number of individual failures printed after a run.
const MAX_DISPLAYED_FAILURES: usize = 10;

/// Per-run overrides of the `[general]` section.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SyncArgs {
    /// Mirror root directory (overrides general.root)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Maximum concurrent git operations (overrides general.concurrency)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Stop after this many failed updates, 0 = never (overrides general.error_threshold)
    #[arg(short = 'e', long)]
    pub error_threshold: Option<usize>,
}

impl SyncArgs {
    fn apply(&self, config: &mut hoard::Config) {
        if let Some(root) = &self.root {
            config.general.root = root.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.general.concurrency = concurrency;
        }
        if let Some(threshold) = self.error_threshold {
            config.general.error_threshold = threshold;
        }
    }
}

pub(crate) async fn handle_sync(
    args: SyncArgs,
    mut config: hoard::Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    args.apply(&mut config);

    let reporter = Arc::new(ProgressReporter::new());
    let (callback, page_errors) = counting_page_errors(reporter.as_callback());

    let repos = fetch_repos(&config, &cancel, Some(Arc::clone(&callback)))?;
    let mirror: Arc<dyn Updater> = Arc::new(Mirror::new(&config.general.root));
    let options = MirrorOptions::from(&config.general);

    let summary = mirror_all(repos, mirror, &options, &cancel, Some(&callback)).await;
    reporter.finish();

    let page_errors = page_errors.load(Ordering::Relaxed);
    display_summary(&summary, page_errors, reporter.is_interactive());

    if cancel.is_cancelled() && !summary.threshold_reached {
        return Err("Interrupted".into());
    }
    if summary.failed > 0 || page_errors > 0 {
        return Err(format!(
            "{} mirror update(s) and {} page fetch(es) failed",
            summary.failed, page_errors
        )
        .into());
    }
    Ok(())
}

fn display_summary(summary: &MirrorSummary, page_errors: usize, is_tty: bool) {
    if !is_tty {
        for failure in summary.failures.iter().take(MAX_DISPLAYED_FAILURES) {
            tracing::error!(repo = %failure.name, error = %failure.error, "Mirror update failed");
        }
        if summary.failures.len() > MAX_DISPLAYED_FAILURES {
            tracing::error!(
                additional_errors = summary.failures.len() - MAX_DISPLAYED_FAILURES,
                "Additional mirror failures occurred"
            );
        }
        return;
    }

    println!();
    println!(
        "{} {} updated, {} skipped, {} downloaded",
        style("Done:").green().bold(),
        summary.updated,
        summary.skipped,
        format_bytes(summary.bytes_downloaded)
    );

    if summary.aborted > 0 {
        println!(
            "{} {} update(s) interrupted",
            style("Note:").yellow().bold(),
            summary.aborted
        );
    }
    if page_errors > 0 {
        eprintln!(
            "{} {} source(s) stopped early on a page error",
            style("Warning:").yellow().bold(),
            page_errors
        );
    }
    if !summary.failures.is_empty() {
        eprintln!(
            "{}",
            style(format!("Mirror failures ({} total):", summary.failures.len()))
                .yellow()
                .bold()
        );
        for failure in summary.failures.iter().take(MAX_DISPLAYED_FAILURES) {
            eprintln!("  - {}: {}", failure.name, failure.error);
        }
        if summary.failures.len() > MAX_DISPLAYED_FAILURES {
            eprintln!(
                "  ... and {} more errors",
                summary.failures.len() - MAX_DISPLAYED_FAILURES
            );
        }
    }
}

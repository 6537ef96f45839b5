//! `hoard list`: print every repository the configured sources return.

use std::io::{ErrorKind, Write};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::ValueEnum;
use hoard::{Repo, fetch_repos};
use tokio_util::sync::CancellationToken;

use crate::progress::{ProgressReporter, counting_page_errors};

/// Output format for `hoard list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated provider, name and clone URL
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

fn render(repo: &Repo, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(format!("{}\t{}\t{}", repo.provider, repo.name, repo.url)),
        OutputFormat::Json => serde_json::to_string(repo),
    }
}

pub(crate) async fn handle_list(
    format: OutputFormat,
    config: hoard::Config,
    cancel: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the listing, so progress only goes to the log.
    let reporter = Arc::new(ProgressReporter::logging());
    let (callback, page_errors) = counting_page_errors(reporter.as_callback());

    let mut repos = fetch_repos(&config, &cancel, Some(callback))?;
    let mut stdout = std::io::stdout();
    let mut count = 0usize;

    while let Some(repo) = repos.recv().await {
        let line = render(&repo, format)?;
        if let Err(e) = writeln!(stdout, "{line}") {
            if e.kind() == ErrorKind::BrokenPipe {
                cancel.cancel();
                return Ok(());
            }
            return Err(e.into());
        }
        count += 1;
    }
    stdout.flush()?;

    tracing::info!(count, "Listed repositories");

    let page_errors = page_errors.load(Ordering::Relaxed);
    if cancel.is_cancelled() {
        return Err("Interrupted".into());
    }
    if page_errors > 0 {
        return Err(format!("{page_errors} source(s) stopped early on a page error").into());
    }
    Ok(())
}

//! Local mirroring of fetched repositories.
//!
//! [`Mirror`] clones or updates one checkout with the `git` binary.
//! [`mirror_all`] drains the merged record stream into a bounded number of
//! concurrent updates.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{General, is_blacklisted};
use crate::repo::{Repo, UpdateStats};
use crate::sync::{ProgressCallback, SyncProgress, emit};

/// Errors from updating a single mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("git {command} exited with {status}: {stderr}")]
    Git {
        command: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mirror task failed: {0}")]
    Task(String),
}

/// Anything that can bring one local mirror up to date.
#[async_trait]
pub trait Updater: Send + Sync {
    async fn update(&self, repo: &Repo) -> Result<UpdateStats, MirrorError>;
}

/// Git-backed mirror rooted at a directory.
#[derive(Debug, Clone)]
pub struct Mirror {
    root: PathBuf,
}

impl Mirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Updater for Mirror {
    /// Clone when the destination is missing, otherwise pull every remote
    /// and refresh submodules.
    async fn update(&self, repo: &Repo) -> Result<UpdateStats, MirrorError> {
        let start = Instant::now();
        let dest = repo.destination(&self.root);
        let before = dir_size(&dest).await;

        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(repo = %repo.name, dest = %dest.display(), "Pulling");
            git("pull", &dest, &["pull", "--all"]).await?;
            git(
                "submodule update",
                &dest,
                &["submodule", "update", "--recursive", "--init"],
            )
            .await?;
        } else {
            debug!(repo = %repo.name, dest = %dest.display(), "Cloning");
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| MirrorError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
            let dest_arg = dest.to_string_lossy();
            git(
                "clone",
                &self.root,
                &["clone", "--recurse-submodules", repo.url.as_str(), dest_arg.as_ref()],
            )
            .await?;
        }

        let after = dir_size(&dest).await;
        Ok(UpdateStats {
            bytes_downloaded: after.saturating_sub(before),
            duration: start.elapsed(),
        })
    }
}

/// Run one git command in `cwd`, failing on non-zero exit.
///
/// The child is killed if the future is dropped.
async fn git(command: &'static str, cwd: &Path, args: &[&str]) -> Result<(), MirrorError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| MirrorError::Spawn { command, source })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(MirrorError::Git {
        command,
        status: output.status.to_string(),
        stderr: stderr.trim().lines().last().unwrap_or_default().to_string(),
    })
}

/// Total size in bytes of every file under `path`; 0 when missing.
async fn dir_size(path: &Path) -> u64 {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || dir_size_blocking(&path))
        .await
        .unwrap_or(0)
}

fn dir_size_blocking(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.metadata().ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .sum()
}

/// Limits applied while draining the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Maximum concurrent updates (at least 1).
    pub concurrency: usize,
    /// Cancel the run after this many failures; 0 disables.
    pub error_threshold: usize,
    /// Full names or namespaces to skip.
    pub blacklist: Vec<String>,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self::from(&General::default())
    }
}

impl From<&General> for MirrorOptions {
    fn from(general: &General) -> Self {
        Self {
            concurrency: general.concurrency,
            error_threshold: general.error_threshold,
            blacklist: general.blacklist.clone(),
        }
    }
}

/// A failed mirror update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorFailure {
    pub name: String,
    pub error: String,
}

/// Totals for one [`mirror_all`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSummary {
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Updates abandoned because the run was cancelled.
    pub aborted: usize,
    pub bytes_downloaded: u64,
    pub failures: Vec<MirrorFailure>,
    /// The error threshold tripped and cancelled the run.
    pub threshold_reached: bool,
}

impl MirrorSummary {
    fn record(
        &mut self,
        joined: Result<(Repo, Result<UpdateStats, MirrorError>), JoinError>,
        on_progress: Option<&ProgressCallback>,
    ) {
        match joined {
            Ok((repo, Ok(stats))) => {
                self.updated += 1;
                self.bytes_downloaded += stats.bytes_downloaded;
                debug!(
                    repo = %repo.name,
                    provider = %repo.provider,
                    bytes = stats.bytes_downloaded,
                    elapsed_ms = stats.duration.as_millis() as u64,
                    "Updated mirror"
                );
                emit(
                    on_progress,
                    SyncProgress::Mirrored {
                        name: repo.name,
                        stats,
                    },
                );
            }
            Ok((repo, Err(err))) => self.fail(repo.name, err.to_string(), on_progress),
            Err(err) if err.is_cancelled() => self.aborted += 1,
            Err(err) => self.fail(
                "<unknown>".to_string(),
                MirrorError::Task(err.to_string()).to_string(),
                on_progress,
            ),
        }
    }

    fn fail(&mut self, name: String, error: String, on_progress: Option<&ProgressCallback>) {
        self.failed += 1;
        debug!(repo = %name, error = %error, "Mirror update failed");
        emit(
            on_progress,
            SyncProgress::MirrorError {
                name: name.clone(),
                error: error.clone(),
            },
        );
        self.failures.push(MirrorFailure { name, error });
    }
}

/// Drain `repos` into `updater`, at most `options.concurrency` at a time.
///
/// Blacklisted repos are skipped. Once `options.error_threshold` failures
/// have been seen the shared token is cancelled, which also stops the fetch
/// pipeline feeding `repos`. On cancellation, in-flight updates are aborted.
pub async fn mirror_all(
    mut repos: mpsc::Receiver<Repo>,
    updater: Arc<dyn Updater>,
    options: &MirrorOptions,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) -> MirrorSummary {
    let concurrency = options.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut join_set: JoinSet<(Repo, Result<UpdateStats, MirrorError>)> = JoinSet::new();
    let mut summary = MirrorSummary::default();
    let mut permit: Option<OwnedSemaphorePermit> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            Some(joined) = join_set.join_next() => {
                summary.record(joined, on_progress);
                check_threshold(&mut summary, options, cancel, on_progress);
            }

            acquired = Arc::clone(&semaphore).acquire_owned(), if permit.is_none() => {
                match acquired {
                    Ok(p) => permit = Some(p),
                    Err(_) => break,
                }
            }

            next = repos.recv(), if permit.is_some() => {
                let Some(repo) = next else { break };

                if is_blacklisted(&options.blacklist, &repo) {
                    summary.skipped += 1;
                    debug!(repo = %repo.name, "Skipping blacklisted repo");
                    emit(on_progress, SyncProgress::Skipped { name: repo.name });
                    continue;
                }

                emit(
                    on_progress,
                    SyncProgress::MirrorStarted {
                        name: repo.name.clone(),
                        url: repo.url.clone(),
                    },
                );
                let held = permit.take();
                let updater = Arc::clone(&updater);
                join_set.spawn(async move {
                    let _permit = held;
                    let result = updater.update(&repo).await;
                    (repo, result)
                });
            }
        }
    }

    let mut aborting = false;
    while !join_set.is_empty() {
        tokio::select! {
            biased;

            _ = cancel.cancelled(), if !aborting => {
                aborting = true;
                join_set.abort_all();
            }

            Some(joined) = join_set.join_next() => {
                summary.record(joined, on_progress);
                check_threshold(&mut summary, options, cancel, on_progress);
            }
        }
    }

    emit(
        on_progress,
        SyncProgress::MirrorComplete {
            updated: summary.updated,
            failed: summary.failed,
            skipped: summary.skipped,
            bytes_downloaded: summary.bytes_downloaded,
        },
    );
    summary
}

fn check_threshold(
    summary: &mut MirrorSummary,
    options: &MirrorOptions,
    cancel: &CancellationToken,
    on_progress: Option<&ProgressCallback>,
) {
    if options.error_threshold == 0
        || summary.threshold_reached
        || summary.failed < options.error_threshold
    {
        return;
    }
    summary.threshold_reached = true;
    warn!(
        errors = summary.failed,
        threshold = options.error_threshold,
        "Error threshold reached, cancelling"
    );
    emit(
        on_progress,
        SyncProgress::ErrorThresholdReached {
            errors: summary.failed,
        },
    );
    cancel.cancel();
}

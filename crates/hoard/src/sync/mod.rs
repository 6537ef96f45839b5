//! The concurrent fetch pipeline and its progress events.
//!
//! Each [`Source`](crate::platform::Source) gets its own paginator task
//! writing page batches onto a capacity-1 channel. A merger flattens all
//! batch channels into a single record stream that closes when every
//! paginator has stopped. One [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is shared by every task.
//!
//! # Example
//!
//! ```ignore
//! use hoard::sync::fetch_repos;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let mut repos = fetch_repos(&config, &cancel, None)?;
//! while let Some(repo) = repos.recv().await {
//!     println!("{} {}", repo.provider, repo.name);
//! }
//! ```

pub mod engine;
mod merge;
mod paginate;
mod progress;

pub use engine::{SyncError, fetch_repos, sources, stream_sources};
pub use merge::merge;
pub use paginate::{PaginateOutcome, PaginateSummary, paginate, run_paginator};
pub use progress::{ProgressCallback, SyncProgress, emit};

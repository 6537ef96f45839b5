//! Hoard - mirror every repository you own, star, or belong to.
//!
//! This library enumerates repositories across GitHub and GitLab (including
//! self-hosted instances), streams them through a concurrent pagination
//! pipeline, and keeps a local git mirror of each one.
//!
//! # Features
//!
//! - `github` - GitHub adapter (owned/organisation/collaborator and starred).
//! - `gitlab` - GitLab adapter (starred/owned/membership project listing).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hoard::{Config, Mirror, MirrorOptions, fetch_repos, mirror_all};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let repos = fetch_repos(&config, &cancel, None)?;
//! let mirror = Arc::new(Mirror::new(&config.general.root));
//! let summary = mirror_all(repos, mirror, &MirrorOptions::from(&config.general), &cancel, None).await;
//! println!("{} updated, {} failed", summary.updated, summary.failed);
//! ```

pub mod config;
pub mod http;
pub mod mirror;
pub mod platform;
pub mod repo;
pub mod sync;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "gitlab")]
pub mod gitlab;

pub use config::{Config, ConfigError, General, GitHubConfig, GitLabConfig, ValidationError};
pub use mirror::{Mirror, MirrorError, MirrorOptions, MirrorSummary, Updater, mirror_all};
pub use platform::{Page, PageFetcher, PageInfo, PlatformError, RateInfo, Source};
pub use repo::{Repo, UpdateStats};
pub use sync::{ProgressCallback, SyncError, SyncProgress, fetch_repos, stream_sources};

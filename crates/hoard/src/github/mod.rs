//! GitHub provider adapter.
//!
//! Exposes the authenticated user's repositories as up to two sources:
//! `github.com/owned` (filtered by affiliation) and `github.com/starred`.
//!
//! ```ignore
//! use hoard::github;
//!
//! let sources = github::sources(&config.github.unwrap())?;
//! ```

mod client;
mod convert;
mod source;
mod types;

/// Provider identifier attached to every GitHub repo.
pub const GITHUB_PROVIDER: &str = "github.com";

pub use client::{
    GITHUB_API_URL, GitHubClient, LinkPagination, ListResponse, parse_link_header,
    parse_rate_limit_headers,
};
pub use convert::to_repo;
pub use source::{GitHubListing, GitHubRepos, sources, sources_with_transport};
pub use types::GitHubRepository;

//! GitLab provider adapter.
//!
//! One source per configuration: the project listing filtered by
//! starred/owned/membership. Works against gitlab.com or a self-hosted host.

mod client;
mod convert;
mod source;
mod types;

pub use client::{
    GitLabClient, ListResponse, normalize_host, parse_pagination_headers,
    parse_rate_limit_headers,
};
pub use convert::to_repo;
pub use source::{GitLabProjects, ProjectFilters, source, source_with_transport};
pub use types::GitLabProject;

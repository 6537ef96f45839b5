//! GitLab API response shapes.

use serde::Deserialize;

/// The fields of a project object this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    /// Full path including namespace (e.g., "group/subgroup/project").
    pub path_with_namespace: String,
    /// SSH clone URL.
    pub ssh_url_to_repo: String,
}

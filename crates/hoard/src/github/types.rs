//! GitHub API response shapes.

use serde::Deserialize;

/// The fields of a repository object this crate reads.
///
/// Both `/user/repos` and `/user/starred` return this shape.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepository {
    /// "owner/name".
    pub full_name: String,
    /// SSH clone URL, e.g. "git@github.com:owner/name.git".
    pub ssh_url: String,
}

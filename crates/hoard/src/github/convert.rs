//! Conversion from GitHub API records to [`Repo`]s.

use crate::repo::Repo;

use super::GITHUB_PROVIDER;
use super::types::GitHubRepository;

/// Normalize a GitHub repository record.
pub fn to_repo(repo: GitHubRepository) -> Repo {
    Repo::new(GITHUB_PROVIDER, repo.full_name, repo.ssh_url)
}

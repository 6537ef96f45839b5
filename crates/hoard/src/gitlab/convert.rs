//! Conversion from GitLab projects to [`Repo`]s.

use crate::repo::Repo;

use super::types::GitLabProject;

/// Normalize a project under the given provider identifier.
pub fn to_repo(provider: &str, project: GitLabProject) -> Repo {
    Repo::new(provider, project.path_with_namespace, project.ssh_url_to_repo)
}

//! The provider-agnostic repository record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A repository reference normalized from any provider.
///
/// `provider` and `name` together identify one logical repository. Nothing
/// in the pipeline deduplicates: a repository that is both owned and
/// starred is emitted once per source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repo {
    /// Host the repository lives on (e.g. "github.com" or a GitLab override).
    pub provider: String,
    /// Namespace-qualified name (e.g. "owner/project").
    pub name: String,
    /// Clone URL.
    pub url: String,
}

impl Repo {
    pub fn new(
        provider: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// Local mirror location: `root/provider/name`.
    #[must_use]
    pub fn destination(&self, root: &Path) -> PathBuf {
        let mut dest = root.join(&self.provider);
        for segment in self.name.split('/').filter(|s| !s.is_empty()) {
            dest.push(segment);
        }
        dest
    }

    /// Namespace part of the name ("owner" for "owner/project").
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.name.rsplit_once('/').map(|(ns, _)| ns)
    }
}

/// Statistics gathered while updating one mirrored repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub bytes_downloaded: u64,
    pub duration: Duration,
}

//! Configuration schema and validation.
//!
//! Loading (files, environment) is the CLI's job; this module only defines
//! the shape and checks every present section before any network activity.
//!
//! Example TOML:
//! ```toml
//! [general]
//! root = "/srv/mirror"
//! blacklist = ["some-org/huge-monorepo", "archived-org"]
//! concurrency = 4
//! error_threshold = 10
//!
//! [github]
//! api_key = "ghp_..."
//! skip_starred = true
//!
//! [gitlab]
//! api_key = "glpat-..."
//! host = "gitlab.example.com"
//! skip_organisations = true
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repo::Repo;

/// Default public GitLab host, used as the provider identifier when no
/// override is configured.
pub const GITLAB_DEFAULT_HOST: &str = "gitlab.com";

/// Default number of concurrent mirror updates.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub github: Option<GitHubConfig>,
    pub gitlab: Option<GitLabConfig>,
}

/// Settings shared by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct General {
    /// Directory mirrors are placed under (`root/provider/name`).
    pub root: PathBuf,
    /// Full names ("owner/project") or namespaces ("owner") to skip.
    pub blacklist: Vec<String>,
    /// Maximum concurrent mirror updates.
    pub concurrency: usize,
    /// Cancel the run after this many mirror failures (0 = never).
    #[serde(alias = "error-threshold")]
    pub error_threshold: usize,
}

impl Default for General {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            blacklist: Vec::new(),
            concurrency: DEFAULT_CONCURRENCY,
            error_threshold: 0,
        }
    }
}

impl General {
    /// Whether `repo` matches a blacklist entry by full name or namespace.
    #[must_use]
    pub fn is_blacklisted(&self, repo: &Repo) -> bool {
        is_blacklisted(&self.blacklist, repo)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::MissingRoot);
        }
        Ok(())
    }
}

/// Whether `repo` matches an entry by full name or namespace.
#[must_use]
pub fn is_blacklisted(blacklist: &[String], repo: &Repo) -> bool {
    let namespace = repo.namespace();
    blacklist
        .iter()
        .any(|entry| entry == &repo.name || Some(entry.as_str()) == namespace)
}

/// GitHub settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Personal access token.
    #[serde(alias = "api-key")]
    pub api_key: String,
    #[serde(alias = "skip-owned")]
    pub skip_owned: bool,
    #[serde(alias = "skip-starred")]
    pub skip_starred: bool,
    #[serde(alias = "skip-organisations")]
    pub skip_organisations: bool,
    #[serde(alias = "skip-collaborator")]
    pub skip_collaborator: bool,
}

impl GitHubConfig {
    /// Affiliations to request from the repository listing, in a fixed order.
    ///
    /// Empty when every affiliation is skipped, in which case the owned
    /// source is not created at all.
    #[must_use]
    pub fn affiliations(&self) -> Vec<&'static str> {
        let mut affiliations = Vec::with_capacity(3);
        if !self.skip_owned {
            affiliations.push("owner");
        }
        if !self.skip_organisations {
            affiliations.push("organization_member");
        }
        if !self.skip_collaborator {
            affiliations.push("collaborator");
        }
        affiliations
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::MissingGitHubApiKey);
        }
        Ok(())
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("skip_owned", &self.skip_owned)
            .field("skip_starred", &self.skip_starred)
            .field("skip_organisations", &self.skip_organisations)
            .field("skip_collaborator", &self.skip_collaborator)
            .finish()
    }
}

/// GitLab settings.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// Personal access token.
    #[serde(alias = "api-key")]
    pub api_key: String,
    /// Self-hosted instance, e.g. "gitlab.example.com".
    pub host: Option<String>,
    #[serde(alias = "skip-starred")]
    pub skip_starred: bool,
    #[serde(alias = "skip-owned")]
    pub skip_owned: bool,
    #[serde(alias = "skip-organisations")]
    pub skip_organisations: bool,
}

impl GitLabConfig {
    /// Provider identifier attached to every repo from this instance.
    ///
    /// The host override without scheme or trailing slash, else "gitlab.com".
    #[must_use]
    pub fn provider(&self) -> &str {
        let host = self
            .host
            .as_deref()
            .unwrap_or_default()
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        if host.is_empty() {
            GITLAB_DEFAULT_HOST
        } else {
            host
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.trim().is_empty() {
            return Err(ValidationError::MissingGitLabApiKey);
        }
        Ok(())
    }
}

impl fmt::Debug for GitLabConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitLabConfig")
            .field("api_key", &redacted(&self.api_key))
            .field("host", &self.host)
            .field("skip_starred", &self.skip_starred)
            .field("skip_owned", &self.skip_owned)
            .field("skip_organisations", &self.skip_organisations)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

/// A single invalid configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No root provided")]
    MissingRoot,

    #[error("Missing GitHub API key")]
    MissingGitHubApiKey,

    #[error("Missing GitLab API key")]
    MissingGitLabApiKey,
}

/// Every validation failure found in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "No errors occurred"),
            [only] => write!(f, "{only}"),
            [init @ .., last] => {
                write!(f, "{} errors occurred: ", self.0.len())?;
                for (i, err) in init.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{err}")?;
                }
                write!(f, " and {last}")
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors produced while parsing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(ValidationErrors),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl Config {
    /// Validate every present section, collecting all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            Some(self.general.validate()),
            self.github.as_ref().map(GitHubConfig::validate),
            self.gitlab.as_ref().map(GitLabConfig::validate),
        ];

        let errors: Vec<ValidationError> = checks
            .into_iter()
            .flatten()
            .filter_map(Result::err)
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(ValidationErrors(errors)))
        }
    }

    /// Validate and return `self`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Parse a JSON document and validate it.
    pub fn from_json_str(src: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(src).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validated()
    }

    /// The configuration written by `hoard example-config`.
    #[must_use]
    pub fn example() -> Self {
        Self {
            general: General {
                root: PathBuf::from("/srv/mirror"),
                ..General::default()
            },
            github: Some(GitHubConfig {
                api_key: "your API key".to_string(),
                ..GitHubConfig::default()
            }),
            gitlab: Some(GitLabConfig {
                api_key: "your API key".to_string(),
                skip_organisations: true,
                ..GitLabConfig::default()
            }),
        }
    }
}

//! Wire configuration, paginators and the merger into one record stream.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::platform::{PlatformError, Source};
use crate::repo::Repo;

use super::merge::merge;
use super::paginate::paginate;
use super::progress::ProgressCallback;

/// Errors that prevent a fetch from starting.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to create provider client: {0}")]
    Client(#[from] PlatformError),
}

/// Build every source the configuration enables, in provider order.
///
/// Sections for providers compiled out of this build are ignored.
pub fn sources(config: &Config) -> Result<Vec<Source>, SyncError> {
    #[allow(unused_mut)]
    let mut sources = Vec::new();

    #[cfg(feature = "github")]
    if let Some(github) = &config.github {
        sources.extend(crate::github::sources(github)?);
    }

    #[cfg(feature = "gitlab")]
    if let Some(gitlab) = &config.gitlab {
        sources.push(crate::gitlab::source(gitlab)?);
    }

    #[cfg(not(any(feature = "github", feature = "gitlab")))]
    let _ = config;

    Ok(sources)
}

/// Paginate every source concurrently and merge them into one stream.
///
/// The stream closes once every source has stopped. Cancelling `cancel`
/// stops all paginators; already-forwarded records still drain.
pub fn stream_sources(
    sources: Vec<Source>,
    cancel: &CancellationToken,
    on_progress: Option<ProgressCallback>,
) -> mpsc::Receiver<Repo> {
    debug!(sources = sources.len(), "Starting paginators");
    let batches = sources
        .into_iter()
        .map(|source| paginate(source, cancel.clone(), on_progress.clone()))
        .collect();
    merge(batches)
}

/// Validate `config`, then stream every configured provider's repos.
///
/// Invalid configuration fails here, before any request is made.
pub fn fetch_repos(
    config: &Config,
    cancel: &CancellationToken,
    on_progress: Option<ProgressCallback>,
) -> Result<mpsc::Receiver<Repo>, SyncError> {
    config.validate()?;
    let sources = sources(config)?;
    info!(
        sources = ?sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "Fetching repositories"
    );
    Ok(stream_sources(sources, cancel, on_progress))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::{GitHubConfig, GitLabConfig, General};

    fn general() -> General {
        General {
            root: PathBuf::from("/tmp/hoard-test"),
            ..General::default()
        }
    }

    #[test]
    fn test_no_provider_sections_means_no_sources() {
        let config = Config {
            general: general(),
            ..Config::default()
        };
        assert!(sources(&config).expect("sources").is_empty());
    }

    #[cfg(all(feature = "github", feature = "gitlab"))]
    #[test]
    fn test_sources_in_provider_order() {
        let config = Config {
            general: general(),
            github: Some(GitHubConfig {
                api_key: "gh".to_string(),
                ..GitHubConfig::default()
            }),
            gitlab: Some(GitLabConfig {
                api_key: "gl".to_string(),
                host: Some("git.example.com".to_string()),
                ..GitLabConfig::default()
            }),
        };
        let names: Vec<_> = sources(&config)
            .expect("sources")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "github.com/owned",
                "github.com/starred",
                "git.example.com/projects"
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_repos_rejects_missing_credentials() {
        let config = Config {
            general: general(),
            github: Some(GitHubConfig::default()),
            gitlab: Some(GitLabConfig::default()),
        };
        let err = fetch_repos(&config, &CancellationToken::new(), None)
            .expect_err("missing keys should fail");
        match err {
            SyncError::Config(ConfigError::Invalid(errors)) => assert_eq!(errors.0.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_repos_with_nothing_configured_closes() {
        let config = Config {
            general: general(),
            ..Config::default()
        };
        let mut rx = fetch_repos(&config, &CancellationToken::new(), None).expect("valid");
        assert!(rx.recv().await.is_none());
    }

    #[cfg(all(feature = "github", feature = "gitlab"))]
    #[tokio::test]
    async fn test_adapter_records_reach_the_consumer_unchanged() {
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        use crate::http::{MockTransport, mock_response};
        use crate::sync::SyncProgress;

        const GITHUB_PAGE_1: &str = "https://api.github.com/user/starred?per_page=100&page=1";
        const GITHUB_PAGE_2: &str = "https://api.github.com/user/starred?per_page=100&page=2";
        const GITLAB_PAGE_1: &str = "https://git.example.com/api/v4/projects\
            ?starred=true&owned=true&membership=false&per_page=100&page=1";

        let github_transport = MockTransport::new();
        github_transport.push_response(
            GITHUB_PAGE_1,
            mock_response(
                200,
                vec![(
                    "link",
                    r#"<https://api.github.com/user/starred?per_page=100&page=2>; rel="next", <https://api.github.com/user/starred?per_page=100&page=2>; rel="last""#,
                )],
                r#"[
                    {"full_name": "rust-lang/rust", "ssh_url": "git@github.com:rust-lang/rust.git"},
                    {"full_name": "tokio-rs/tokio", "ssh_url": "git@github.com:tokio-rs/tokio.git"}
                ]"#,
            ),
        );
        github_transport.push_response(
            GITHUB_PAGE_2,
            mock_response(
                200,
                vec![(
                    "link",
                    r#"<https://api.github.com/user/starred?per_page=100&page=1>; rel="prev""#,
                )],
                r#"[{"full_name": "serde-rs/serde", "ssh_url": "git@github.com:serde-rs/serde.git"}]"#,
            ),
        );

        let gitlab_transport = MockTransport::new();
        gitlab_transport.push_response(
            GITLAB_PAGE_1,
            mock_response(
                200,
                vec![("x-next-page", ""), ("x-total-pages", "1")],
                r#"[{"path_with_namespace": "infra/deploy", "ssh_url_to_repo": "git@git.example.com:infra/deploy.git"}]"#,
            ),
        );

        let github = GitHubConfig {
            api_key: "gh".to_string(),
            skip_owned: true,
            skip_organisations: true,
            skip_collaborator: true,
            ..GitHubConfig::default()
        };
        let gitlab = GitLabConfig {
            api_key: "gl".to_string(),
            host: Some("https://git.example.com/".to_string()),
            skip_organisations: true,
            ..GitLabConfig::default()
        };

        let mut all = crate::github::sources_with_transport(
            &github,
            Arc::new(github_transport.clone()),
        );
        all.push(crate::gitlab::source_with_transport(
            &gitlab,
            Arc::new(gitlab_transport.clone()),
        ));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |event| sink.lock().unwrap().push(event));

        let mut rx = stream_sources(all, &CancellationToken::new(), Some(callback));
        let mut received = Vec::new();
        while let Some(repo) =
            tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.expect("stream closes")
        {
            received.push(repo);
        }

        let from = |provider: &str| -> Vec<Repo> {
            received.iter().filter(|r| r.provider == provider).cloned().collect()
        };
        assert_eq!(
            from("github.com"),
            vec![
                Repo::new("github.com", "rust-lang/rust", "git@github.com:rust-lang/rust.git"),
                Repo::new("github.com", "tokio-rs/tokio", "git@github.com:tokio-rs/tokio.git"),
                Repo::new("github.com", "serde-rs/serde", "git@github.com:serde-rs/serde.git"),
            ]
        );
        assert_eq!(
            from("git.example.com"),
            vec![Repo::new(
                "git.example.com",
                "infra/deploy",
                "git@git.example.com:infra/deploy.git"
            )]
        );
        assert_eq!(received.len(), 4);

        let urls = |transport: &MockTransport| -> Vec<String> {
            transport.requests().into_iter().map(|r| r.url).collect()
        };
        assert_eq!(urls(&github_transport), vec![GITHUB_PAGE_1, GITHUB_PAGE_2]);
        assert_eq!(urls(&gitlab_transport), vec![GITLAB_PAGE_1]);

        let events = events.lock().unwrap();
        assert!(
            !events.iter().any(|e| matches!(e, SyncProgress::PageError { .. })),
            "no source should stop on an error"
        );
    }
}

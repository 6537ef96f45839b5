//! The GitLab project listing as a page fetcher.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{GITLAB_DEFAULT_HOST, GitLabConfig};
use crate::http::HttpTransport;
use crate::platform::{PAGE_SIZE, Page, PageFetcher, Result, Source};

use super::client::GitLabClient;
use super::convert::to_repo;
use super::types::GitLabProject;

/// Filters passed to `GET /projects`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectFilters {
    pub starred: bool,
    pub owned: bool,
    pub membership: bool,
}

impl ProjectFilters {
    /// Each filter is the negation of its skip flag.
    pub fn from_config(config: &GitLabConfig) -> Self {
        Self {
            starred: !config.skip_starred,
            owned: !config.skip_owned,
            membership: !config.skip_organisations,
        }
    }

    fn route(&self, page: u32) -> String {
        format!(
            "/projects?starred={}&owned={}&membership={}&per_page={PAGE_SIZE}&page={page}",
            self.starred, self.owned, self.membership
        )
    }
}

/// All projects matching a filter set, fetched a page at a time.
pub struct GitLabProjects {
    client: Arc<GitLabClient>,
    provider: String,
    filters: ProjectFilters,
}

impl GitLabProjects {
    pub fn new(
        client: Arc<GitLabClient>,
        provider: impl Into<String>,
        filters: ProjectFilters,
    ) -> Self {
        Self {
            client,
            provider: provider.into(),
            filters,
        }
    }
}

#[async_trait]
impl PageFetcher for GitLabProjects {
    async fn fetch_page(&self, page: u32) -> Result<Page> {
        let route = self.filters.route(page + 1);
        let list = self.client.get_list::<GitLabProject>(&route).await?;
        Ok(Page {
            records: list
                .items
                .into_iter()
                .map(|project| to_repo(&self.provider, project))
                .collect(),
            info: list.info,
            rate: list.rate,
        })
    }
}

/// Build the single source for a GitLab section.
pub fn source(config: &GitLabConfig) -> Result<Source> {
    let client = GitLabClient::new(api_host(config), config.api_key.clone())?;
    Ok(source_with_client(config, Arc::new(client)))
}

/// Build the source over an explicit transport.
pub fn source_with_transport(config: &GitLabConfig, transport: Arc<dyn HttpTransport>) -> Source {
    let client = GitLabClient::with_transport(api_host(config), config.api_key.clone(), transport);
    source_with_client(config, Arc::new(client))
}

/// The configured host as written, so an explicit `http://` survives.
fn api_host(config: &GitLabConfig) -> &str {
    match config.host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => host,
        _ => GITLAB_DEFAULT_HOST,
    }
}

fn source_with_client(config: &GitLabConfig, client: Arc<GitLabClient>) -> Source {
    let provider = config.provider().to_string();
    Source::new(
        format!("{provider}/projects"),
        GitLabProjects::new(client, provider, ProjectFilters::from_config(config)),
    )
}

//! GitHub list endpoints as page fetchers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::GitHubConfig;
use crate::http::HttpTransport;
use crate::platform::{PAGE_SIZE, Page, PageFetcher, Result, Source};

use super::GITHUB_PROVIDER;
use super::client::GitHubClient;
use super::convert::to_repo;
use super::types::GitHubRepository;

/// Which listing of the authenticated user to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubListing {
    /// `/user/repos` restricted to a comma-separated affiliation set.
    Owned { affiliations: String },
    /// `/user/starred`.
    Starred,
}

impl GitHubListing {
    /// Route for the one-based GitHub page number `page`.
    fn route(&self, page: u32) -> String {
        match self {
            Self::Owned { affiliations } => format!(
                "/user/repos?affiliation={affiliations}&per_page={PAGE_SIZE}&page={page}"
            ),
            Self::Starred => format!("/user/starred?per_page={PAGE_SIZE}&page={page}"),
        }
    }

    /// Source label used in progress events.
    pub fn label(&self) -> String {
        match self {
            Self::Owned { .. } => format!("{GITHUB_PROVIDER}/owned"),
            Self::Starred => format!("{GITHUB_PROVIDER}/starred"),
        }
    }
}

/// One GitHub listing, fetched a page at a time.
pub struct GitHubRepos {
    client: Arc<GitHubClient>,
    listing: GitHubListing,
}

impl GitHubRepos {
    pub fn new(client: Arc<GitHubClient>, listing: GitHubListing) -> Self {
        Self { client, listing }
    }
}

#[async_trait]
impl PageFetcher for GitHubRepos {
    async fn fetch_page(&self, page: u32) -> Result<Page> {
        let route = self.listing.route(page + 1);
        let list = self.client.get_list::<GitHubRepository>(&route).await?;
        Ok(Page {
            records: list.items.into_iter().map(to_repo).collect(),
            info: list.info,
            rate: list.rate,
        })
    }
}

/// Build the sources a GitHub section enables.
pub fn sources(config: &GitHubConfig) -> Result<Vec<Source>> {
    let client = GitHubClient::new(config.api_key.clone())?;
    Ok(sources_with_client(config, Arc::new(client)))
}

/// Build the sources over an explicit transport.
pub fn sources_with_transport(
    config: &GitHubConfig,
    transport: Arc<dyn HttpTransport>,
) -> Vec<Source> {
    let client = GitHubClient::with_transport(config.api_key.clone(), transport);
    sources_with_client(config, Arc::new(client))
}

fn sources_with_client(config: &GitHubConfig, client: Arc<GitHubClient>) -> Vec<Source> {
    let mut listings = Vec::with_capacity(2);

    let affiliations = config.affiliations();
    if !affiliations.is_empty() {
        listings.push(GitHubListing::Owned {
            affiliations: affiliations.join(","),
        });
    }
    if !config.skip_starred {
        listings.push(GitHubListing::Starred);
    }

    listings
        .into_iter()
        .map(|listing| {
            let label = listing.label();
            Source::new(label, GitHubRepos::new(Arc::clone(&client), listing))
        })
        .collect()
}

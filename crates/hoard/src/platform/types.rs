use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::repo::Repo;

use super::errors::Result;

/// Number of items requested per page from every provider.
pub const PAGE_SIZE: u32 = 100;

/// Rate limit snapshot reported alongside a page.
///
/// Diagnostic only: the paginator logs it and never branches on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateInfo {
    /// Maximum requests allowed per period.
    pub limit: usize,
    /// Remaining requests in current period.
    pub remaining: usize,
    /// When the rate limit resets.
    pub reset_at: DateTime<Utc>,
}

/// Pagination cursor metadata, in the zero-based page index space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Index of the next page, if the provider advertised one.
    pub next_page: Option<u32>,
    /// Index of the final page, if the provider reported a total.
    pub last_page: Option<u32>,
}

impl PageInfo {
    /// Whether `page` is the final page of the listing.
    ///
    /// A known last page wins; without one, the listing ends when the
    /// provider stops advertising a next page.
    #[must_use]
    pub fn is_last(&self, page: u32) -> bool {
        match self.last_page {
            Some(last) => page >= last,
            None => self.next_page.is_none_or(|next| next <= page),
        }
    }
}

/// One page of normalized records.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in the order the provider returned them.
    pub records: Vec<Repo>,
    pub info: PageInfo,
    pub rate: Option<RateInfo>,
}

/// A single paginated list endpoint.
///
/// Implementations perform exactly one network call per invocation and
/// return failures as-is. Cancellation happens by dropping the returned
/// future, so implementations must not rely on running to completion.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page at zero-based index `page`.
    async fn fetch_page(&self, page: u32) -> Result<Page>;
}

/// A named logical source: one paginated enumeration within a provider.
pub struct Source {
    /// Label used in progress events (e.g. "github.com/starred").
    pub name: String,
    pub fetcher: Box<dyn PageFetcher>,
}

impl Source {
    pub fn new(name: impl Into<String>, fetcher: impl PageFetcher + 'static) -> Self {
        Self {
            name: name.into(),
            fetcher: Box::new(fetcher),
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("name", &self.name).finish()
    }
}

//! GitHub REST client and response header parsing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::http::{HttpRequest, HttpResponse, HttpTransport, reqwest_transport::ReqwestTransport};
use crate::platform::{PageInfo, PlatformError, RateInfo, Result};

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pagination information extracted from GitHub's Link header.
///
/// Page numbers here are GitHub's own (one-based).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkPagination {
    /// The last page number (from rel="last" link).
    pub last_page: Option<u32>,
    /// The next page number (from rel="next" link).
    pub next_page: Option<u32>,
}

impl LinkPagination {
    /// Convert to zero-based page indices.
    pub fn to_page_info(self) -> PageInfo {
        PageInfo {
            next_page: self.next_page.and_then(|p| p.checked_sub(1)),
            last_page: self.last_page.and_then(|p| p.checked_sub(1)),
        }
    }
}

/// Parse the Link header to extract pagination info.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/user/repos?per_page=100&page=2>; rel="next", <...&page=3>; rel="last"`
pub fn parse_link_header(link_header: &str) -> LinkPagination {
    let mut info = LinkPagination::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.trim().split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        let (Some(url), Some(rel)) = (url, rel) else {
            continue;
        };
        let Some(page) = extract_page_from_url(url) else {
            continue;
        };
        match rel {
            "last" => info.last_page = Some(page),
            "next" => info.next_page = Some(page),
            _ => {}
        }
    }

    info
}

/// Extract the `page` query parameter from a URL.
fn extract_page_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("page="))
        .and_then(|value| value.parse().ok())
}

/// Extract rate limit info from GitHub response headers.
pub fn parse_rate_limit_headers(response: &HttpResponse) -> Option<RateInfo> {
    let limit = response.header("x-ratelimit-limit")?.parse().ok()?;
    let remaining = response.header("x-ratelimit-remaining")?.parse().ok()?;
    let reset_epoch: i64 = response.header("x-ratelimit-reset")?.parse().ok()?;
    let reset_at = DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now);
    Some(RateInfo {
        limit,
        remaining,
        reset_at,
    })
}

/// A decoded list response plus its pagination and rate metadata.
#[derive(Debug)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
    pub rate: Option<RateInfo>,
}

/// Thin authenticated client over the REST API.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: String,
    base_url: String,
}

impl GitHubClient {
    /// Create a client for api.github.com using the default transport.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)?;
        Ok(Self::with_transport(token, Arc::new(transport)))
    }

    /// Create a client over an explicit transport.
    pub fn with_transport(token: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: token.into(),
            base_url: GITHUB_API_URL.to_string(),
        }
    }

    /// Override the API root (GitHub Enterprise, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET one page of a list endpoint.
    ///
    /// `route` is the path plus query string, e.g. `/user/starred?per_page=100&page=1`.
    pub async fn get_list<T: DeserializeOwned>(&self, route: &str) -> Result<ListResponse<T>> {
        let url = format!("{}{}", self.base_url, route);
        let request = HttpRequest::get(url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "hoard")
            .header("Authorization", format!("Bearer {}", self.token));

        let response = self.transport.send(request).await?;
        let rate = parse_rate_limit_headers(&response);

        if !response.is_success() {
            return Err(status_error(&response, rate.as_ref()));
        }

        let info = response
            .header("link")
            .map(|h| parse_link_header(h).to_page_info())
            .unwrap_or_default();
        let items: Vec<T> = serde_json::from_slice(&response.body)?;

        Ok(ListResponse { items, info, rate })
    }
}

/// Map a non-success response to a platform error.
fn status_error(response: &HttpResponse, rate: Option<&RateInfo>) -> PlatformError {
    match response.status {
        401 | 403 | 429 if rate.is_some_and(|r| r.remaining == 0) => PlatformError::RateLimited {
            reset_at: rate.map_or_else(Utc::now, |r| r.reset_at),
        },
        401 | 403 => PlatformError::AuthRequired,
        status => PlatformError::api(status, error_message(response)),
    }
}

/// GitHub error bodies are `{"message": "..."}`; fall back to the raw body.
fn error_message(response: &HttpResponse) -> String {
    serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| response.body_text())
}

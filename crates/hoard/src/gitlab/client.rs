//! GitLab REST client and response header parsing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::http::{HttpRequest, HttpResponse, HttpTransport, reqwest_transport::ReqwestTransport};
use crate::platform::{PageInfo, PlatformError, RateInfo, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalize a host override into an API base URL.
///
/// Adds `https://` when no scheme is given and trims trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// Parse GitLab's `x-next-page` / `x-total-pages` headers.
///
/// Both are one-based on the wire. `x-next-page` is empty on the last page;
/// `x-total-pages` is omitted for very large collections.
pub fn parse_pagination_headers(response: &HttpResponse) -> PageInfo {
    let page_header = |name: &str| {
        response
            .header(name)
            .and_then(|v| v.trim().parse::<u32>().ok())
    };
    PageInfo {
        next_page: page_header("x-next-page").and_then(|p| p.checked_sub(1)),
        last_page: page_header("x-total-pages").and_then(|p| p.checked_sub(1)),
    }
}

/// Extract rate limit info from GitLab's `ratelimit-*` headers.
pub fn parse_rate_limit_headers(response: &HttpResponse) -> Option<RateInfo> {
    let limit = response.header("ratelimit-limit")?.parse().ok()?;
    let remaining = response.header("ratelimit-remaining")?.parse().ok()?;
    let reset_epoch: i64 = response.header("ratelimit-reset")?.parse().ok()?;
    Some(RateInfo {
        limit,
        remaining,
        reset_at: DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now),
    })
}

/// A decoded list response plus its pagination and rate metadata.
#[derive(Debug)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub info: PageInfo,
    pub rate: Option<RateInfo>,
}

/// Thin authenticated client over the v4 REST API.
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    token: String,
    host: String,
}

impl GitLabClient {
    /// Create a client for `host` (e.g. "gitlab.com" or "https://gitlab.example.com").
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)?;
        Ok(Self::with_transport(host, token, Arc::new(transport)))
    }

    /// Create a client over an explicit transport.
    pub fn with_transport(
        host: &str,
        token: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            transport,
            token: token.into(),
            host: normalize_host(host),
        }
    }

    /// Base URL, including scheme.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// GET one page of a list endpoint under `/api/v4`.
    pub async fn get_list<T: DeserializeOwned>(&self, route: &str) -> Result<ListResponse<T>> {
        let url = format!("{}/api/v4{}", self.host, route);
        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .header("User-Agent", "hoard")
            .header("Authorization", format!("Bearer {}", self.token));

        let response = self.transport.send(request).await?;
        let rate = parse_rate_limit_headers(&response);

        if !response.is_success() {
            return Err(status_error(&response, rate.as_ref()));
        }

        let items: Vec<T> = serde_json::from_slice(&response.body)?;
        Ok(ListResponse {
            items,
            info: parse_pagination_headers(&response),
            rate,
        })
    }
}

fn status_error(response: &HttpResponse, rate: Option<&RateInfo>) -> PlatformError {
    match response.status {
        429 => PlatformError::RateLimited {
            reset_at: rate.map_or_else(Utc::now, |r| r.reset_at),
        },
        401 | 403 => PlatformError::AuthRequired,
        status => PlatformError::api(status, error_message(response)),
    }
}

/// GitLab error bodies carry `message` or `error`; fall back to the raw body.
fn error_message(response: &HttpResponse) -> String {
    let json = serde_json::from_slice::<serde_json::Value>(&response.body).ok();
    json.as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .map(|m| match m.as_str() {
            Some(s) => s.to_string(),
            None => m.to_string(),
        })
        .unwrap_or_else(|| response.body_text())
}

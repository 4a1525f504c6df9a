//! Outbound feed fetch over reqwest.
//!
//! One GET per call, no retries. Non-2xx statuses are returned as-is; the
//! caller decides what they mean.

use std::time::Duration;

use crate::types::ProxyResult;

/// Client-side timeout for the whole request, body included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// User-agent sent with every fetch.
pub const USER_AGENT: &str = concat!("feed-filter-proxy/", env!("CARGO_PKG_VERSION"));

/// Status and body of an upstream response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// True for statuses in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for upstream feeds.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher with the standard timeout.
    pub fn new() -> ProxyResult<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> ProxyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// GET `url` and read the full body.
    ///
    /// Connection failures, timeouts, malformed URLs and unreadable bodies
    /// are errors; any received status is a success.
    pub async fn fetch(&self, url: &str) -> ProxyResult<FetchResponse> {
        tracing::debug!("Fetching feed from {url}");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!("Fetched {} bytes from {url} (status {status})", body.len());

        Ok(FetchResponse {
            status,
            body: body.to_vec(),
        })
    }
}

//! Fetch, filter and re-serialize a feed.

use std::path::PathBuf;

use feed_filter::{filter, Document, FilterConfig};

use crate::config::RequestConfig;
use crate::fetch::Fetcher;
use crate::types::{ProxyError, ProxyResult};

/// A filtered feed ready to send.
#[derive(Debug, Clone)]
pub struct FilteredFeed {
    pub body: Vec<u8>,
    pub removed: usize,
}

/// Where a one-shot `filter` run reads its feed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    File(PathBuf),
}

impl FeedSource {
    /// `http://` and `https://` are URLs; anything else is a path.
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            FeedSource::Url(source.to_string())
        } else {
            FeedSource::File(PathBuf::from(source))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FeedSource::Url(url) => url.clone(),
            FeedSource::File(path) => path.display().to_string(),
        }
    }
}

/// Run one fetch → parse → filter → serialize cycle for a request.
///
/// Each failure is logged once here with the feed URL.
pub async fn filter_feed(fetcher: &Fetcher, config: &RequestConfig) -> ProxyResult<FilteredFeed> {
    let url = config.feed_url.as_str();

    let response = match fetcher.fetch(url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("fetch error url={url}: {e}");
            return Err(e);
        }
    };

    if !response.is_success() {
        tracing::warn!("fetch non-2xx url={url} status={}", response.status);
        return Err(ProxyError::UpstreamStatus(response.status));
    }

    let feed = filter_logged(&response.body, &config.filter, url)?;
    tracing::info!("Served {url} with {} items removed", feed.removed);
    Ok(feed)
}

/// Filter a feed read from a URL or a local file.
pub async fn filter_source(
    fetcher: &Fetcher,
    source: &FeedSource,
    filter_config: &FilterConfig,
) -> ProxyResult<FilteredFeed> {
    match source {
        FeedSource::Url(url) => {
            let config = RequestConfig {
                feed_url: url.clone(),
                filter: filter_config.clone(),
            };
            filter_feed(fetcher, &config).await
        }
        FeedSource::File(path) => {
            let xml = tokio::fs::read(path).await?;
            filter_logged(&xml, filter_config, &source.describe())
        }
    }
}

/// Parse, filter and serialize raw feed bytes.
pub fn filter_bytes(xml: &[u8], filter_config: &FilterConfig) -> ProxyResult<FilteredFeed> {
    let mut doc = Document::parse(xml).map_err(ProxyError::Parse)?;
    let removed = filter(&mut doc, filter_config);
    let body = doc.to_bytes().map_err(ProxyError::Serialize)?;
    Ok(FilteredFeed { body, removed })
}

fn filter_logged(
    xml: &[u8],
    filter_config: &FilterConfig,
    origin: &str,
) -> ProxyResult<FilteredFeed> {
    filter_bytes(xml, filter_config).map_err(|e| {
        match &e {
            ProxyError::Serialize(cause) => {
                tracing::error!("xml serialize error url={origin}: {cause}")
            }
            ProxyError::Parse(cause) => tracing::warn!("xml parse error url={origin}: {cause}"),
            other => tracing::warn!("feed error url={origin}: {other}"),
        }
        e
    })
}

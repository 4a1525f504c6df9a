//! Request handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue},
    response::{Html, IntoResponse, Json, Response},
};
use quick_xml::escape::escape;

use crate::config::{resolve_request_config, FeedQuery};
use crate::pipeline::{filter_feed, FilteredFeed};
use crate::types::ProxyResult;

use super::AppState;

/// Header carrying the number of removed items.
pub const REMOVED_ITEMS_HEADER: &str = "x-removed-items";

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Informational page showing the config this request would use.
pub async fn handle_root(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Html<String> {
    let config = resolve_request_config(&FeedQuery::from_pairs(&pairs), state.env.as_ref());
    let feed_url = escape(config.feed_url.as_str());

    let mut page = String::from("<h1>RSS Feed Proxy</h1>\n");
    page.push_str("<p>Use <code>/proxy/feed</code> to get a filtered RSS feed.</p>\n");
    page.push_str(&format!(
        "<p>Example: <a href=\"/proxy/feed?url={feed_url}\">/proxy/feed?url={feed_url}</a></p>\n"
    ));
    page.push_str(&format!(
        "<p>Blocked creators: <strong>{}</strong></p>\n",
        escape(config.filter.blocked_creators.join(", ").as_str())
    ));
    if !config.filter.blocked_categories.is_empty() {
        page.push_str(&format!(
            "<p>Blocked categories: <strong>{}</strong></p>\n",
            escape(config.filter.blocked_categories.join(", ").as_str())
        ));
    }

    Html(page)
}

/// Fetch, filter and return the feed.
pub async fn handle_proxy_feed(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProxyResult<FilteredFeed> {
    let config = resolve_request_config(&FeedQuery::from_pairs(&pairs), state.env.as_ref());
    filter_feed(&state.fetcher, &config).await
}

/// Health check endpoint.
pub async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

impl IntoResponse for FilteredFeed {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(RSS_CONTENT_TYPE)),
                (
                    HeaderName::from_static(REMOVED_ITEMS_HEADER),
                    HeaderValue::from(self.removed),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

//! Integration tests for the proxy routes against a mock upstream.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feed_filter_proxy::fetch::{Fetcher, USER_AGENT};
use feed_filter_proxy::pipeline::{filter_source, FeedSource};
use feed_filter_proxy::server::{router, AppState};
use feed_filter_proxy::types::messages;
use feed_filter::FilterConfig;

// ─────────────────────── helpers ───────────────────────

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <item>
      <title>Keep me</title>
      <dc:creator>Jason Weisberger</dc:creator>
      <category>Post</category>
    </item>
    <item>
      <title>Shop item</title>
      <dc:creator>Boing Boing's Shop</dc:creator>
      <category>Post</category>
    </item>
    <item>
      <title>Deal item</title>
      <dc:creator>Rob Beschizza</dc:creator>
      <category>BoingBoing Shop</category>
    </item>
  </channel>
</rss>"#;

/// Build the router with a fixed environment.
fn app(env: &[(&str, &str)]) -> Router {
    let env: HashMap<String, String> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let state = AppState::new(Fetcher::new().unwrap(), Arc::new(env));
    router(Arc::new(state))
}

/// Send a GET and return status, selected headers and body text.
async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Start a mock upstream serving `body` with `status` at /feed.
async fn upstream(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn removed_items(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get("x-removed-items")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// ═══════════════════════════════════════════════════════
// /proxy/feed
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_default_creator_blocklist_applies() {
    let server = upstream(200, FEED).await;
    let uri = format!("/proxy/feed?url={}/feed", server.uri());

    let (status, headers, body) = get(app(&[]), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/rss+xml; charset=utf-8"
    );
    assert_eq!(removed_items(&headers), "1");
    assert!(body.contains("Keep me"));
    assert!(!body.contains("Shop item"));
    assert!(body.contains("Deal item"));
}

#[tokio::test]
async fn test_query_blocklists_override_env() {
    let server = upstream(200, FEED).await;
    let uri = format!(
        "/proxy/feed?url={}/feed&blocked_creators=Jason%20Weisberger&blocked_categories=BoingBoing%20Shop",
        server.uri()
    );

    let (status, headers, body) = get(app(&[("BLOCKED_CREATORS", "Nobody")]), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed_items(&headers), "2");
    assert!(!body.contains("Keep me"));
    assert!(body.contains("Shop item"));
    assert!(!body.contains("Deal item"));
}

#[tokio::test]
async fn test_env_supplies_feed_url_and_categories() {
    let server = upstream(200, FEED).await;
    let feed_url = format!("{}/feed", server.uri());
    let env = [
        ("FEED_URL_DEFAULT", feed_url.as_str()),
        ("BLOCKED_CREATORS", "Nobody"),
        ("BLOCKED_CATEGORIES", "BoingBoing Shop"),
    ];

    let (status, headers, body) = get(app(&env), "/proxy/feed?url=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed_items(&headers), "1");
    assert!(body.contains("Shop item"));
    assert!(!body.contains("Deal item"));
}

#[tokio::test]
async fn test_nothing_blocked_reports_zero() {
    let server = upstream(200, FEED).await;
    let uri = format!("/proxy/feed?url={}/feed", server.uri());

    let (status, headers, body) = get(app(&[("BLOCKED_CREATORS", "Nobody")]), &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed_items(&headers), "0");
    for title in ["Keep me", "Shop item", "Deal item"] {
        assert!(body.contains(title));
    }
    assert!(body.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
}

#[tokio::test]
async fn test_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .expect(1)
        .mount(&server)
        .await;
    let uri = format!("/proxy/feed?url={}/feed", server.uri());

    let (status, _, _) = get(app(&[]), &uri).await;

    assert_eq!(status, StatusCode::OK);
}

// ═══════════════════════════════════════════════════════
// Failure mapping
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_upstream_404_is_bad_gateway() {
    // body would not parse; the status check must short-circuit first
    let server = upstream(404, "<html>not found").await;
    let uri = format!("/proxy/feed?url={}/feed", server.uri());

    let (status, headers, body) = get(app(&[]), &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, messages::UPSTREAM_STATUS);
    assert!(headers.get("x-removed-items").is_none());
}

#[tokio::test]
async fn test_malformed_xml_is_bad_gateway() {
    let server = upstream(200, "<rss><channel></rss>").await;
    let uri = format!("/proxy/feed?url={}/feed", server.uri());

    let (status, _, body) = get(app(&[]), &uri).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, messages::PARSE_FAILED);
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // nothing listens on port 1
    let (status, _, body) = get(app(&[]), "/proxy/feed?url=http://127.0.0.1:1/feed").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, messages::FETCH_FAILED);
}

#[tokio::test]
async fn test_malformed_url_is_bad_gateway() {
    let (status, _, body) = get(app(&[]), "/proxy/feed?url=not-a-url").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, messages::FETCH_FAILED);
}

// ═══════════════════════════════════════════════════════
// Info page and health
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_root_page_shows_defaults() {
    let (status, headers, body) = get(app(&[]), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body.contains("<h1>RSS Feed Proxy</h1>"));
    assert!(body.contains("/proxy/feed?url=https://boingboing.net/feed"));
    assert!(body.contains("Blocked creators: <strong>Boing Boing"));
    assert!(!body.contains("Blocked categories"));
}

#[tokio::test]
async fn test_root_page_lists_categories_and_escapes() {
    let env = [("BLOCKED_CATEGORIES", "Ads, <script>")];

    let (_, _, body) = get(app(&env), "/").await;

    assert!(body.contains("Blocked categories: <strong>Ads, &lt;script&gt;</strong>"));
}

#[tokio::test]
async fn test_unknown_path_serves_root_page() {
    let (status, _, body) = get(app(&[]), "/some/other/path").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("RSS Feed Proxy"));
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = get(app(&[]), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// ═══════════════════════════════════════════════════════
// One-shot filter sources
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_filter_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("feed.xml");
    std::fs::write(&file, FEED).unwrap();
    let source = FeedSource::parse(file.to_str().unwrap());

    let config = FilterConfig::categories(["BoingBoing Shop"]);
    let feed = filter_source(&Fetcher::new().unwrap(), &source, &config)
        .await
        .unwrap();

    assert_eq!(feed.removed, 1);
    let body = String::from_utf8(feed.body).unwrap();
    assert!(!body.contains("Deal item"));
}

#[tokio::test]
async fn test_filter_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = FeedSource::File(dir.path().join("missing.xml"));

    let result = filter_source(&Fetcher::new().unwrap(), &source, &FilterConfig::default()).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_filter_url_source() {
    let server = upstream(200, FEED).await;
    let source = FeedSource::parse(&format!("{}/feed", server.uri()));

    let config = FilterConfig::creators(["Boing Boing's Shop"]);
    let feed = filter_source(&Fetcher::new().unwrap(), &source, &config)
        .await
        .unwrap();

    assert_eq!(feed.removed, 1);
}

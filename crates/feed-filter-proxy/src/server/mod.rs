//! HTTP server — feed proxy routes, info page and /health.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::config::EnvSource;
use crate::fetch::Fetcher;
use crate::types::{ProxyError, ProxyResult};

/// Shared server state passed to all handlers via axum State.
pub struct AppState {
    pub fetcher: Fetcher,
    pub env: Arc<dyn EnvSource>,
}

impl AppState {
    pub fn new(fetcher: Fetcher, env: Arc<dyn EnvSource>) -> Self {
        Self { fetcher, env }
    }
}

/// Build the router. Any unmatched path serves the info page.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/proxy/feed", get(handlers::handle_proxy_feed))
        .route("/health", get(handlers::handle_health))
        .fallback(handlers::handle_root)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The feed proxy HTTP server.
pub struct ProxyServer {
    state: Arc<AppState>,
}

impl ProxyServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> ProxyResult<()> {
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ProxyError::Io)?;

        tracing::info!("rss proxy listening on {addr}");

        axum::serve(listener, app)
            .await
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        Ok(())
    }
}

//! Error types and HTTP status mapping for the proxy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use feed_filter::FeedError;

/// Short public messages. Details go to the log only.
pub mod messages {
    pub const FETCH_FAILED: &str = "Error fetching RSS feed";
    pub const UPSTREAM_STATUS: &str = "Upstream returned non-2xx";
    pub const PARSE_FAILED: &str = "Error parsing RSS feed XML";
    pub const SERIALIZE_FAILED: &str = "Error serializing RSS feed XML";
    pub const INTERNAL: &str = "Internal server error";
}

/// All errors that can occur in the proxy.
#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("Parse error: {0}")]
    Parse(FeedError),

    #[error("Serialize error: {0}")]
    Serialize(FeedError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// HTTP status returned to the feed consumer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Fetch(_) | ProxyError::UpstreamStatus(_) | ProxyError::Parse(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Serialize(_)
            | ProxyError::Config(_)
            | ProxyError::Transport(_)
            | ProxyError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed message for the response body.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::Fetch(_) => messages::FETCH_FAILED,
            ProxyError::UpstreamStatus(_) => messages::UPSTREAM_STATUS,
            ProxyError::Parse(_) => messages::PARSE_FAILED,
            ProxyError::Serialize(_) => messages::SERIALIZE_FAILED,
            ProxyError::Config(_) | ProxyError::Transport(_) | ProxyError::Io(_) => {
                messages::INTERNAL
            }
        }
    }
}

impl From<FeedError> for ProxyError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Parse { .. } => ProxyError::Parse(e),
            FeedError::Serialize(_) => ProxyError::Serialize(e),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), self.public_message()).into_response()
    }
}

pub type ProxyResult<T> = Result<T, ProxyError>;

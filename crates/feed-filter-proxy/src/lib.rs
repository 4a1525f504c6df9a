//! feed-filter proxy — fetches an RSS feed, drops blocklisted items and
//! re-serves it over HTTP.

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod server;
pub mod types;

pub use config::{resolve_request_config, EnvSource, FeedQuery, ProcessEnv, RequestConfig};
pub use fetch::Fetcher;
pub use pipeline::{filter_feed, FeedSource, FilteredFeed};
pub use server::{router, AppState, ProxyServer};

//! Configuration loading and resolution.
//!
//! Every value resolves query parameter first, then environment, then a
//! fixed fallback. The environment is read through [`EnvSource`] so the
//! resolvers stay pure.

use std::collections::HashMap;

use feed_filter::FilterConfig;
use serde::Serialize;

use crate::types::{ProxyError, ProxyResult};

/// Feed served when neither the request nor the environment names one.
pub const FALLBACK_FEED_URL: &str = "https://boingboing.net/feed";

/// Creator blocklist used when neither the request nor the environment
/// sets one. Categories have no fallback.
pub const FALLBACK_BLOCKED_CREATORS: &str = "Boing Boing's Shop";

pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable names.
pub mod env_keys {
    pub const PORT: &str = "PORT";
    pub const FEED_URL_DEFAULT: &str = "FEED_URL_DEFAULT";
    pub const BLOCKED_CREATORS: &str = "BLOCKED_CREATORS";
    pub const BLOCKED_CATEGORIES: &str = "BLOCKED_CATEGORIES";
}

/// Query parameter names.
pub mod query_keys {
    pub const URL: &str = "url";
    pub const BLOCKED_CREATORS: &str = "blocked_creators";
    pub const BLOCKED_CATEGORIES: &str = "blocked_categories";
}

/// Read-only access to environment variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Filter-related query parameters of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    pub url: Option<String>,
    pub blocked_creators: Option<String>,
    pub blocked_categories: Option<String>,
}

impl FeedQuery {
    /// Build from decoded query pairs. The first occurrence of a key wins.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        Self {
            url: first(query_keys::URL),
            blocked_creators: first(query_keys::BLOCKED_CREATORS),
            blocked_categories: first(query_keys::BLOCKED_CATEGORIES),
        }
    }
}

/// Everything one proxy request needs: where to fetch and what to drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestConfig {
    pub feed_url: String,
    pub filter: FilterConfig,
}

/// Resolve the feed URL and blocklists for one request.
pub fn resolve_request_config(query: &FeedQuery, env: &dyn EnvSource) -> RequestConfig {
    let feed_url = resolve_feed_url(query.url.as_deref(), env);

    let blocked_creators = query_or_env_list(
        query.blocked_creators.as_deref(),
        env,
        env_keys::BLOCKED_CREATORS,
        FALLBACK_BLOCKED_CREATORS,
    );
    let blocked_categories = query_or_env_list(
        query.blocked_categories.as_deref(),
        env,
        env_keys::BLOCKED_CATEGORIES,
        "",
    );

    RequestConfig {
        feed_url,
        filter: FilterConfig::new(blocked_creators, blocked_categories),
    }
}

/// Feed URL: query value as given, else the trimmed environment default,
/// else [`FALLBACK_FEED_URL`].
pub fn resolve_feed_url(explicit: Option<&str>, env: &dyn EnvSource) -> String {
    if let Some(url) = explicit.filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    if let Some(url) = non_blank_var(env, env_keys::FEED_URL_DEFAULT) {
        return url;
    }

    FALLBACK_FEED_URL.to_string()
}

/// Listen port: explicit value, else `PORT`, else [`DEFAULT_PORT`].
pub fn resolve_port(explicit: Option<u16>, env: &dyn EnvSource) -> ProxyResult<u16> {
    if let Some(port) = explicit {
        return Ok(port);
    }

    match non_blank_var(env, env_keys::PORT) {
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|e| ProxyError::Config(format!("invalid {}={raw:?}: {e}", env_keys::PORT))),
        None => Ok(DEFAULT_PORT),
    }
}

fn query_or_env_list(
    query_value: Option<&str>,
    env: &dyn EnvSource,
    env_key: &str,
    fallback: &str,
) -> Vec<String> {
    if let Some(raw) = query_value.map(str::trim).filter(|v| !v.is_empty()) {
        return split_csv(raw);
    }
    if let Some(raw) = non_blank_var(env, env_key) {
        return split_csv(&raw);
    }
    split_csv(fallback)
}

fn non_blank_var(env: &dyn EnvSource, key: &str) -> Option<String> {
    env.var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

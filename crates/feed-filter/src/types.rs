//! Core data types for blocklist filtering.

use serde::{Deserialize, Serialize};

/// Blocklists applied to a feed's items.
///
/// Both lists may be empty; an empty config removes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub blocked_creators: Vec<String>,
    #[serde(default)]
    pub blocked_categories: Vec<String>,
}

impl FilterConfig {
    /// Create a config from creator and category blocklists.
    pub fn new(blocked_creators: Vec<String>, blocked_categories: Vec<String>) -> Self {
        Self {
            blocked_creators,
            blocked_categories,
        }
    }

    /// Config blocking only the given creators.
    pub fn creators<I, S>(creators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_creators: creators.into_iter().map(Into::into).collect(),
            blocked_categories: Vec::new(),
        }
    }

    /// Config blocking only the given categories.
    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_creators: Vec::new(),
            blocked_categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// True when neither blocklist has an entry.
    pub fn is_empty(&self) -> bool {
        self.blocked_creators.is_empty() && self.blocked_categories.is_empty()
    }

    /// Exact match against the creator blocklist.
    pub fn blocks_creator(&self, creator: &str) -> bool {
        self.blocked_creators.iter().any(|b| b == creator)
    }

    /// Exact match against the category blocklist.
    pub fn blocks_category(&self, category: &str) -> bool {
        self.blocked_categories.iter().any(|b| b == category)
    }
}

/// Errors that can occur while reading or writing a feed document.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("XML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("XML serialize error: {0}")]
    Serialize(String),
}

impl FeedError {
    pub(crate) fn parse(position: u64, message: impl Into<String>) -> Self {
        FeedError::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Convenience result type.
pub type FeedResult<T> = Result<T, FeedError>;

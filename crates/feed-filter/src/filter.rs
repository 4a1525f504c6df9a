//! Blocklist filtering over a parsed feed document.

use crate::document::{Document, NodeId};
use crate::types::FilterConfig;

/// Selector for feed entries.
pub const ITEM: &str = "item";

/// Selector for an entry's author.
pub const CREATOR: &str = "dc:creator";

/// Selector for an entry's category labels.
pub const CATEGORY: &str = "category";

/// Remove every item matching the blocklists and return how many were
/// removed.
///
/// Items are collected once up front, so detaching one never disturbs the
/// walk over the rest. Removal is by node handle.
pub fn filter(doc: &mut Document, config: &FilterConfig) -> usize {
    if config.is_empty() {
        return 0;
    }

    let items = doc.descendants_named(doc.root(), ITEM);
    let total = items.len();
    let mut removed = 0;

    for item in items {
        if !should_remove_item(doc, item, config) {
            continue;
        }
        if doc.detach(item) {
            removed += 1;
        }
    }

    tracing::debug!("Filtered feed: {removed} of {total} items removed");
    removed
}

/// True when the item's creator or any of its categories is blocked.
pub fn should_remove_item(doc: &Document, item: NodeId, config: &FilterConfig) -> bool {
    if !config.blocked_creators.is_empty() {
        if let Some(creator) = doc.child_named(item, CREATOR) {
            if config.blocks_creator(doc.text(creator).trim()) {
                return true;
            }
        }
    }

    if !config.blocked_categories.is_empty() {
        let blocked = doc
            .children_named(item, CATEGORY)
            .any(|category| config.blocks_category(doc.text(category).trim()));
        if blocked {
            return true;
        }
    }

    false
}

//! feed-filter — mutable RSS/XML document tree and blocklist item filtering.

pub mod document;
pub mod filter;
pub mod types;

pub use document::{Declaration, Document, Element, NodeId, NodeKind};
pub use filter::{filter, should_remove_item};
pub use types::*;

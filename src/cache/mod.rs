//! Updating cached list data after local changes.
//!
//! When a post is liked, edited or deleted, the lists already on screen are
//! patched in place instead of refetched. The helpers in [`pages`] work on
//! any page-shaped data; [`InfiniteQueryCache`] is one store that holds it.

pub mod pages;
mod query;

pub use pages::{
    InfiniteData, remove_infinite_item_by_id, remove_item_by_id, update_all_infinite_items,
    update_infinite_item_by_id, update_item_by_id, upsert_infinite_item, upsert_item,
};
pub use query::InfiniteQueryCache;

/// Items with a server-assigned identity
///
/// IDs are compared as strings, so numeric and string IDs from different
/// endpoints match.
pub trait Identified {
    /// Stable ID of the item
    fn item_id(&self) -> String;
}

impl<T: Identified + ?Sized> Identified for std::sync::Arc<T> {
    fn item_id(&self) -> String {
        (**self).item_id()
    }
}

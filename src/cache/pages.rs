//! Item updates inside cached page collections.
//!
//! Every function consumes the old value and returns the new one. Items that
//! are not touched are moved across unchanged, so holders of `Arc` items keep
//! pointer equality for everything except the updated entry.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::Identified;
use crate::api::Paginated;

/// Pages of an infinite list, in fetch order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfiniteData<T> {
    /// Fetched pages
    pub pages: Vec<Paginated<T>>,
}

impl<T> Default for InfiniteData<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T> InfiniteData<T> {
    /// Start from a single page.
    pub fn from_page(page: Paginated<T>) -> Self {
        Self { pages: vec![page] }
    }

    /// Append the next page.
    pub fn push_page(&mut self, page: Paginated<T>) {
        self.pages.push(page);
    }

    /// All items across pages, in order
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.results.iter())
    }

    /// Flatten into one list.
    pub fn into_items(self) -> Vec<T> {
        self.pages.into_iter().flat_map(|page| page.results).collect()
    }

    /// Cursor of the last page
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|page| page.next.as_deref())
    }
}

impl<T: Identified> InfiniteData<T> {
    /// Page and index of the item with the given ID
    pub fn position(&self, id: &str) -> Option<(usize, usize)> {
        self.pages.iter().enumerate().find_map(|(p, page)| {
            page.results
                .iter()
                .position(|item| item.item_id() == id)
                .map(|i| (p, i))
        })
    }
}

/// Replace the item with the given ID by `updater(item)`.
pub fn update_item_by_id<T, F>(mut items: Vec<T>, id: impl Display, updater: F) -> Vec<T>
where
    T: Identified,
    F: FnOnce(&T) -> T,
{
    let id = id.to_string();
    if let Some(item) = items.iter_mut().find(|item| item.item_id() == id) {
        *item = updater(item);
    }
    items
}

/// Drop the item with the given ID.
pub fn remove_item_by_id<T: Identified>(mut items: Vec<T>, id: impl Display) -> Vec<T> {
    let id = id.to_string();
    items.retain(|item| item.item_id() != id);
    items
}

/// Replace the item with the same ID, or prepend it.
pub fn upsert_item<T: Identified>(mut items: Vec<T>, item: T) -> Vec<T> {
    let id = item.item_id();
    match items.iter().position(|existing| existing.item_id() == id) {
        Some(i) => items[i] = item,
        None => items.insert(0, item),
    }
    items
}

/// Replace the item with the given ID, wherever it is, by `updater(item)`.
///
/// IDs are compared as strings. Returns the input untouched when the data is
/// absent or no item matches.
pub fn update_infinite_item_by_id<T, F>(
    data: Option<InfiniteData<T>>,
    id: impl Display,
    updater: F,
) -> Option<InfiniteData<T>>
where
    T: Identified,
    F: FnOnce(&T) -> T,
{
    let mut data = data?;
    if let Some((p, i)) = data.position(&id.to_string()) {
        let item = &mut data.pages[p].results[i];
        *item = updater(item);
    }
    Some(data)
}

/// Drop the item with the given ID from whichever page holds it.
pub fn remove_infinite_item_by_id<T: Identified>(
    data: Option<InfiniteData<T>>,
    id: impl Display,
) -> Option<InfiniteData<T>> {
    let mut data = data?;
    if let Some((p, i)) = data.position(&id.to_string()) {
        data.pages[p].results.remove(i);
    }
    Some(data)
}

/// Apply `updater` to every item on every page.
pub fn update_all_infinite_items<T, F>(
    data: Option<InfiniteData<T>>,
    mut updater: F,
) -> Option<InfiniteData<T>>
where
    F: FnMut(&T) -> T,
{
    let mut data = data?;
    for page in &mut data.pages {
        for item in &mut page.results {
            *item = updater(item);
        }
    }
    Some(data)
}

/// Replace the item with the same ID in place, or prepend it to the first
/// page. Calling this twice with the same item leaves one copy.
///
/// With no pages loaded yet, the item becomes the only page.
pub fn upsert_infinite_item<T: Identified>(
    data: Option<InfiniteData<T>>,
    item: T,
) -> Option<InfiniteData<T>> {
    let mut data = data?;
    if let Some((p, i)) = data.position(&item.item_id()) {
        data.pages[p].results[i] = item;
    } else if let Some(first) = data.pages.first_mut() {
        first.results.insert(0, item);
    } else {
        data.pages.push(Paginated::single(vec![item]));
    }
    Some(data)
}

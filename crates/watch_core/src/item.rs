use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed comment. `id` is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_id: String,
    pub author_handle: String,
    pub author_avatar_url: String,
}

/// Every item ever observed for a resource, keyed by `id`.
///
/// Stored as an ordered sequence (insertion order) so the persisted form
/// stays human-diffable; no two elements share an `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Item>", into = "Vec<Item>")]
pub struct ItemSet {
    items: Vec<Item>,
    ids: HashSet<String>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Set union: adds each item whose id is not yet known. Returns how many
    /// were added. Merging the same batch twice changes nothing the second time.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = Item>,
    {
        let mut added = 0;
        for item in items {
            if self.ids.insert(item.id.clone()) {
                self.items.push(item);
                added += 1;
            }
        }
        added
    }
}

impl From<Vec<Item>> for ItemSet {
    /// First occurrence of a duplicated id wins.
    fn from(items: Vec<Item>) -> Self {
        let mut set = ItemSet::new();
        set.merge(items);
        set
    }
}

impl From<ItemSet> for Vec<Item> {
    fn from(set: ItemSet) -> Self {
        set.items
    }
}

/// Items of `latest` whose id is not in `known`, in `latest` order.
///
/// Duplicate ids inside `latest` are reported once (first occurrence).
pub fn diff_new(latest: &[Item], known: &ItemSet) -> Vec<Item> {
    let mut emitted = HashSet::new();
    latest
        .iter()
        .filter(|item| !known.contains_id(&item.id))
        .filter(|item| emitted.insert(item.id.as_str()))
        .cloned()
        .collect()
}

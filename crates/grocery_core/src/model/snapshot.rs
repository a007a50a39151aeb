//! Complete serializable state.
//!
//! # Responsibility
//! - Carry every persisted collection as one unit for storage, undo, export
//!   and import.
//!
//! # Invariants
//! - Preferences are never part of a snapshot.

use serde::{Deserialize, Serialize};

use super::catalog::{default_categories, Category, StoreProfile};
use super::history::ItemHistoryEntry;
use super::item::Item;
use super::list::List;
use super::now_epoch_ms;

/// Snapshot schema version written by this build.
pub const SNAPSHOT_VERSION: i64 = 1;

/// Full persisted state, also the export/import payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: i64,
    pub exported_at: i64,
    pub lists: Vec<List>,
    pub items: Vec<Item>,
    pub categories: Vec<Category>,
    pub item_history: Vec<ItemHistoryEntry>,
    pub store_profiles: Vec<StoreProfile>,
}

impl Snapshot {
    /// Empty state seeded with the default category catalog.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: now_epoch_ms(),
            lists: Vec::new(),
            items: Vec::new(),
            categories: default_categories(),
            item_history: Vec::new(),
            store_profiles: Vec::new(),
        }
    }

    /// Substitutes the default catalog when no categories are present.
    ///
    /// Returns `true` when the catalog was replaced.
    pub fn ensure_categories(&mut self) -> bool {
        if !self.categories.is_empty() {
            return false;
        }
        self.categories = default_categories();
        true
    }

    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.lists.len()
            + self.items.len()
            + self.categories.len()
            + self.item_history.len()
            + self.store_profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{Snapshot, SNAPSHOT_VERSION};

    #[test]
    fn empty_snapshot_is_seeded_with_default_catalog() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.categories.len(), 8);
        assert!(snapshot.lists.is_empty());
    }

    #[test]
    fn ensure_categories_only_fills_an_empty_catalog() {
        let mut snapshot = Snapshot::empty();
        assert!(!snapshot.ensure_categories());

        snapshot.categories.clear();
        assert!(snapshot.ensure_categories());
        assert_eq!(snapshot.categories.len(), 8);
    }

    #[test]
    fn json_uses_export_field_names() {
        let json = serde_json::to_value(Snapshot::empty()).unwrap();
        for key in [
            "version",
            "exportedAt",
            "lists",
            "items",
            "categories",
            "itemHistory",
            "storeProfiles",
        ] {
            assert!(json.get(key).is_some(), "missing `{key}`");
        }
    }
}

//! Preference setters. None of these touch undo or snapshot storage.

use super::store::GroceryStore;
use crate::model::preferences::ThemeMode;

impl GroceryStore {
    /// Selects the active list; `None` clears the selection.
    pub fn set_active_list(&mut self, list_id: Option<&str>) {
        let list_id = list_id.map(str::to_string);
        self.update_preferences(|preferences| preferences.active_list_id = list_id);
    }

    pub fn set_search_query(&mut self, list_id: &str, query: &str) {
        let (list_id, query) = (list_id.to_string(), query.to_string());
        self.update_preferences(|preferences| {
            preferences.search_query_by_list.insert(list_id, query);
        });
    }

    pub fn set_move_purchased_to_bottom(&mut self, list_id: &str, value: bool) {
        let list_id = list_id.to_string();
        self.update_preferences(|preferences| {
            preferences.move_purchased_to_bottom.insert(list_id, value);
        });
    }

    pub fn set_theme_mode(&mut self, mode: ThemeMode) {
        self.update_preferences(|preferences| preferences.theme_mode = mode);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::model::preferences::{Preferences, ThemeMode};
    use crate::repo::fallback_storage::FallbackSnapshotStorage;
    use crate::repo::kv::{KeyValueStore, MemoryKeyValueStore};
    use crate::repo::share_storage;
    use crate::service::store::{GroceryStore, PREFERENCES_KEY};

    fn store(kv: &MemoryKeyValueStore) -> GroceryStore {
        let storage = share_storage(FallbackSnapshotStorage::new(MemoryKeyValueStore::new()));
        let mut store =
            GroceryStore::new(storage.clone(), storage, kv.clone(), StoreConfig::default());
        store.init();
        store
    }

    #[test]
    fn preferences_survive_a_new_store_instance() {
        let kv = MemoryKeyValueStore::new();
        let mut first = store(&kv);
        first.set_theme_mode(ThemeMode::Dark);
        first.set_search_query("list-1", "milk");
        first.set_move_purchased_to_bottom("list-1", false);

        let second = store(&kv);
        assert_eq!(second.preferences().theme_mode, ThemeMode::Dark);
        assert_eq!(second.preferences().search_query("list-1"), "milk");
        assert!(!second.preferences().move_purchased_to_bottom("list-1"));
    }

    #[test]
    fn preference_changes_are_not_undoable() {
        let kv = MemoryKeyValueStore::new();
        let mut store = store(&kv);
        let list_id = store.create_list("Weekly").unwrap();
        store.clear_undo();

        store.set_active_list(None);
        store.set_theme_mode(ThemeMode::Light);

        assert!(store.last_undo().is_none());
        assert!(!store.undo());
        let saved: Preferences =
            serde_json::from_str(&kv.get(PREFERENCES_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(saved.active_list_id, None);
        assert!(store.list(&list_id).is_some());
    }
}

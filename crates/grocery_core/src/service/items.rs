//! Item and history operations.
//!
//! # Invariants
//! - Every item mutation bumps `updated_at` of the owning list.
//! - History entries are keyed by canonical name and only ever grow.

use std::collections::HashMap;

use super::store::{ensure_list, position_of, touch_list, GroceryStore, StoreError, UndoLabel};
use crate::domain::history::infer_category_from_history;
use crate::domain::parse::{parse_quick_add, parse_quick_add_batch, ItemDraft, ParseMode};
use crate::model::history::ItemHistoryEntry;
use crate::model::item::{Item, ItemId, ItemPatch};
use crate::model::{new_record_id, now_epoch_ms};

impl GroceryStore {
    /// Adds every item found in quick-add `input` to a list.
    ///
    /// Returns the ids of the created items, in input order. Input without a
    /// usable name adds nothing and records no undo.
    ///
    /// The category is `category_id` when given, otherwise whatever history
    /// learned for the name.
    pub fn add_item_quick(
        &mut self,
        list_id: &str,
        input: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<ItemId>, StoreError> {
        let drafts = parse_quick_add_batch(input, self.config.parse_mode);
        self.add_drafts(list_id, drafts, category_id)
    }

    /// Re-adds a remembered item to `list_id`, or to the active list.
    pub fn add_from_history(
        &mut self,
        history_id: &str,
        list_id: Option<&str>,
    ) -> Result<Vec<ItemId>, StoreError> {
        let entry = self
            .item_history()
            .iter()
            .find(|entry| entry.id == history_id)
            .ok_or_else(|| StoreError::HistoryEntryNotFound(history_id.to_string()))?;
        let draft = parse_quick_add(&entry.name_canonical, ParseMode::Verbatim);
        let category_id = entry.default_category_id.clone();

        let target = match list_id {
            Some(list_id) => list_id.to_string(),
            None => self
                .preferences()
                .active_list_id
                .clone()
                .ok_or(StoreError::NoActiveList)?,
        };
        self.add_drafts(&target, vec![draft], category_id.as_deref())
    }

    fn add_drafts(
        &mut self,
        list_id: &str,
        drafts: Vec<ItemDraft>,
        category_id: Option<&str>,
    ) -> Result<Vec<ItemId>, StoreError> {
        ensure_list(self.lists(), list_id)?;
        let drafts: Vec<ItemDraft> = drafts.into_iter().filter(|draft| !draft.is_empty()).collect();
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let explicit_category = category_id
            .map(str::trim)
            .filter(|category| !category.is_empty());

        self.commit(UndoLabel::AddedItem, |data| {
            let now = now_epoch_ms();
            let mut position = data
                .items
                .iter()
                .filter(|item| item.list_id == list_id && !item.is_purchased)
                .count();
            let mut created = Vec::with_capacity(drafts.len());

            for draft in drafts {
                let category = explicit_category.map(str::to_string).or_else(|| {
                    infer_category_from_history(&draft.name_canonical, &data.item_history)
                        .map(str::to_string)
                });
                record_history_use(
                    &mut data.item_history,
                    &draft.name_canonical,
                    category.as_deref(),
                    now,
                );

                let item = Item {
                    id: new_record_id(),
                    list_id: list_id.to_string(),
                    name: draft.name_canonical,
                    name_original: draft.name_original,
                    quantity: draft.quantity,
                    unit: draft.unit.map(|unit| unit.as_str().to_string()),
                    category_id: category,
                    notes: None,
                    is_purchased: false,
                    position: Some(position_of(position)),
                    created_at: now,
                    updated_at: now,
                    purchased_at: None,
                };
                position += 1;
                created.push(item.id.clone());
                data.items.push(item);
            }

            touch_list(&mut data.lists, list_id, now);
            Ok(created)
        })
    }

    /// Merges `patch` into an item.
    ///
    /// A new name is taken verbatim as display text and lowercased into the
    /// canonical name; a blank name is ignored. Setting a non-empty category
    /// also teaches history that category for the item's name.
    pub fn update_item(&mut self, item_id: &str, patch: ItemPatch) -> Result<(), StoreError> {
        self.commit(UndoLabel::UpdatedItem, |data| {
            let now = now_epoch_ms();
            let item = find_item_mut(&mut data.items, item_id)?;

            if let Some(name) = patch.name {
                let draft = parse_quick_add(&name, ParseMode::Verbatim);
                if !draft.is_empty() {
                    item.name = draft.name_canonical;
                    item.name_original = draft.name_original;
                }
            }
            if let Some(quantity) = patch.quantity {
                item.quantity = quantity;
            }
            if let Some(unit) = patch.unit {
                item.unit = unit;
            }
            if let Some(notes) = patch.notes {
                item.notes = notes;
            }
            if let Some(position) = patch.position {
                item.position = position;
            }
            let learned_category = patch.category_id.and_then(|category_id| {
                item.category_id = category_id.clone();
                category_id.filter(|category| !category.trim().is_empty())
            });
            if let Some(purchased) = patch.is_purchased {
                item.set_purchased(purchased, now);
            }
            item.updated_at = now;

            let list_id = item.list_id.clone();
            let name = item.name.clone();
            if let Some(category_id) = learned_category {
                for entry in data
                    .item_history
                    .iter_mut()
                    .filter(|entry| entry.name_canonical == name)
                {
                    entry.default_category_id = Some(category_id.clone());
                }
            }
            touch_list(&mut data.lists, &list_id, now);
            Ok(())
        })
    }

    pub fn delete_item(&mut self, item_id: &str) -> Result<(), StoreError> {
        self.commit(UndoLabel::DeletedItem, |data| {
            let index = data
                .items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))?;
            let item = data.items.remove(index);
            touch_list(&mut data.lists, &item.list_id, now_epoch_ms());
            Ok(())
        })
    }

    /// Flips the purchase flag and returns the new value.
    ///
    /// Marking an item purchased counts as a use of its history entry.
    pub fn toggle_item_purchased(&mut self, item_id: &str) -> Result<bool, StoreError> {
        self.commit(UndoLabel::ToggledPurchase, |data| {
            let now = now_epoch_ms();
            let item = find_item_mut(&mut data.items, item_id)?;
            let purchased = !item.is_purchased;
            item.set_purchased(purchased, now);
            item.updated_at = now;

            let list_id = item.list_id.clone();
            if purchased {
                let name = item.name.clone();
                if let Some(entry) = data
                    .item_history
                    .iter_mut()
                    .find(|entry| entry.name_canonical == name)
                {
                    entry.times_used = entry.times_used.saturating_add(1);
                    entry.last_used_at = now;
                }
            }
            touch_list(&mut data.lists, &list_id, now);
            Ok(purchased)
        })
    }

    /// Assigns `position = index` to the listed items of `list_id`.
    ///
    /// Ids of other lists, unknown ids and repeats are ignored.
    pub fn reorder_items<S: AsRef<str>>(
        &mut self,
        list_id: &str,
        ordered_ids: &[S],
    ) -> Result<(), StoreError> {
        self.commit(UndoLabel::ReorderedItems, |data| {
            ensure_list(&data.lists, list_id)?;
            let mut positions: HashMap<&str, i64> = HashMap::with_capacity(ordered_ids.len());
            for (index, item_id) in ordered_ids.iter().enumerate() {
                positions
                    .entry(item_id.as_ref())
                    .or_insert_with(|| position_of(index));
            }

            for item in data.items.iter_mut().filter(|item| item.list_id == list_id) {
                if let Some(position) = positions.get(item.id.as_str()) {
                    item.position = Some(*position);
                }
            }
            touch_list(&mut data.lists, list_id, now_epoch_ms());
            Ok(())
        })
    }

    /// Deletes the purchased items of a list and returns how many went.
    pub fn clear_purchased(&mut self, list_id: &str) -> Result<usize, StoreError> {
        self.commit(UndoLabel::ClearedPurchased, |data| {
            ensure_list(&data.lists, list_id)?;
            let before = data.items.len();
            data.items
                .retain(|item| !(item.list_id == list_id && item.is_purchased));
            touch_list(&mut data.lists, list_id, now_epoch_ms());
            Ok(before - data.items.len())
        })
    }

    /// Flips the favorite flag of a history entry and returns the new value.
    pub fn toggle_favorite_history(&mut self, history_id: &str) -> Result<bool, StoreError> {
        self.commit(UndoLabel::UpdatedFavorite, |data| {
            let entry = data
                .item_history
                .iter_mut()
                .find(|entry| entry.id == history_id)
                .ok_or_else(|| StoreError::HistoryEntryNotFound(history_id.to_string()))?;
            entry.is_favorite = !entry.is_favorite;
            Ok(entry.is_favorite)
        })
    }
}

fn find_item_mut<'a>(items: &'a mut [Item], item_id: &str) -> Result<&'a mut Item, StoreError> {
    items
        .iter_mut()
        .find(|item| item.id == item_id)
        .ok_or_else(|| StoreError::ItemNotFound(item_id.to_string()))
}

fn record_history_use(
    history: &mut Vec<ItemHistoryEntry>,
    name_canonical: &str,
    category_id: Option<&str>,
    now: i64,
) {
    match history
        .iter_mut()
        .find(|entry| entry.name_canonical == name_canonical)
    {
        Some(entry) => entry.record_use(category_id, now),
        None => history.push(ItemHistoryEntry::first_use(
            name_canonical,
            category_id.map(str::to_string),
            now,
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::domain::parse::ParseMode;
    use crate::model::item::ItemPatch;
    use crate::repo::fallback_storage::FallbackSnapshotStorage;
    use crate::repo::kv::MemoryKeyValueStore;
    use crate::repo::share_storage;
    use crate::service::store::{GroceryStore, StoreError};

    fn store_with(config: StoreConfig) -> (GroceryStore, String) {
        let kv = MemoryKeyValueStore::new();
        let storage = share_storage(FallbackSnapshotStorage::new(kv.clone()));
        let mut store = GroceryStore::new(storage.clone(), storage, kv, config);
        store.init();
        let list_id = store.create_list("Weekly").unwrap();
        (store, list_id)
    }

    #[test]
    fn quick_add_keeps_digits_in_the_name_by_default() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let ids = store.add_item_quick(&list_id, "2 Milk", None).unwrap();

        let item = store.item(&ids[0]).unwrap();
        assert_eq!(item.name, "2 milk");
        assert_eq!(item.name_original, "2 Milk");
        assert_eq!(item.quantity, None);
    }

    #[test]
    fn quick_add_extracts_quantity_when_configured() {
        let config = StoreConfig::default().with_parse_mode(ParseMode::ExtractQuantity);
        let (mut store, list_id) = store_with(config);
        let ids = store.add_item_quick(&list_id, "1.5 lb chicken", None).unwrap();

        let item = store.item(&ids[0]).unwrap();
        assert_eq!(item.name, "chicken");
        assert_eq!(item.quantity, Some(1.5));
        assert_eq!(item.unit.as_deref(), Some("lb"));
    }

    #[test]
    fn quick_add_positions_follow_unpurchased_items() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let first = store.add_item_quick(&list_id, "apples, bread", None).unwrap();
        store.toggle_item_purchased(&first[0]).unwrap();

        let added = store.add_item_quick(&list_id, "cheese", None).unwrap();
        assert_eq!(store.item(&added[0]).unwrap().position, Some(1));
    }

    #[test]
    fn quick_add_learns_and_reuses_categories() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        store.add_item_quick(&list_id, "Milk", Some("dairy")).unwrap();
        let ids = store.add_item_quick(&list_id, "milk", None).unwrap();

        assert_eq!(store.item(&ids[0]).unwrap().category_id.as_deref(), Some("dairy"));
        let entry = &store.item_history()[0];
        assert_eq!(entry.times_used, 2);
        assert_eq!(entry.default_category_id.as_deref(), Some("dairy"));
    }

    #[test]
    fn blank_quick_add_records_no_undo() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        store.clear_undo();

        assert!(store.add_item_quick(&list_id, " ,; \n", None).unwrap().is_empty());
        assert!(store.last_undo().is_none());
    }

    #[test]
    fn quick_add_into_unknown_list_fails() {
        let (mut store, _) = store_with(StoreConfig::default());
        let err = store.add_item_quick("missing", "milk", None).unwrap_err();
        assert!(matches!(err, StoreError::ListNotFound(_)));
        assert!(store.items().is_empty());
    }

    #[test]
    fn update_item_reparses_names_and_teaches_history() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let ids = store.add_item_quick(&list_id, "Yoghurt", None).unwrap();

        store.update_item(&ids[0], ItemPatch::category("dairy")).unwrap();
        assert_eq!(
            store.item_history()[0].default_category_id.as_deref(),
            Some("dairy")
        );

        let patch = ItemPatch {
            name: Some("  Greek   Yoghurt ".to_string()),
            ..ItemPatch::default()
        };
        store.update_item(&ids[0], patch).unwrap();

        let item = store.item(&ids[0]).unwrap();
        assert_eq!(item.name, "greek yoghurt");
        assert_eq!(item.name_original, "Greek Yoghurt");
        assert_eq!(item.category_id.as_deref(), Some("dairy"));
    }

    #[test]
    fn update_item_maintains_purchased_at() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let ids = store.add_item_quick(&list_id, "eggs", None).unwrap();

        let purchase = ItemPatch {
            is_purchased: Some(true),
            ..ItemPatch::default()
        };
        store.update_item(&ids[0], purchase).unwrap();
        assert!(store.item(&ids[0]).unwrap().purchased_at.is_some());

        let unpurchase = ItemPatch {
            is_purchased: Some(false),
            ..ItemPatch::default()
        };
        store.update_item(&ids[0], unpurchase).unwrap();
        assert!(store.item(&ids[0]).unwrap().purchased_at.is_none());
    }

    #[test]
    fn reorder_items_only_touches_the_given_list() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let ids = store.add_item_quick(&list_id, "a, b, c", None).unwrap();
        let other = store.create_list("Other").unwrap();
        let foreign = store.add_item_quick(&other, "z", None).unwrap();

        store
            .reorder_items(&list_id, &[ids[2].as_str(), foreign[0].as_str(), ids[0].as_str()])
            .unwrap();

        assert_eq!(store.item(&ids[2]).unwrap().position, Some(0));
        assert_eq!(store.item(&ids[0]).unwrap().position, Some(2));
        assert_eq!(store.item(&ids[1]).unwrap().position, Some(1));
        assert_eq!(store.item(&foreign[0]).unwrap().position, Some(0));
    }

    #[test]
    fn clear_purchased_removes_only_purchased_items_of_the_list() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        let ids = store.add_item_quick(&list_id, "a, b", None).unwrap();
        store.toggle_item_purchased(&ids[0]).unwrap();

        assert_eq!(store.clear_purchased(&list_id).unwrap(), 1);
        assert!(store.item(&ids[0]).is_none());
        assert!(store.item(&ids[1]).is_some());
    }

    #[test]
    fn add_from_history_targets_the_active_list() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        store.add_item_quick(&list_id, "Coffee", Some("pantry")).unwrap();
        let history_id = store.item_history()[0].id.clone();

        let ids = store.add_from_history(&history_id, None).unwrap();
        let item = store.item(&ids[0]).unwrap();
        assert_eq!(item.list_id, list_id);
        assert_eq!(item.category_id.as_deref(), Some("pantry"));
        assert_eq!(store.item_history()[0].times_used, 2);
    }

    #[test]
    fn toggle_favorite_flips_the_flag() {
        let (mut store, list_id) = store_with(StoreConfig::default());
        store.add_item_quick(&list_id, "tea", None).unwrap();
        let history_id = store.item_history()[0].id.clone();

        assert!(store.toggle_favorite_history(&history_id).unwrap());
        assert!(!store.toggle_favorite_history(&history_id).unwrap());
    }
}

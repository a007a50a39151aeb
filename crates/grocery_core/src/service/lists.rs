//! List lifecycle operations.

use std::collections::HashSet;

use super::store::{find_list_mut, position_of, GroceryStore, StoreError, UndoLabel};
use crate::domain::sort::next_list_position;
use crate::model::list::{List, ListId};
use crate::model::now_epoch_ms;

const DEFAULT_LIST_NAME: &str = "List";

impl GroceryStore {
    /// Creates a list after every existing one and makes it active.
    pub fn create_list(&mut self, name: &str) -> Result<ListId, StoreError> {
        let trimmed = name.trim();
        let name = if trimmed.is_empty() {
            DEFAULT_LIST_NAME
        } else {
            trimmed
        };

        let list_id = self.commit(UndoLabel::CreatedList, |data| {
            let list = List::new(name, next_list_position(&data.lists));
            let list_id = list.id.clone();
            data.lists.push(list);
            Ok(list_id)
        })?;

        let active = list_id.clone();
        self.update_preferences(|preferences| preferences.active_list_id = Some(active));
        Ok(list_id)
    }

    /// Renames a list. A blank name keeps the current one.
    pub fn rename_list(&mut self, list_id: &str, name: &str) -> Result<(), StoreError> {
        self.commit(UndoLabel::RenamedList, |data| {
            let list = find_list_mut(&mut data.lists, list_id)?;
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                list.name = trimmed.to_string();
            }
            list.updated_at = now_epoch_ms();
            Ok(())
        })
    }

    /// Moves the named lists to the front, in the given order.
    ///
    /// Unknown and repeated ids are ignored. Lists not named keep their
    /// relative display order after the named ones. Every list ends up with a
    /// dense position.
    pub fn reorder_lists<S: AsRef<str>>(&mut self, ordered_ids: &[S]) -> Result<(), StoreError> {
        self.commit(UndoLabel::ReorderedLists, |data| {
            let mut remaining = std::mem::take(&mut data.lists);
            let mut seen = HashSet::new();
            let mut ordered = Vec::with_capacity(remaining.len());

            for list_id in ordered_ids {
                let list_id: &str = list_id.as_ref();
                if !seen.insert(list_id) {
                    continue;
                }
                if let Some(index) = remaining.iter().position(|list| list.id == list_id) {
                    ordered.push(remaining.remove(index));
                }
            }
            ordered.append(&mut remaining);

            for (index, list) in ordered.iter_mut().enumerate() {
                list.position = Some(position_of(index));
            }
            data.lists = ordered;
            Ok(())
        })
    }

    /// Deletes a list and every item in it.
    ///
    /// When the deleted list was active, the first remaining list becomes
    /// active.
    pub fn delete_list(&mut self, list_id: &str) -> Result<(), StoreError> {
        self.commit(UndoLabel::DeletedList, |data| {
            let index = data
                .lists
                .iter()
                .position(|list| list.id == list_id)
                .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))?;
            data.lists.remove(index);
            data.items.retain(|item| item.list_id != list_id);
            Ok(())
        })?;

        if self.preferences().active_list_id.as_deref() == Some(list_id) {
            let next = self.lists().first().map(|list| list.id.clone());
            self.update_preferences(|preferences| preferences.active_list_id = next);
        }
        Ok(())
    }
}

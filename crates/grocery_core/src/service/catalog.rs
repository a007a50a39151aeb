//! Sort mode and category catalog operations.

use std::collections::HashMap;

use super::store::{find_list_mut, position_of, GroceryStore, StoreError, UndoLabel};
use crate::domain::sort::{sort_items, SortOptions};
use crate::model::catalog::{default_categories, default_category_order};
use crate::model::list::SortMode;
use crate::model::now_epoch_ms;

impl GroceryStore {
    /// Changes how a list orders its items.
    ///
    /// Switching to manual ordering stores the current category ordering,
    /// purchased items last, as item positions so the visible order does not
    /// jump.
    pub fn set_sort_mode(&mut self, list_id: &str, mode: SortMode) -> Result<(), StoreError> {
        self.commit(UndoLabel::ChangedSortMode, |data| {
            let list = find_list_mut(&mut data.lists, list_id)?;
            list.sort_mode = mode;
            list.updated_at = now_epoch_ms();
            if mode != SortMode::Manual {
                return Ok(());
            }

            let category_order = list.category_order.clone();
            let options = SortOptions {
                sort_mode: SortMode::Category,
                category_order: &category_order,
                move_purchased_to_bottom: true,
            };
            let frozen: HashMap<String, i64> = sort_items(
                data.items.iter().filter(|item| item.list_id == list_id),
                &options,
            )
            .into_iter()
            .enumerate()
            .map(|(index, item)| (item.id.clone(), position_of(index)))
            .collect();

            for item in &mut data.items {
                if let Some(position) = frozen.get(&item.id) {
                    item.position = Some(*position);
                }
            }
            Ok(())
        })
    }

    /// Replaces a list's category order.
    pub fn reorder_categories<S: AsRef<str>>(
        &mut self,
        list_id: &str,
        order: &[S],
    ) -> Result<(), StoreError> {
        self.commit(UndoLabel::ReorderedCategories, |data| {
            let list = find_list_mut(&mut data.lists, list_id)?;
            list.category_order = order.iter().map(|id| id.as_ref().to_string()).collect();
            list.updated_at = now_epoch_ms();
            Ok(())
        })
    }

    /// Renames a catalog category. A blank name keeps the current one.
    pub fn rename_category(&mut self, category_id: &str, name: &str) -> Result<(), StoreError> {
        self.commit(UndoLabel::RenamedCategory, |data| {
            let category = data
                .categories
                .iter_mut()
                .find(|category| category.id == category_id)
                .ok_or_else(|| StoreError::CategoryNotFound(category_id.to_string()))?;
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                category.name = trimmed.to_string();
            }
            Ok(())
        })
    }

    /// Restores the default catalog and every list's default category order.
    pub fn reset_categories(&mut self) -> Result<(), StoreError> {
        self.commit(UndoLabel::ResetCategories, |data| {
            data.categories = default_categories();
            let order = default_category_order();
            for list in &mut data.lists {
                list.category_order = order.clone();
            }
            Ok(())
        })
    }
}

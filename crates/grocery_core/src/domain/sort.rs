//! Deterministic item and list ordering.
//!
//! # Invariants
//! - Purchase-status partitioning dominates every other comparison.
//! - Purchased items are ordered by `purchased_at` descending.
//! - Sorting is stable: exact ties keep their input order.

use std::cmp::{Ordering, Reverse};
use std::collections::HashMap;

use crate::model::item::Item;
use crate::model::list::{List, SortMode};

/// Options controlling `sort_items`.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions<'a> {
    pub sort_mode: SortMode,
    pub category_order: &'a [String],
    pub move_purchased_to_bottom: bool,
}

/// Index of each category id in a list's `category_order`.
///
/// Uncategorized items and ids missing from the order share one rank after
/// every ordered category.
struct CategoryRanker<'a> {
    order: HashMap<&'a str, usize>,
}

impl<'a> CategoryRanker<'a> {
    fn new(category_order: &'a [String]) -> Self {
        let mut order = HashMap::with_capacity(category_order.len());
        for (index, id) in category_order.iter().enumerate() {
            order.entry(id.as_str()).or_insert(index);
        }
        Self { order }
    }

    fn rank(&self, category_id: Option<&str>) -> usize {
        category_id
            .and_then(|id| self.order.get(id).copied())
            .unwrap_or(usize::MAX)
    }
}

/// Returns `items` in display order.
pub fn sort_items<'a, I>(items: I, options: &SortOptions<'_>) -> Vec<&'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let ranker = CategoryRanker::new(options.category_order);
    let mut sorted: Vec<&Item> = items.into_iter().collect();
    sorted.sort_by(|a, b| compare_items(a, b, &ranker, options));
    sorted
}

fn compare_items(a: &Item, b: &Item, ranker: &CategoryRanker<'_>, options: &SortOptions<'_>) -> Ordering {
    if a.is_purchased != b.is_purchased {
        // `false < true`, so unpurchased first unless the list wants the reverse.
        let unpurchased_first = a.is_purchased.cmp(&b.is_purchased);
        return if options.move_purchased_to_bottom {
            unpurchased_first
        } else {
            unpurchased_first.reverse()
        };
    }

    if a.is_purchased {
        return b
            .purchased_at
            .unwrap_or(0)
            .cmp(&a.purchased_at.unwrap_or(0));
    }

    match options.sort_mode {
        SortMode::Manual => manual_key(a)
            .cmp(&manual_key(b))
            .then_with(|| a.name.cmp(&b.name)),
        SortMode::Alpha => a
            .name_original
            .to_lowercase()
            .cmp(&b.name_original.to_lowercase()),
        SortMode::Recent => b
            .created_at
            .cmp(&a.created_at)
            .then_with(|| a.name.cmp(&b.name)),
        SortMode::Category => ranker
            .rank(a.category_id.as_deref())
            .cmp(&ranker.rank(b.category_id.as_deref()))
            .then_with(|| a.name.cmp(&b.name)),
    }
}

// Items without a position sort after every positioned item.
fn manual_key(item: &Item) -> (bool, i64) {
    (item.position.is_none(), item.position.unwrap_or(0))
}

/// Orders lists for display.
///
/// Positioned lists come first by position; lists without a position, and
/// ties, fall back to most recently updated first.
pub fn sort_lists(lists: &mut [List]) {
    lists.sort_by_key(|list| {
        (
            list.position.is_none(),
            list.position.unwrap_or(0),
            Reverse(list.updated_at),
        )
    });
}

/// Returns the next free manual list position.
pub fn next_list_position(lists: &[List]) -> i64 {
    lists
        .iter()
        .map(|list| list.position.unwrap_or(0))
        .max()
        .map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::{next_list_position, sort_items, sort_lists, SortOptions};
    use crate::model::item::Item;
    use crate::model::list::{List, SortMode};

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.to_string(),
            list_id: "list".to_string(),
            name: name.to_lowercase(),
            name_original: name.to_string(),
            quantity: None,
            unit: None,
            category_id: None,
            notes: None,
            is_purchased: false,
            position: None,
            created_at: 0,
            updated_at: 0,
            purchased_at: None,
        }
    }

    fn in_category(id: &str, name: &str, category: &str) -> Item {
        Item {
            category_id: Some(category.to_string()),
            ..item(id, name)
        }
    }

    fn purchased(id: &str, name: &str, at: i64) -> Item {
        Item {
            is_purchased: true,
            purchased_at: Some(at),
            ..item(id, name)
        }
    }

    fn ids(items: &[&Item]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    fn options(order: &[String], mode: SortMode, bottom: bool) -> SortOptions<'_> {
        SortOptions {
            sort_mode: mode,
            category_order: order,
            move_purchased_to_bottom: bottom,
        }
    }

    #[test]
    fn category_mode_follows_list_order_then_name() {
        let order = vec!["dairy".to_string(), "produce".to_string()];
        let items = vec![
            in_category("a", "Bananas", "produce"),
            in_category("b", "Milk", "dairy"),
            in_category("c", "Apples", "produce"),
            item("d", "Mystery"),
        ];
        let sorted = sort_items(&items, &options(&order, SortMode::Category, true));
        assert_eq!(ids(&sorted), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn categories_missing_from_list_order_tie_with_uncategorized_items() {
        let order = vec!["produce".to_string()];
        let items = vec![
            in_category("zucchini", "Zucchini", "dairy"),
            item("apple", "Apple"),
            in_category("widget", "Widget", "garage"),
            in_category("kale", "Kale", "produce"),
        ];
        let sorted = sort_items(&items, &options(&order, SortMode::Category, true));
        assert_eq!(ids(&sorted), vec!["kale", "apple", "widget", "zucchini"]);
    }

    #[test]
    fn purchased_partition_dominates_and_orders_by_recency() {
        let order = vec!["produce".to_string()];
        let items = vec![
            purchased("old", "Apples", 10),
            item("open", "Zucchini"),
            purchased("new", "Milk", 20),
        ];
        let bottom = sort_items(&items, &options(&order, SortMode::Alpha, true));
        assert_eq!(ids(&bottom), vec!["open", "new", "old"]);

        let top = sort_items(&items, &options(&order, SortMode::Alpha, false));
        assert_eq!(ids(&top), vec!["new", "old", "open"]);
    }

    #[test]
    fn manual_mode_puts_unpositioned_items_last() {
        let mut first = item("first", "Zebra cakes");
        first.position = Some(0);
        let mut second = item("second", "Apples");
        second.position = Some(1);
        let loose = item("loose", "Aardvark");
        let items = vec![loose, second, first];

        let sorted = sort_items(&items, &options(&[], SortMode::Manual, true));
        assert_eq!(ids(&sorted), vec!["first", "second", "loose"]);
    }

    #[test]
    fn alpha_mode_ignores_case() {
        let items = vec![item("b", "banana"), item("a", "Apple"), item("c", "cherry")];
        let sorted = sort_items(&items, &options(&[], SortMode::Alpha, true));
        assert_eq!(ids(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn recent_mode_is_newest_first_with_name_ties() {
        let mut old = item("old", "Bread");
        old.created_at = 1;
        let mut newer_b = item("newer_b", "Butter");
        newer_b.created_at = 5;
        let mut newer_a = item("newer_a", "Apples");
        newer_a.created_at = 5;
        let items = vec![old, newer_b, newer_a];

        let sorted = sort_items(&items, &options(&[], SortMode::Recent, true));
        assert_eq!(ids(&sorted), vec!["newer_a", "newer_b", "old"]);
    }

    #[test]
    fn sorting_is_deterministic_and_stable_for_exact_ties() {
        let items = vec![item("x", "Same"), item("y", "Same"), item("z", "Same")];
        for mode in [SortMode::Category, SortMode::Manual, SortMode::Alpha, SortMode::Recent] {
            let first = sort_items(&items, &options(&[], mode, true));
            let second = sort_items(&items, &options(&[], mode, true));
            assert_eq!(ids(&first), vec!["x", "y", "z"]);
            assert_eq!(ids(&first), ids(&second));
        }
    }

    #[test]
    fn lists_sort_by_position_then_recency() {
        let mut a = List::new("A", 1);
        a.updated_at = 1;
        let mut b = List::new("B", 0);
        b.updated_at = 1;
        let mut c = List::new("C", 0);
        c.position = None;
        c.updated_at = 50;
        let mut d = List::new("D", 0);
        d.position = None;
        d.updated_at = 99;

        let mut lists = vec![a, c, b, d];
        sort_lists(&mut lists);
        let names: Vec<&str> = lists.iter().map(|list| list.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "D", "C"]);
        assert_eq!(next_list_position(&lists), 2);
        assert_eq!(next_list_position(&[]), 0);
    }
}

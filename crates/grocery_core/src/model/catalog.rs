//! Category catalog and store profiles.
//!
//! # Invariants
//! - The category catalog is global; per-list ordering lives on `List`.
//! - The default catalog ids are stable slugs so exported files stay
//!   portable between installs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque category identifier.
pub type CategoryId = String;

/// Global category definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Seeds category ordering for new lists.
    pub default_order: f64,
}

const DEFAULT_CATEGORY_SEED: &[(&str, &str)] = &[
    ("produce", "Produce"),
    ("dairy", "Dairy"),
    ("meat", "Meat"),
    ("pantry", "Pantry"),
    ("frozen", "Frozen"),
    ("bakery", "Bakery"),
    ("household", "Household"),
    ("other", "Other"),
];

/// Returns a fresh copy of the built-in category catalog.
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORY_SEED
        .iter()
        .enumerate()
        .map(|(index, (id, name))| Category {
            id: (*id).to_string(),
            name: (*name).to_string(),
            default_order: index as f64,
        })
        .collect()
}

/// Returns the built-in category ids in default order.
pub fn default_category_order() -> Vec<CategoryId> {
    DEFAULT_CATEGORY_SEED
        .iter()
        .map(|(id, _)| (*id).to_string())
        .collect()
}

/// Optional per-store category ordering override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProfile {
    pub id: String,
    pub name: String,
    pub aisle_order: Vec<CategoryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_store_category_aliases: Option<BTreeMap<String, String>>,
}

#[cfg(test)]
mod tests {
    use super::{default_categories, default_category_order};

    #[test]
    fn default_order_matches_catalog_order() {
        let ids: Vec<String> = default_categories().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, default_category_order());
        assert_eq!(ids.first().map(String::as_str), Some("produce"));
        assert_eq!(ids.last().map(String::as_str), Some("other"));
    }
}

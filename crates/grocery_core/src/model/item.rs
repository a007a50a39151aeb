//! Grocery item record.

use serde::{Deserialize, Serialize};

use super::list::ListId;

/// Opaque item identifier.
pub type ItemId = String;

/// One entry on a shopping list.
///
/// # Invariants
/// - `name` is the canonical (lowercased, whitespace-collapsed) form of
///   `name_original`.
/// - `purchased_at` is `Some` exactly while `is_purchased` is `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    pub name_original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub is_purchased: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<i64>,
}

impl Item {
    /// Sets the purchase flag and keeps `purchased_at` in step with it.
    ///
    /// Returns `true` when the flag actually changed.
    pub fn set_purchased(&mut self, purchased: bool, now: i64) -> bool {
        if self.is_purchased == purchased {
            return false;
        }
        self.is_purchased = purchased;
        self.purchased_at = purchased.then_some(now);
        true
    }
}

/// Partial update applied by `GroceryStore::update_item`.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    /// New display text; re-parsed into canonical and display names.
    pub name: Option<String>,
    pub quantity: Option<Option<f64>>,
    pub unit: Option<Option<String>>,
    pub category_id: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub is_purchased: Option<bool>,
    pub position: Option<Option<i64>>,
}

impl ItemPatch {
    pub fn category(category_id: impl Into<String>) -> Self {
        Self {
            category_id: Some(Some(category_id.into())),
            ..Self::default()
        }
    }

    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(Some(notes.into())),
            ..Self::default()
        }
    }
}

//! Shopping list record.

use serde::{Deserialize, Serialize};

use super::catalog::default_category_order;
use super::{new_record_id, now_epoch_ms};

/// Opaque list identifier.
pub type ListId = String;

/// Item ordering strategy chosen per list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Grouped by the list's category order.
    #[default]
    Category,
    /// Explicit user positions.
    Manual,
    /// Display name, case-insensitive.
    Alpha,
    /// Newest first.
    Recent,
}

impl SortMode {
    /// Parses the stable wire name of a sort mode.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "category" => Some(Self::Category),
            "manual" => Some(Self::Manual),
            "alpha" => Some(Self::Alpha),
            "recent" => Some(Self::Recent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Manual => "manual",
            Self::Alpha => "alpha",
            Self::Recent => "recent",
        }
    }
}

/// One shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub sort_mode: SortMode,
    /// Category ids in display order, scoped to this list.
    pub category_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_profile_id: Option<String>,
    /// Manual list ordering key. Lists without one fall back to recency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl List {
    /// Creates a list with a fresh id, category sorting and the default
    /// category order.
    pub fn new(name: impl Into<String>, position: i64) -> Self {
        let now = now_epoch_ms();
        Self {
            id: new_record_id(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            sort_mode: SortMode::Category,
            category_order: default_category_order(),
            store_profile_id: None,
            position: Some(position),
        }
    }
}

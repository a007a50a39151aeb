//! Cross-list item usage history.

use serde::{Deserialize, Serialize};

use super::new_record_id;

/// Usage record for one canonical item name.
///
/// `name_canonical` is unique across the whole history collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHistoryEntry {
    pub id: String,
    pub name_canonical: String,
    pub last_used_at: i64,
    pub times_used: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category_id: Option<String>,
    pub is_favorite: bool,
}

impl ItemHistoryEntry {
    /// Creates the first-use record for a canonical name.
    pub fn first_use(
        name_canonical: impl Into<String>,
        category_id: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: new_record_id(),
            name_canonical: name_canonical.into(),
            last_used_at: now,
            times_used: 1,
            default_category_id: category_id,
            is_favorite: false,
        }
    }

    /// Counts one more use. A known category replaces the learned one.
    pub fn record_use(&mut self, category_id: Option<&str>, now: i64) {
        self.times_used = self.times_used.saturating_add(1);
        self.last_used_at = now;
        if let Some(category_id) = category_id {
            self.default_category_id = Some(category_id.to_string());
        }
    }
}

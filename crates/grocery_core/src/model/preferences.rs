//! Per-device user preferences.
//!
//! Persisted on their own key, outside snapshots, export and undo.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Colour scheme requested by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_list_id: Option<String>,
    pub move_purchased_to_bottom: BTreeMap<String, bool>,
    pub search_query_by_list: BTreeMap<String, String>,
    pub theme_mode: ThemeMode,
}

impl Preferences {
    /// Purchased items sink to the bottom unless the list opted out.
    pub fn move_purchased_to_bottom(&self, list_id: &str) -> bool {
        self.move_purchased_to_bottom
            .get(list_id)
            .copied()
            .unwrap_or(true)
    }

    pub fn search_query(&self, list_id: &str) -> &str {
        self.search_query_by_list
            .get(list_id)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::{Preferences, ThemeMode};

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"activeListId":"a"}"#).unwrap();
        assert_eq!(prefs.active_list_id.as_deref(), Some("a"));
        assert_eq!(prefs.theme_mode, ThemeMode::System);
        assert!(prefs.move_purchased_to_bottom("a"));
        assert_eq!(prefs.search_query("a"), "");
    }
}

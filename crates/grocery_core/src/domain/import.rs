//! Import payload validation.
//!
//! # Responsibility
//! - Accept an untrusted JSON value and keep every well-formed record.
//! - Report skipped sections as warnings instead of failing the import.
//!
//! # Invariants
//! - Accepted items always reference an accepted list.
//! - Record ids are unique within each accepted section.
//! - A rejected payload never yields partial data.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::model::catalog::{Category, StoreProfile};
use crate::model::history::ItemHistoryEntry;
use crate::model::item::Item;
use crate::model::list::{List, SortMode};
use crate::model::snapshot::Snapshot;

/// Import failure. No state may change when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// Input text is not JSON at all.
    MalformedJson(String),
    /// JSON parsed but does not describe a usable payload.
    Invalid { errors: Vec<String> },
}

impl ImportError {
    /// Human-readable reasons, suitable for direct display.
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::MalformedJson(message) => vec![format!("File is not valid JSON: {message}")],
            Self::Invalid { errors } => errors.clone(),
        }
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedJson(message) => write!(f, "import file is not valid JSON: {message}"),
            Self::Invalid { errors } => write!(f, "import rejected: {}", errors.join("; ")),
        }
    }
}

impl Error for ImportError {}

/// Accepted payload plus non-fatal warnings about skipped records.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedImport {
    pub snapshot: Snapshot,
    pub warnings: Vec<String>,
}

/// Parses import file text, then validates it.
pub fn parse_import_json(text: &str) -> Result<ValidatedImport, ImportError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| ImportError::MalformedJson(err.to_string()))?;
    validate_imported_data(&value)
}

/// Validates an untrusted payload.
///
/// # Errors
/// - Non-object payloads.
/// - Missing or non-integer `version`/`exportedAt`, or any missing section
///   array.
/// - Payloads where no record in any section was accepted.
pub fn validate_imported_data(payload: &Value) -> Result<ValidatedImport, ImportError> {
    let Some(object) = payload.as_object() else {
        return Err(ImportError::Invalid {
            errors: vec!["Payload must be an object".to_string()],
        });
    };

    let mut errors = Vec::new();
    let version = object.get("version").and_then(Value::as_i64);
    if version.is_none() {
        errors.push("version must be an integer".to_string());
    }
    let exported_at = object.get("exportedAt").and_then(Value::as_i64);
    if exported_at.is_none() {
        errors.push("exportedAt must be an integer".to_string());
    }

    let lists_source = section(object, "lists", &mut errors);
    let items_source = section(object, "items", &mut errors);
    let categories_source = section(object, "categories", &mut errors);
    let history_source = section(object, "itemHistory", &mut errors);
    let profiles_source = section(object, "storeProfiles", &mut errors);

    let lists: Vec<List> = accept(lists_source, is_list_shape);
    let list_ids: HashSet<&str> = lists.iter().map(|list| list.id.as_str()).collect();
    let items: Vec<Item> = accept(items_source, |value| is_item_shape(value, &list_ids));
    let categories: Vec<Category> = accept(categories_source, is_category_shape);
    let item_history: Vec<ItemHistoryEntry> = accept(history_source, is_history_shape);
    let store_profiles: Vec<StoreProfile> = accept(profiles_source, is_store_profile_shape);

    let mut warnings = Vec::new();
    warn_if_skipped(&mut warnings, lists_source, lists.len(), "lists");
    warn_if_skipped(&mut warnings, items_source, items.len(), "items");
    warn_if_skipped(&mut warnings, categories_source, categories.len(), "categories");
    warn_if_skipped(&mut warnings, history_source, item_history.len(), "history entries");
    warn_if_skipped(&mut warnings, profiles_source, store_profiles.len(), "store profiles");

    let accepted =
        lists.len() + items.len() + categories.len() + item_history.len() + store_profiles.len();

    let (Some(version), Some(exported_at)) = (version, exported_at) else {
        errors.extend(warnings);
        return Err(ImportError::Invalid { errors });
    };
    if !errors.is_empty() || accepted == 0 {
        errors.extend(warnings);
        if accepted == 0 {
            errors.push("Payload contains no usable records".to_string());
        }
        return Err(ImportError::Invalid { errors });
    }

    Ok(ValidatedImport {
        snapshot: Snapshot {
            version,
            exported_at,
            lists,
            items,
            categories,
            item_history,
            store_profiles,
        },
        warnings,
    })
}

fn section<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Vec<Value>> {
    let array = object.get(key).and_then(Value::as_array);
    if array.is_none() {
        errors.push(format!("{key} must be an array"));
    }
    array
}

// Shape check, then typed decoding; among decoded records with the same id
// the first one wins.
fn accept<T, F>(source: Option<&Vec<Value>>, shape: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&Value) -> bool,
{
    let Some(values) = source else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    values
        .iter()
        .filter(|value| shape(value))
        .filter_map(|value| {
            let record = serde_json::from_value::<T>(value.clone()).ok()?;
            Some((value["id"].as_str()?, record))
        })
        .filter(|(id, _)| seen.insert(*id))
        .map(|(_, record)| record)
        .collect()
}

fn warn_if_skipped(
    warnings: &mut Vec<String>,
    source: Option<&Vec<Value>>,
    accepted: usize,
    label: &str,
) {
    if let Some(values) = source {
        if values.len() != accepted {
            warnings.push(format!(
                "Some {label} were skipped because they were missing required fields"
            ));
        }
    }
}

fn is_list_shape(value: &Value) -> bool {
    has_id(value)
        && is_str(value, "name")
        && is_int(value, "createdAt")
        && is_int(value, "updatedAt")
        && value["sortMode"].as_str().and_then(SortMode::parse).is_some()
        && value["categoryOrder"].is_array()
}

fn is_item_shape(value: &Value, list_ids: &HashSet<&str>) -> bool {
    has_id(value)
        && value["listId"]
            .as_str()
            .is_some_and(|list_id| list_ids.contains(list_id))
        && is_str(value, "name")
        && is_str(value, "nameOriginal")
        && value["isPurchased"].is_boolean()
        && is_int(value, "createdAt")
        && is_int(value, "updatedAt")
}

fn is_category_shape(value: &Value) -> bool {
    has_id(value) && is_str(value, "name") && value["defaultOrder"].is_number()
}

fn is_history_shape(value: &Value) -> bool {
    has_id(value)
        && is_str(value, "nameCanonical")
        && is_int(value, "lastUsedAt")
        && is_int(value, "timesUsed")
        && value["isFavorite"].is_boolean()
}

fn is_store_profile_shape(value: &Value) -> bool {
    has_id(value) && is_str(value, "name") && value["aisleOrder"].is_array()
}

fn has_id(value: &Value) -> bool {
    value["id"].as_str().is_some_and(|id| !id.trim().is_empty())
}

fn is_str(value: &Value, key: &str) -> bool {
    value[key].is_string()
}

fn is_int(value: &Value, key: &str) -> bool {
    value[key].as_i64().is_some()
}

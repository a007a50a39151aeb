//! Local persistence core for a grocery list app.
//!
//! Owns the data model, quick-add parsing, sorting, import validation,
//! storage backends and the `GroceryStore` that ties them together.

pub mod config;
pub mod db;
pub mod domain;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{open_data_dir, ConfigError, DataDir, DataDirConfig, StoreConfig};
pub use domain::import::{validate_imported_data, ImportError, ValidatedImport};
pub use domain::parse::{parse_quick_add, split_quick_add, ItemDraft, ParseMode, QuantityUnit};
pub use domain::sort::{sort_items, sort_lists, SortOptions};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::catalog::{Category, StoreProfile};
pub use model::history::ItemHistoryEntry;
pub use model::item::{Item, ItemId, ItemPatch};
pub use model::list::{List, ListId, SortMode};
pub use model::preferences::{Preferences, ThemeMode};
pub use model::snapshot::{Snapshot, SNAPSHOT_VERSION};
pub use repo::{SnapshotStorage, StorageError, StorageResult};
pub use service::{
    GroceryStore, StorageMode, StoreError, StoreEvent, StoreStatus, SubscriptionId, UndoLabel,
    UndoRecord,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! Canonical in-memory grocery state and its persistence loop.
//!
//! # Responsibility
//! - Own every entity collection and mediate all mutations.
//! - Keep a single-level undo snapshot.
//! - Choose the storage backend once, at initialization, and write a full
//!   snapshot to it after every commit.
//! - Notify subscribers about commits, undo, imports and write failures.
//!
//! # Invariants
//! - A failed mutation leaves state, undo slot and storage untouched.
//! - Memory is never rolled back because a storage write failed.
//! - Lists are always held in display order.
//! - Preferences are persisted on their own key and are never undone.

use log::{debug, error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{DataDir, StoreConfig};
use crate::domain::history::build_history_suggestions;
use crate::domain::import::{parse_import_json, validate_imported_data, ImportError, ValidatedImport};
use crate::domain::sort::{sort_items, sort_lists, SortOptions};
use crate::model::catalog::{Category, StoreProfile};
use crate::model::history::ItemHistoryEntry;
use crate::model::item::Item;
use crate::model::list::List;
use crate::model::now_epoch_ms;
use crate::model::preferences::Preferences;
use crate::model::snapshot::{Snapshot, SNAPSHOT_VERSION};
use crate::repo::kv::KeyValueStore;
use crate::repo::{with_storage, SharedStorage, StorageError};

/// Key-value slot holding serialized preferences.
pub const PREFERENCES_KEY: &str = "grocery-preferences";

/// Advisory shown while running on the fallback backend.
pub const FALLBACK_ADVISORY: &str = "Using limited storage. Primary database unavailable.";

const PRIMARY_LOADER_THREAD: &str = "grocery-primary-load";

/// Store lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Constructed, `init` not yet run.
    Idle,
    Ready,
}

/// Backend selected during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Primary,
    Fallback,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Human-readable name of an undoable mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoLabel {
    CreatedList,
    RenamedList,
    ReorderedLists,
    DeletedList,
    AddedItem,
    UpdatedItem,
    DeletedItem,
    ToggledPurchase,
    ReorderedItems,
    ClearedPurchased,
    ChangedSortMode,
    ReorderedCategories,
    RenamedCategory,
    ResetCategories,
    UpdatedFavorite,
    ImportedData,
}

impl UndoLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedList => "Created list",
            Self::RenamedList => "Renamed list",
            Self::ReorderedLists => "Reordered lists",
            Self::DeletedList => "Deleted list",
            Self::AddedItem => "Added item",
            Self::UpdatedItem => "Updated item",
            Self::DeletedItem => "Deleted item",
            Self::ToggledPurchase => "Toggled purchase",
            Self::ReorderedItems => "Reordered items",
            Self::ClearedPurchased => "Cleared purchased",
            Self::ChangedSortMode => "Changed sort mode",
            Self::ReorderedCategories => "Reordered categories",
            Self::RenamedCategory => "Renamed category",
            Self::ResetCategories => "Reset categories",
            Self::UpdatedFavorite => "Updated favorite",
            Self::ImportedData => "Imported data",
        }
    }

    /// Whether callers usually ask for confirmation before this mutation.
    pub fn is_destructive(self) -> bool {
        matches!(
            self,
            Self::DeletedList
                | Self::DeletedItem
                | Self::ClearedPurchased
                | Self::ResetCategories
                | Self::ImportedData
        )
    }
}

impl Display for UndoLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State captured just before the last mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoRecord {
    pub label: UndoLabel,
    pub snapshot: Snapshot,
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Initialized { mode: StorageMode },
    Changed { label: UndoLabel },
    Undone { label: UndoLabel },
    ImportRejected,
    PersistFailed { message: String },
    PreferencesChanged,
}

/// Handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&StoreEvent) + Send>;

/// Store operation failure. The state is unchanged whenever one is returned.
#[derive(Debug)]
pub enum StoreError {
    ListNotFound(String),
    ItemNotFound(String),
    CategoryNotFound(String),
    HistoryEntryNotFound(String),
    /// No list was given and none is active.
    NoActiveList,
    Import(ImportError),
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListNotFound(id) => write!(f, "list not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::HistoryEntryNotFound(id) => write!(f, "history entry not found: {id}"),
            Self::NoActiveList => write!(f, "no active list"),
            Self::Import(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "export serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Import(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ImportError> for StoreError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// Owned grocery state plus the storage it is mirrored to.
pub struct GroceryStore {
    pub(super) config: StoreConfig,
    status: StoreStatus,
    storage_mode: StorageMode,
    pub(super) data: Snapshot,
    preferences: Preferences,
    last_undo: Option<UndoRecord>,
    error: Option<String>,
    persist_error: Option<String>,
    primary: SharedStorage,
    fallback: SharedStorage,
    active: SharedStorage,
    preferences_kv: Box<dyn KeyValueStore>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl GroceryStore {
    /// Creates an idle store and loads preferences from `preferences_kv`.
    ///
    /// Entity collections stay at the empty default until `init` runs.
    pub fn new(
        primary: SharedStorage,
        fallback: SharedStorage,
        preferences_kv: impl KeyValueStore + 'static,
        config: StoreConfig,
    ) -> Self {
        let preferences = load_preferences(&preferences_kv);
        Self {
            config,
            status: StoreStatus::Idle,
            storage_mode: StorageMode::Primary,
            data: Snapshot::empty(),
            preferences,
            last_undo: None,
            error: None,
            persist_error: None,
            active: Arc::clone(&primary),
            primary,
            fallback,
            preferences_kv: Box::new(preferences_kv),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Creates an idle store over the backends of one data directory.
    pub fn from_data_dir(data_dir: DataDir, config: StoreConfig) -> Self {
        Self::new(data_dir.primary, data_dir.fallback, data_dir.kv, config)
    }

    /// Loads state, preferring the primary backend.
    ///
    /// The primary load runs on its own thread and is abandoned once
    /// `init_timeout` elapses; the store then continues on the fallback
    /// backend. Never fails and always leaves the store `Ready`.
    pub fn init(&mut self) {
        let started_at = Instant::now();
        match load_primary(&self.primary, self.config.init_timeout) {
            Ok(loaded) => {
                let snapshot = loaded.unwrap_or_else(Snapshot::empty);
                self.active = Arc::clone(&self.primary);
                self.apply_loaded(snapshot, StorageMode::Primary, None);
            }
            Err(reason) => {
                warn!(
                    "event=store_init module=store status=fallback reason={}",
                    reason.replace(char::is_whitespace, "_")
                );
                let snapshot = load_fallback(&self.fallback);
                self.active = Arc::clone(&self.fallback);
                self.apply_loaded(
                    snapshot,
                    StorageMode::Fallback,
                    Some(FALLBACK_ADVISORY.to_string()),
                );
            }
        }

        info!(
            "event=store_init module=store status=ok mode={} duration_ms={} lists={} items={}",
            self.storage_mode.as_str(),
            started_at.elapsed().as_millis(),
            self.data.lists.len(),
            self.data.items.len()
        );
        self.emit(StoreEvent::Initialized {
            mode: self.storage_mode,
        });
    }

    fn apply_loaded(&mut self, mut snapshot: Snapshot, mode: StorageMode, error: Option<String>) {
        snapshot.ensure_categories();
        sort_lists(&mut snapshot.lists);
        self.data = snapshot;
        self.storage_mode = mode;
        self.status = StoreStatus::Ready;
        self.error = error;
    }

    pub fn status(&self) -> StoreStatus {
        self.status
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.storage_mode
    }

    /// Advisory set when running on the fallback backend.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Message of the most recent failed write, cleared by the next success.
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub fn last_undo(&self) -> Option<&UndoRecord> {
        self.last_undo.as_ref()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Lists in display order.
    pub fn lists(&self) -> &[List] {
        &self.data.lists
    }

    pub fn items(&self) -> &[Item] {
        &self.data.items
    }

    pub fn categories(&self) -> &[Category] {
        &self.data.categories
    }

    pub fn item_history(&self) -> &[ItemHistoryEntry] {
        &self.data.item_history
    }

    pub fn store_profiles(&self) -> &[StoreProfile] {
        &self.data.store_profiles
    }

    pub fn list(&self, list_id: &str) -> Option<&List> {
        self.data.lists.iter().find(|list| list.id == list_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.data.items.iter().find(|item| item.id == item_id)
    }

    pub fn active_list(&self) -> Option<&List> {
        self.preferences
            .active_list_id
            .as_deref()
            .and_then(|list_id| self.list(list_id))
    }

    /// Items of one list in storage order.
    pub fn items_for_list(&self, list_id: &str) -> Vec<&Item> {
        self.data
            .items
            .iter()
            .filter(|item| item.list_id == list_id)
            .collect()
    }

    /// Items of one list in display order, filtered by the list's search
    /// query.
    pub fn sorted_items(&self, list_id: &str) -> Vec<&Item> {
        let Some(list) = self.list(list_id) else {
            return Vec::new();
        };
        let query = self.preferences.search_query(list_id).trim().to_lowercase();
        let options = SortOptions {
            sort_mode: list.sort_mode,
            category_order: &list.category_order,
            move_purchased_to_bottom: self.preferences.move_purchased_to_bottom(list_id),
        };

        let visible = self.data.items.iter().filter(|item| {
            item.list_id == list_id
                && (query.is_empty()
                    || item.name.contains(&query)
                    || item.name_original.to_lowercase().contains(&query))
        });
        sort_items(visible, &options)
    }

    pub fn purchased_count(&self, list_id: &str) -> usize {
        self.data
            .items
            .iter()
            .filter(|item| item.list_id == list_id && item.is_purchased)
            .count()
    }

    pub fn history_suggestions(&self, query: &str, limit: usize) -> Vec<&ItemHistoryEntry> {
        build_history_suggestions(query, &self.data.item_history, limit)
    }

    /// Registers `callback` for every subsequent event.
    pub fn subscribe(&mut self, callback: impl FnMut(&StoreEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscription, _)| *subscription != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: StoreEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(&event);
        }
    }

    /// Applies one undoable mutation.
    ///
    /// On error the pre-mutation state is restored and nothing is recorded,
    /// broadcast or written.
    pub(super) fn commit<T>(
        &mut self,
        label: UndoLabel,
        mutate: impl FnOnce(&mut Snapshot) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let before = self.data.clone();
        let value = match mutate(&mut self.data) {
            Ok(value) => value,
            Err(err) => {
                self.data = before;
                debug!(
                    "event=store_mutation module=store status=rejected label={:?} error={err}",
                    label.as_str()
                );
                return Err(err);
            }
        };
        sort_lists(&mut self.data.lists);
        self.last_undo = Some(UndoRecord {
            label,
            snapshot: before,
        });

        debug!(
            "event=store_mutation module=store status=ok label={:?} lists={} items={}",
            label.as_str(),
            self.data.lists.len(),
            self.data.items.len()
        );
        self.emit(StoreEvent::Changed { label });
        self.persist();
        Ok(value)
    }

    fn persist(&mut self) {
        let result = with_storage(&self.active, |storage| {
            storage.save_all(&self.data)?;
            Ok(storage.name())
        });
        match result {
            Ok(backend) => {
                debug!("event=store_persist module=store status=ok backend={backend}");
                self.persist_error = None;
            }
            Err(err) => self.record_persist_failure("snapshot", &err),
        }
    }

    fn record_persist_failure(&mut self, target: &str, err: &StorageError) {
        error!(
            "event=store_persist module=store status=error target={target} mode={} error={err}",
            self.storage_mode.as_str()
        );
        let message = err.to_string();
        self.persist_error = Some(message.clone());
        self.emit(StoreEvent::PersistFailed { message });
    }

    /// Restores the state captured before the last mutation.
    ///
    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(UndoRecord { label, snapshot }) = self.last_undo.take() else {
            return false;
        };
        self.data = snapshot;
        sort_lists(&mut self.data.lists);

        info!(
            "event=store_undo module=store status=ok label={:?}",
            label.as_str()
        );
        self.emit(StoreEvent::Undone { label });
        self.persist();
        true
    }

    /// Discards the undo slot without touching any collection.
    pub fn clear_undo(&mut self) {
        self.last_undo = None;
    }

    /// Current state as an export payload. No side effects.
    pub fn export_data(&self) -> Snapshot {
        let mut snapshot = self.data.clone();
        snapshot.version = SNAPSHOT_VERSION;
        snapshot.exported_at = now_epoch_ms();
        snapshot
    }

    /// `export_data` as pretty-printed JSON.
    pub fn export_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.export_data()).map_err(StoreError::Serialization)
    }

    /// Replaces every collection with a validated payload.
    ///
    /// Returns the validator's warnings about skipped records.
    ///
    /// # Errors
    /// - `StoreError::Import` when validation rejects the payload; nothing
    ///   changes and `ImportRejected` is broadcast.
    pub fn import_data(&mut self, payload: &Value) -> Result<Vec<String>, StoreError> {
        match validate_imported_data(payload) {
            Ok(validated) => self.apply_import(validated),
            Err(err) => Err(self.reject_import(err)),
        }
    }

    /// Parses JSON text, then behaves like `import_data`.
    pub fn import_json(&mut self, text: &str) -> Result<Vec<String>, StoreError> {
        match parse_import_json(text) {
            Ok(validated) => self.apply_import(validated),
            Err(err) => Err(self.reject_import(err)),
        }
    }

    fn reject_import(&mut self, err: ImportError) -> StoreError {
        warn!(
            "event=store_import module=store status=rejected errors={}",
            err.errors().len()
        );
        self.emit(StoreEvent::ImportRejected);
        StoreError::Import(err)
    }

    fn apply_import(&mut self, validated: ValidatedImport) -> Result<Vec<String>, StoreError> {
        let ValidatedImport {
            mut snapshot,
            warnings,
        } = validated;
        snapshot.ensure_categories();

        self.commit(UndoLabel::ImportedData, move |data| {
            *data = snapshot;
            Ok(())
        })?;

        let active_missing = self
            .preferences
            .active_list_id
            .as_deref()
            .is_some_and(|list_id| self.list(list_id).is_none());
        if active_missing {
            let first = self.data.lists.first().map(|list| list.id.clone());
            self.update_preferences(|preferences| preferences.active_list_id = first);
        }

        info!(
            "event=store_import module=store status=ok lists={} items={} warnings={}",
            self.data.lists.len(),
            self.data.items.len(),
            warnings.len()
        );
        Ok(warnings)
    }

    /// Applies a preference change and writes preferences to their slot.
    pub(super) fn update_preferences(&mut self, update: impl FnOnce(&mut Preferences)) {
        update(&mut self.preferences);
        let result = serde_json::to_string(&self.preferences)
            .map_err(StorageError::from)
            .and_then(|json| self.preferences_kv.set(PREFERENCES_KEY, &json));
        if let Err(err) = result {
            self.record_persist_failure("preferences", &err);
        }
        self.emit(StoreEvent::PreferencesChanged);
    }
}

fn load_primary(storage: &SharedStorage, timeout: Duration) -> Result<Option<Snapshot>, String> {
    let (sender, receiver) = mpsc::channel();
    let worker_storage = Arc::clone(storage);
    thread::Builder::new()
        .name(PRIMARY_LOADER_THREAD.to_string())
        .spawn(move || {
            let loaded = with_storage(&worker_storage, |storage| storage.load_all());
            // The store stops listening after a timeout; a late result is dropped.
            let _ = sender.send(loaded);
        })
        .map_err(|err| format!("failed to spawn primary loader: {err}"))?;

    match receiver.recv_timeout(timeout) {
        Ok(Ok(snapshot)) => Ok(snapshot),
        Ok(Err(err)) => Err(err.to_string()),
        Err(RecvTimeoutError::Timeout) => Err(format!(
            "primary load timed out after {} ms",
            timeout.as_millis()
        )),
        Err(RecvTimeoutError::Disconnected) => {
            Err("primary loader stopped without a result".to_string())
        }
    }
}

fn load_fallback(storage: &SharedStorage) -> Snapshot {
    let loaded = with_storage(storage, |storage| Ok((storage.name(), storage.load_all())));
    match loaded {
        Ok((_, Ok(Some(snapshot)))) => snapshot,
        Ok((_, Ok(None))) => Snapshot::empty(),
        Ok((backend, Err(err))) => {
            warn!("event=storage_load module=store backend={backend} status=error error={err}");
            Snapshot::empty()
        }
        Err(err) => {
            warn!("event=storage_load module=store backend=fallback status=error error={err}");
            Snapshot::empty()
        }
    }
}

fn load_preferences(kv: &dyn KeyValueStore) -> Preferences {
    match kv.get(PREFERENCES_KEY) {
        Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
            warn!("event=preferences_load module=store status=error error={err}");
            Preferences::default()
        }),
        Ok(None) => Preferences::default(),
        Err(err) => {
            warn!("event=preferences_load module=store status=error error={err}");
            Preferences::default()
        }
    }
}

/// Converts a slice index into a stored position.
pub(super) fn position_of(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

pub(super) fn find_list_mut<'a>(lists: &'a mut [List], list_id: &str) -> Result<&'a mut List, StoreError> {
    lists
        .iter_mut()
        .find(|list| list.id == list_id)
        .ok_or_else(|| StoreError::ListNotFound(list_id.to_string()))
}

pub(super) fn ensure_list(lists: &[List], list_id: &str) -> Result<(), StoreError> {
    if lists.iter().any(|list| list.id == list_id) {
        Ok(())
    } else {
        Err(StoreError::ListNotFound(list_id.to_string()))
    }
}

/// Bumps `updated_at` of the owning list, if it still exists.
pub(super) fn touch_list(lists: &mut [List], list_id: &str, now: i64) {
    if let Some(list) = lists.iter_mut().find(|list| list.id == list_id) {
        list.updated_at = now;
    }
}

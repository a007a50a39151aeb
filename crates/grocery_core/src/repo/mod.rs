//! Storage adapters for full-snapshot persistence.
//!
//! # Responsibility
//! - Define the load-all/save-all contract shared by every backend.
//! - Keep SQL, file and JSON details out of the store.
//!
//! # Invariants
//! - Adapters never mutate a snapshot; they only serialize and deserialize.
//! - `save_all` replaces the whole persisted state atomically or not at all.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

use crate::db::DbError;
use crate::model::snapshot::Snapshot;

pub mod fallback_storage;
pub mod kv;
pub mod sqlite_storage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage adapters and key-value stores.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// Persisted rows cannot be converted back into model records.
    InvalidData(String),
    /// A previous holder of the adapter lock panicked.
    Poisoned(&'static str),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o error: {err}"),
            Self::Serialization(err) => write!(f, "snapshot serialization failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Poisoned(name) => write!(f, "storage `{name}` is poisoned"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::InvalidData(_) | Self::Poisoned(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Backend able to load and save a complete snapshot.
pub trait SnapshotStorage: Send {
    /// Short stable name used in log events.
    fn name(&self) -> &'static str;

    /// Loads everything. `Ok(None)` means the backend holds no data yet.
    fn load_all(&mut self) -> StorageResult<Option<Snapshot>>;

    /// Replaces everything with `snapshot`.
    fn save_all(&mut self, snapshot: &Snapshot) -> StorageResult<()>;
}

/// Adapter handle shareable with the initialization worker thread.
pub type SharedStorage = Arc<Mutex<Box<dyn SnapshotStorage>>>;

/// Wraps an adapter into a `SharedStorage` handle.
pub fn share_storage(storage: impl SnapshotStorage + 'static) -> SharedStorage {
    Arc::new(Mutex::new(Box::new(storage)))
}

/// Runs `f` with exclusive access to a shared adapter.
pub fn with_storage<T>(
    storage: &SharedStorage,
    f: impl FnOnce(&mut dyn SnapshotStorage) -> StorageResult<T>,
) -> StorageResult<T> {
    let mut guard = storage
        .lock()
        .map_err(|_| StorageError::Poisoned("snapshot storage"))?;
    f(&mut **guard)
}

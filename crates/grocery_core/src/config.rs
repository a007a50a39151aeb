//! Runtime configuration for the grocery store.
//!
//! # Responsibility
//! - Carry store tunables (initialization timeout, quick-add parse mode).
//! - Resolve the on-disk layout of one data directory.
//!
//! # Invariants
//! - Data directories are absolute; relative paths are rejected rather than
//!   resolved against the process working directory.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::parse::ParseMode;
use crate::repo::fallback_storage::FallbackSnapshotStorage;
use crate::repo::kv::DirKeyValueStore;
use crate::repo::sqlite_storage::SqliteSnapshotStorage;
use crate::repo::{share_storage, SharedStorage, StorageError};

/// How long initialization waits for the primary backend.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(3);

const DATABASE_FILE_NAME: &str = "grocery.sqlite3";
const KV_DIR_NAME: &str = "kv";

/// Store tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub init_timeout: Duration,
    pub parse_mode: ParseMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            init_timeout: DEFAULT_INIT_TIMEOUT,
            parse_mode: ParseMode::Verbatim,
        }
    }
}

impl StoreConfig {
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }
}

/// Configuration failure.
#[derive(Debug)]
pub enum ConfigError {
    /// The data directory path is empty or relative.
    InvalidDataDir(String),
    /// The data directory layout could not be created.
    Storage(StorageError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDataDir(message) => write!(f, "invalid data directory: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::InvalidDataDir(_) => None,
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Resolved file layout under one data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirConfig {
    pub root: PathBuf,
    pub database_path: PathBuf,
    pub kv_dir: PathBuf,
}

impl DataDirConfig {
    /// Resolves the layout without touching the filesystem.
    ///
    /// # Errors
    /// - `InvalidDataDir` when `root` is empty or not absolute.
    pub fn resolve(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let text = root.to_string_lossy();
        if text.trim().is_empty() {
            return Err(ConfigError::InvalidDataDir(
                "data directory cannot be empty".to_string(),
            ));
        }
        if !root.is_absolute() {
            return Err(ConfigError::InvalidDataDir(format!(
                "data directory must be an absolute path, got `{text}`"
            )));
        }

        Ok(Self {
            root: root.to_path_buf(),
            database_path: root.join(DATABASE_FILE_NAME),
            kv_dir: root.join(KV_DIR_NAME),
        })
    }
}

/// Storage handles for one data directory.
pub struct DataDir {
    pub config: DataDirConfig,
    /// Structured backend. The database file opens on first load.
    pub primary: SharedStorage,
    /// Flat JSON backend sharing the key-value directory.
    pub fallback: SharedStorage,
    /// Key-value store for preferences.
    pub kv: DirKeyValueStore,
}

/// Resolves `root`, creates the key-value directory, and builds both
/// storage backends.
///
/// # Errors
/// - `InvalidDataDir` for empty or relative paths.
/// - `Storage` when the key-value directory cannot be created.
pub fn open_data_dir(root: impl AsRef<Path>) -> Result<DataDir, ConfigError> {
    let config = DataDirConfig::resolve(root)?;
    let kv = DirKeyValueStore::open(&config.kv_dir)?;

    Ok(DataDir {
        primary: share_storage(SqliteSnapshotStorage::deferred(config.database_path.clone())),
        fallback: share_storage(FallbackSnapshotStorage::new(kv.clone())),
        kv,
        config,
    })
}

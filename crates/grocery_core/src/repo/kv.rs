//! Simple key-value slots for the fallback snapshot and preferences.
//!
//! # Invariants
//! - Keys are restricted to `[A-Za-z0-9_-]` so they map safely to file names.
//! - `set` replaces the whole value; readers never see a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{StorageError, StorageResult};

/// String slots addressed by key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
}

/// In-process store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    slots: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slots<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> StorageResult<T> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StorageError::Poisoned("memory key-value store"))?;
        Ok(f(&mut slots))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        self.with_slots(|slots| slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.with_slots(|slots| {
            slots.insert(key.to_string(), value.to_string());
        })
    }
}

/// Directory-backed store: one `<key>.json` file per slot.
#[derive(Debug, Clone)]
pub struct DirKeyValueStore {
    dir: PathBuf,
}

impl DirKeyValueStore {
    /// Uses `dir`, creating it when missing.
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slot_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for DirKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.slot_path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.slot_path(key)?;
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidData(format!(
            "invalid key-value slot name `{key}`"
        )))
    }
}

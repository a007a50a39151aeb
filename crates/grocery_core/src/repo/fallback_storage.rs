//! Flat fallback backend: the whole snapshot as one JSON string.
//!
//! # Invariants
//! - A missing or unparseable slot loads as "no data", never as an error.

use log::{info, warn};

use super::kv::KeyValueStore;
use super::{SnapshotStorage, StorageResult};
use crate::model::snapshot::Snapshot;

/// Slot holding the serialized fallback snapshot.
pub const FALLBACK_SNAPSHOT_KEY: &str = "grocery-fallback-data";

/// Snapshot storage over a single key-value slot.
pub struct FallbackSnapshotStorage<K: KeyValueStore> {
    kv: K,
    key: &'static str,
}

impl<K: KeyValueStore> FallbackSnapshotStorage<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            key: FALLBACK_SNAPSHOT_KEY,
        }
    }
}

impl<K: KeyValueStore> SnapshotStorage for FallbackSnapshotStorage<K> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn load_all(&mut self) -> StorageResult<Option<Snapshot>> {
        let Some(raw) = self.kv.get(self.key)? else {
            info!("event=storage_load module=storage backend=fallback status=empty");
            return Ok(None);
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) => {
                warn!(
                    "event=storage_load module=storage backend=fallback status=unreadable bytes={} error={err}",
                    raw.len()
                );
                Ok(None)
            }
        }
    }

    fn save_all(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.kv.set(self.key, &raw)
    }
}

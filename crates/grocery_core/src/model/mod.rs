//! Grocery domain model.
//!
//! # Responsibility
//! - Define the records persisted, exported and undone as one snapshot.
//! - Keep JSON field naming compatible with exported backup files.
//!
//! # Invariants
//! - Every record is identified by an opaque string id.
//! - Timestamps are Unix epoch milliseconds.

pub mod catalog;
pub mod history;
pub mod item;
pub mod list;
pub mod preferences;
pub mod snapshot;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in epoch milliseconds.
///
/// Clocks set before the Unix epoch report `0` instead of failing.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Generates a fresh opaque record id.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//! Grocery store service.
//!
//! # Responsibility
//! - Expose every list, item, catalog, history and data operation on one
//!   owned `GroceryStore`.
//! - Keep callers decoupled from storage backends and their failure modes.

mod catalog;
mod items;
mod lists;
mod preferences;
pub mod store;

pub use store::{
    GroceryStore, StorageMode, StoreError, StoreEvent, StoreStatus, SubscriptionId, UndoLabel,
    UndoRecord, FALLBACK_ADVISORY, PREFERENCES_KEY,
};

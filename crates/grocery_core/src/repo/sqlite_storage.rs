//! Structured primary backend: one SQLite table per snapshot collection.
//!
//! # Responsibility
//! - Read every table into a snapshot.
//! - Replace every table from a snapshot inside one transaction.
//!
//! # Invariants
//! - Saves are all-or-nothing across the five tables.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - An empty category table is reseeded with the default catalog on load.

use log::{error, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::{SnapshotStorage, StorageError, StorageResult};
use crate::db::migrations::{verify_snapshot_tables, SNAPSHOT_TABLES};
use crate::db::{open_db, open_db_in_memory};
use crate::model::catalog::{Category, StoreProfile};
use crate::model::history::ItemHistoryEntry;
use crate::model::item::Item;
use crate::model::list::{List, SortMode};
use crate::model::now_epoch_ms;
use crate::model::snapshot::{Snapshot, SNAPSHOT_VERSION};

/// SQLite-backed snapshot storage.
pub struct SqliteSnapshotStorage {
    conn: Option<Connection>,
    path: Option<PathBuf>,
}

impl SqliteSnapshotStorage {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `Db(DbError::MissingTable)` when a snapshot table is missing.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        verify_snapshot_tables(&conn)?;
        Ok(Self {
            conn: Some(conn),
            path: None,
        })
    }

    /// Opens (or creates) the database file at `path` immediately.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Defers opening `path` until the first load or save.
    ///
    /// Open and migration failures then surface from `load_all`, on whichever
    /// thread performs the load.
    pub fn deferred(path: impl Into<PathBuf>) -> Self {
        Self {
            conn: None,
            path: Some(path.into()),
        }
    }

    fn connection(&mut self) -> StorageResult<&mut Connection> {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => {
                let path = self.path.as_ref().ok_or_else(|| {
                    StorageError::InvalidData("no database path configured".to_string())
                })?;
                open_db(path)?
            }
        };
        Ok(self.conn.insert(conn))
    }
}

impl SnapshotStorage for SqliteSnapshotStorage {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn load_all(&mut self) -> StorageResult<Option<Snapshot>> {
        let started_at = Instant::now();
        let loaded = self.connection().and_then(|conn| {
            let mut snapshot = read_snapshot(conn)?;
            if snapshot.ensure_categories() {
                replace_all(conn, &snapshot)?;
            }
            Ok(snapshot)
        });

        match loaded {
            Ok(snapshot) => {
                info!(
                    "event=storage_load module=storage backend=sqlite status=ok duration_ms={} lists={} items={}",
                    started_at.elapsed().as_millis(),
                    snapshot.lists.len(),
                    snapshot.items.len()
                );
                Ok(Some(snapshot))
            }
            Err(err) => {
                error!(
                    "event=storage_load module=storage backend=sqlite status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn save_all(&mut self, snapshot: &Snapshot) -> StorageResult<()> {
        let started_at = Instant::now();
        let result = self
            .connection()
            .and_then(|conn| replace_all(conn, snapshot));
        match &result {
            Ok(()) => info!(
                "event=storage_save module=storage backend=sqlite status=ok duration_ms={} records={}",
                started_at.elapsed().as_millis(),
                snapshot.record_count()
            ),
            Err(err) => error!(
                "event=storage_save module=storage backend=sqlite status=error duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            ),
        }
        result
    }
}

fn read_snapshot(conn: &Connection) -> StorageResult<Snapshot> {
    Ok(Snapshot {
        version: SNAPSHOT_VERSION,
        exported_at: now_epoch_ms(),
        lists: read_rows(conn, "SELECT * FROM lists ORDER BY rowid", parse_list_row)?,
        items: read_rows(conn, "SELECT * FROM items ORDER BY rowid", parse_item_row)?,
        categories: read_rows(
            conn,
            "SELECT * FROM categories ORDER BY default_order, rowid",
            parse_category_row,
        )?,
        item_history: read_rows(
            conn,
            "SELECT * FROM item_history ORDER BY rowid",
            parse_history_row,
        )?,
        store_profiles: read_rows(
            conn,
            "SELECT * FROM store_profiles ORDER BY rowid",
            parse_store_profile_row,
        )?,
    })
}

fn replace_all(conn: &mut Connection, snapshot: &Snapshot) -> StorageResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for table in SNAPSHOT_TABLES {
        tx.execute(&format!("DELETE FROM {table};"), [])?;
    }
    insert_lists(&tx, &snapshot.lists)?;
    insert_items(&tx, &snapshot.items)?;
    insert_categories(&tx, &snapshot.categories)?;
    insert_history(&tx, &snapshot.item_history)?;
    insert_store_profiles(&tx, &snapshot.store_profiles)?;
    tx.commit()?;
    Ok(())
}

fn read_rows<T>(
    conn: &Connection,
    sql: &str,
    parse: fn(&Row<'_>) -> StorageResult<T>,
) -> StorageResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse(row)?);
    }
    Ok(records)
}

fn insert_lists(tx: &Transaction<'_>, lists: &[List]) -> StorageResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO lists (
            id, name, created_at, updated_at, sort_mode, category_order, store_profile_id, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
    )?;
    for list in lists {
        stmt.execute(params![
            list.id,
            list.name,
            list.created_at,
            list.updated_at,
            list.sort_mode.as_str(),
            to_json(&list.category_order)?,
            list.store_profile_id,
            list.position,
        ])?;
    }
    Ok(())
}

fn insert_items(tx: &Transaction<'_>, items: &[Item]) -> StorageResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO items (
            id, list_id, name, name_original, quantity, unit, category_id, notes,
            is_purchased, position, created_at, updated_at, purchased_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
    )?;
    for item in items {
        stmt.execute(params![
            item.id,
            item.list_id,
            item.name,
            item.name_original,
            item.quantity,
            item.unit,
            item.category_id,
            item.notes,
            bool_to_int(item.is_purchased),
            item.position,
            item.created_at,
            item.updated_at,
            item.purchased_at,
        ])?;
    }
    Ok(())
}

fn insert_categories(tx: &Transaction<'_>, categories: &[Category]) -> StorageResult<()> {
    let mut stmt =
        tx.prepare("INSERT INTO categories (id, name, default_order) VALUES (?1, ?2, ?3);")?;
    for category in categories {
        stmt.execute(params![category.id, category.name, category.default_order])?;
    }
    Ok(())
}

fn insert_history(tx: &Transaction<'_>, history: &[ItemHistoryEntry]) -> StorageResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO item_history (
            id, name_canonical, last_used_at, times_used, default_category_id, is_favorite
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    for entry in history {
        stmt.execute(params![
            entry.id,
            entry.name_canonical,
            entry.last_used_at,
            entry.times_used,
            entry.default_category_id,
            bool_to_int(entry.is_favorite),
        ])?;
    }
    Ok(())
}

fn insert_store_profiles(tx: &Transaction<'_>, profiles: &[StoreProfile]) -> StorageResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO store_profiles (id, name, aisle_order, per_store_category_aliases)
         VALUES (?1, ?2, ?3, ?4);",
    )?;
    for profile in profiles {
        let aliases = profile
            .per_store_category_aliases
            .as_ref()
            .map(to_json)
            .transpose()?;
        stmt.execute(params![
            profile.id,
            profile.name,
            to_json(&profile.aisle_order)?,
            aliases,
        ])?;
    }
    Ok(())
}

fn parse_list_row(row: &Row<'_>) -> StorageResult<List> {
    let sort_mode_text: String = row.get("sort_mode")?;
    let sort_mode = SortMode::parse(&sort_mode_text).ok_or_else(|| {
        StorageError::InvalidData(format!("invalid sort mode `{sort_mode_text}` in lists.sort_mode"))
    })?;

    Ok(List {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        sort_mode,
        category_order: from_json_column(row, "lists", "category_order")?,
        store_profile_id: row.get("store_profile_id")?,
        position: row.get("position")?,
    })
}

fn parse_item_row(row: &Row<'_>) -> StorageResult<Item> {
    Ok(Item {
        id: row.get("id")?,
        list_id: row.get("list_id")?,
        name: row.get("name")?,
        name_original: row.get("name_original")?,
        quantity: row.get("quantity")?,
        unit: row.get("unit")?,
        category_id: row.get("category_id")?,
        notes: row.get("notes")?,
        is_purchased: int_to_bool(row.get("is_purchased")?, "items.is_purchased")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        purchased_at: row.get("purchased_at")?,
    })
}

fn parse_category_row(row: &Row<'_>) -> StorageResult<Category> {
    Ok(Category {
        id: row.get("id")?,
        name: row.get("name")?,
        default_order: row.get("default_order")?,
    })
}

fn parse_history_row(row: &Row<'_>) -> StorageResult<ItemHistoryEntry> {
    Ok(ItemHistoryEntry {
        id: row.get("id")?,
        name_canonical: row.get("name_canonical")?,
        last_used_at: row.get("last_used_at")?,
        times_used: row.get("times_used")?,
        default_category_id: row.get("default_category_id")?,
        is_favorite: int_to_bool(row.get("is_favorite")?, "item_history.is_favorite")?,
    })
}

fn parse_store_profile_row(row: &Row<'_>) -> StorageResult<StoreProfile> {
    let aliases: Option<String> = row.get("per_store_category_aliases")?;
    let per_store_category_aliases = match aliases {
        Some(text) => Some(serde_json::from_str(&text).map_err(|_| {
            StorageError::InvalidData(
                "invalid JSON in store_profiles.per_store_category_aliases".to_string(),
            )
        })?),
        None => None,
    };

    Ok(StoreProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        aisle_order: from_json_column(row, "store_profiles", "aisle_order")?,
        per_store_category_aliases,
    })
}

fn from_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    table: &str,
    column: &str,
) -> StorageResult<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text)
        .map_err(|_| StorageError::InvalidData(format!("invalid JSON in {table}.{column}")))
}

fn to_json<T: Serialize>(value: &T) -> StorageResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn int_to_bool(value: i64, column: &str) -> StorageResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}

#[cfg(test)]
mod tests {
    use super::SqliteSnapshotStorage;
    use crate::db::{open_db_in_memory, DbError};
    use crate::model::catalog::{default_categories, StoreProfile};
    use crate::model::history::ItemHistoryEntry;
    use crate::model::item::Item;
    use crate::model::list::{List, SortMode};
    use crate::model::snapshot::Snapshot;
    use crate::repo::{SnapshotStorage, StorageError};
    use std::collections::BTreeMap;

    fn populated_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::empty();
        let mut list = List::new("Weekly", 0);
        list.sort_mode = SortMode::Manual;
        list.store_profile_id = Some("corner-shop".to_string());
        let item = Item {
            id: "item-1".to_string(),
            list_id: list.id.clone(),
            name: "milk".to_string(),
            name_original: "Milk".to_string(),
            quantity: Some(2.0),
            unit: Some("ct".to_string()),
            category_id: Some("dairy".to_string()),
            notes: Some("semi-skimmed".to_string()),
            is_purchased: true,
            position: Some(0),
            created_at: 10,
            updated_at: 20,
            purchased_at: Some(20),
        };
        let mut history = ItemHistoryEntry::first_use("milk", Some("dairy".to_string()), 20);
        history.is_favorite = true;

        snapshot.lists.push(list);
        snapshot.items.push(item);
        snapshot.item_history.push(history);
        snapshot.store_profiles.push(StoreProfile {
            id: "corner-shop".to_string(),
            name: "Corner shop".to_string(),
            aisle_order: vec!["bakery".to_string(), "dairy".to_string()],
            per_store_category_aliases: Some(BTreeMap::from([(
                "dairy".to_string(),
                "Fridge".to_string(),
            )])),
        });
        snapshot
    }

    #[test]
    fn fresh_database_loads_with_seeded_catalog() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let loaded = storage.load_all().unwrap().unwrap();

        assert!(loaded.lists.is_empty());
        assert_eq!(loaded.categories, default_categories());

        let count: i64 = storage
            .connection()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn save_then_load_preserves_every_collection() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let snapshot = populated_snapshot();
        storage.save_all(&snapshot).unwrap();

        let loaded = storage.load_all().unwrap().unwrap();
        assert_eq!(loaded.lists, snapshot.lists);
        assert_eq!(loaded.items, snapshot.items);
        assert_eq!(loaded.categories, snapshot.categories);
        assert_eq!(loaded.item_history, snapshot.item_history);
        assert_eq!(loaded.store_profiles, snapshot.store_profiles);
    }

    #[test]
    fn save_drops_records_missing_from_the_new_snapshot() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let mut snapshot = populated_snapshot();
        storage.save_all(&snapshot).unwrap();

        snapshot.items.clear();
        snapshot.store_profiles.clear();
        storage.save_all(&snapshot).unwrap();

        let loaded = storage.load_all().unwrap().unwrap();
        assert!(loaded.items.is_empty());
        assert!(loaded.store_profiles.is_empty());
        assert_eq!(loaded.lists.len(), 1);
    }

    #[test]
    fn failed_save_keeps_previous_state() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        let snapshot = populated_snapshot();
        storage.save_all(&snapshot).unwrap();

        let mut duplicated = snapshot.clone();
        duplicated.items.push(duplicated.items[0].clone());
        assert!(storage.save_all(&duplicated).is_err());

        let loaded = storage.load_all().unwrap().unwrap();
        assert_eq!(loaded.items, snapshot.items);
    }

    #[test]
    fn corrupt_json_column_is_reported() {
        let mut storage = SqliteSnapshotStorage::open_in_memory().unwrap();
        storage
            .connection()
            .unwrap()
            .execute(
                "INSERT INTO lists (id, name, created_at, updated_at, sort_mode, category_order)
                 VALUES ('l1', 'Broken', 1, 1, 'category', 'not json');",
                [],
            )
            .unwrap();

        match storage.load_all() {
            Err(StorageError::InvalidData(message)) => {
                assert!(message.contains("lists.category_order"));
            }
            other => panic!("expected invalid data error, got {other:?}"),
        }
    }

    #[test]
    fn unmigrated_connection_is_rejected() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteSnapshotStorage::try_new(conn),
            Err(StorageError::Db(DbError::MissingTable("lists")))
        ));
        assert!(SqliteSnapshotStorage::try_new(open_db_in_memory().unwrap()).is_ok());
    }

    #[test]
    fn deferred_storage_opens_the_file_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grocery.sqlite3");
        let mut storage = SqliteSnapshotStorage::deferred(path.clone());
        assert!(!path.exists());

        assert!(storage.load_all().unwrap().is_some());
        assert!(path.exists());
    }

    #[test]
    fn deferred_storage_reports_unopenable_paths_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = SqliteSnapshotStorage::deferred(dir.path().to_path_buf());
        assert!(storage.load_all().is_err());
    }
}

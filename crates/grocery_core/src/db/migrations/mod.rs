//! Grocery schema: ordered upgrade steps plus the table contract every
//! snapshot connection is checked against.
//!
//! # Invariants
//! - `STEPS[n]` moves a database from schema version `n` to `n + 1`.
//! - Pending steps and the `user_version` bump commit together.
//! - A migrated connection holds every table in `SNAPSHOT_TABLES`.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const STEPS: &[&str] = &[include_str!("0001_init.sql")];

/// One table per snapshot collection, in save order.
pub const SNAPSHOT_TABLES: &[&str] = &[
    "lists",
    "items",
    "categories",
    "item_history",
    "store_profiles",
];

/// Schema version written by this build.
pub fn latest_version() -> u32 {
    u32::try_from(STEPS.len()).unwrap_or(u32::MAX)
}

/// Reads the schema version stored in the database header.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Upgrades `conn` to `latest_version()` and checks the snapshot tables.
///
/// Returns the version the database was found at.
///
/// # Errors
/// - `DbError::SchemaTooNew` when another build wrote a newer schema; the
///   file is left untouched.
/// - `DbError::MissingTable` when the version claims to be current but a
///   snapshot table is gone.
pub fn migrate(conn: &mut Connection) -> DbResult<u32> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending = STEPS.get(found as usize..).unwrap_or_default();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in pending {
            tx.execute_batch(step)?;
        }
        tx.pragma_update(None, "user_version", supported)?;
        tx.commit()?;
        info!("event=db_migrate module=db status=ok from={found} to={supported}");
    }

    verify_snapshot_tables(conn)?;
    Ok(found)
}

/// Fails with the first snapshot table the connection lacks.
pub fn verify_snapshot_tables(conn: &Connection) -> DbResult<()> {
    for &table in SNAPSHOT_TABLES {
        let present: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )?;
        if !present {
            return Err(DbError::MissingTable(table));
        }
    }
    Ok(())
}

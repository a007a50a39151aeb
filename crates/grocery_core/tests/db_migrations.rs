use grocery_core::db::migrations::{
    latest_version, migrate, schema_version, verify_snapshot_tables, SNAPSHOT_TABLES,
};
use grocery_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_every_snapshot_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in SNAPSHOT_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_a_database_file_keeps_the_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grocery.sqlite3");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO categories (id, name, default_order) VALUES ('produce', 'Produce', 0);",
        [],
    )
    .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened).unwrap(), latest_version());
    let count: i64 = reopened
        .query_row("SELECT COUNT(*) FROM categories;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 42;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 42);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn migrate_reports_the_version_it_started_from() {
    let mut conn = Connection::open_in_memory().unwrap();

    assert_eq!(migrate(&mut conn).unwrap(), 0);
    assert_eq!(migrate(&mut conn).unwrap(), latest_version());
    assert!(verify_snapshot_tables(&conn).is_ok());
}

#[test]
fn current_version_without_tables_is_reported_as_missing_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    match migrate(&mut conn).unwrap_err() {
        DbError::MissingTable(table) => assert_eq!(table, "lists"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn boolean_columns_reject_values_other_than_zero_and_one() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO item_history (id, name_canonical, last_used_at, times_used, is_favorite)
         VALUES ('h1', 'milk', 1, 1, 2);",
        [],
    );
    assert!(result.is_err());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

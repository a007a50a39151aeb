//! SQLite layer behind the primary snapshot backend.
//!
//! # Responsibility
//! - Open grocery database files with the connection settings the store expects.
//! - Upgrade the schema and check the snapshot table contract.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No snapshot table is read or written before `migrations::migrate` succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the grocery core.
    SchemaTooNew { found: u32, supported: u32 },
    /// A snapshot table is absent although the schema version says otherwise.
    MissingTable(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "grocery database uses schema {found}, this build reads up to {supported}"
            ),
            Self::MissingTable(table) => {
                write!(f, "grocery database is missing table `{table}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } | Self::MissingTable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

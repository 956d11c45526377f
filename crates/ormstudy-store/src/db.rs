//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

#![allow(clippy::result_large_err)]

use crate::config::PersistenceUnit;
use crate::errors::{from_rusqlite, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open a private in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Open a named shared-cache memory database
///
/// Every connection opened with the same `uri` sees the same data for as
/// long as at least one of them stays open.
pub fn open_shared_memory(uri: &str) -> Result<Connection> {
    Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(from_rusqlite)
}

/// Apply the unit's per-connection settings
pub fn configure(conn: &Connection, unit: &PersistenceUnit) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", unit.foreign_keys)
        .map_err(from_rusqlite)?;

    if !unit.is_memory() {
        // WAL only applies to file databases; memory databases report "memory"
        let _mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(from_rusqlite)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(from_rusqlite)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foreign_keys(conn: &Connection) -> bool {
        conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_configure_toggles_foreign_keys() {
        let conn = open_in_memory().unwrap();
        let mut unit = PersistenceUnit::in_memory("t");
        configure(&conn, &unit).unwrap();
        assert!(foreign_keys(&conn));

        unit.foreign_keys = false;
        configure(&conn, &unit).unwrap();
        assert!(!foreign_keys(&conn));
    }

    #[test]
    fn test_shared_memory_connections_see_each_other() {
        let uri = "file:db-test-shared?mode=memory&cache=shared";
        let keeper = open_shared_memory(uri).unwrap();
        keeper
            .execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();

        let other = open_shared_memory(uri).unwrap();
        let v: i64 = other.query_row("SELECT v FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.db");
        let conn = open(&path).unwrap();
        configure(&conn, &PersistenceUnit::in_memory("t").with_file(&path)).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}

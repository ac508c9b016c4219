//! SQLite backend implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use super::{Backend, schema};
use crate::Result;

/// Which table a [`SqliteBackend`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteTable {
    Durable,
    Session,
}

impl SqliteTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqliteTable::Durable => "durable_entries",
            SqliteTable::Session => "session_entries",
        }
    }
}

/// SQLite-backed key/value table
///
/// Both tables live in the same database file; each backend handle owns its
/// own connection and touches only its table.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    table: SqliteTable,
}

impl SqliteBackend {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, table: SqliteTable) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, table)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(table: SqliteTable) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: SqliteTable) -> Result<Self> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(Self { conn: Mutex::new(conn), table })
    }

    pub fn table(&self) -> SqliteTable {
        self.table
    }

    /// Remove every row in this backend's table
    pub fn truncate(&self) -> Result<usize> {
        let sql = format!("DELETE FROM {}", self.table.as_str());
        Ok(self.conn().execute(&sql, [])?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Backend for SqliteBackend {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.table.as_str());
        self.conn()
            .query_row(&sql, [key], |row| row.get::<_, String>(0))
            .optional()
            .map_err(Into::into)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let sql = format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            self.table.as_str()
        );
        self.conn().execute(&sql, params![key, value])?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table.as_str());
        self.conn().execute(&sql, [key])?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let sql = format!("SELECT key FROM {} ORDER BY key", self.table.as_str());
        let mut stmt = conn.prepare(&sql)?;

        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(keys)
    }
}

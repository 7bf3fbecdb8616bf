//! SQLite statement executor backed by rusqlite.
//!
//! The connection lives behind a tokio [`Mutex`]: migration and the analytics
//! write path are sequential, so a single guarded connection is sufficient
//! and keeps SQLite's single-writer model explicit.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::traits::StatementExecutor;
use crate::core::value::{Row, SqlValue};
use crate::drivers::DialectImpl;
use crate::error::Result;

/// SQLite executor implementation.
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Mutex<Connection>,
}

impl SqliteExecutor {
    /// Open (creating if needed) a file-backed database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        debug!("Opened SQLite database at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_sqlite(value: &SqlValue) -> SqliteValue {
    match value {
        SqlValue::Null => SqliteValue::Null,
        SqlValue::Integer(i) => SqliteValue::Integer(*i),
        SqlValue::Real(f) => SqliteValue::Real(*f),
        SqlValue::Text(s) => SqliteValue::Text(s.clone()),
        SqlValue::Blob(b) => SqliteValue::Blob(b.clone()),
    }
}

fn from_sqlite(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        let conn = self.conn.lock().await;
        let values: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let affected = conn.execute(sql, rusqlite::params_from_iter(values))?;
        Ok(affected as u64)
    }

    async fn execute_batch(&self, sql: &str, batches: Vec<Vec<SqlValue>>) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        for params in &batches {
            let values: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
            stmt.execute(rusqlite::params_from_iter(values))?;
        }
        Ok(())
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let values: Vec<SqliteValue> = params.iter().map(to_sqlite).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(values))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(from_sqlite(row.get_ref(idx)?));
            }
            out.push(Row::new(cells));
        }
        Ok(out)
    }

    async fn has_table(&self, table: &str) -> Result<bool> {
        let rows = self
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name=?",
                vec![SqlValue::from(table)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let rows = self
            .query(
                "SELECT name FROM pragma_table_info(?) WHERE name=?",
                vec![SqlValue::from(table), SqlValue::from(column)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    fn dialect(&self) -> DialectImpl {
        DialectImpl::Sqlite(super::SqliteDialect::new())
    }

    async fn close(&self) {
        // Dropping the connection closes the database file.
    }
}

//! Core traits: SQL dialect strategy and the statement-execution boundary.
//!
//! Every patch and every runtime query goes through [`StatementExecutor`];
//! nothing else in the crate touches a driver directly. [`Dialect`] isolates
//! the syntax differences between the supported engines (auto-increment
//! primary keys, table renames, foreign-key enforcement toggles).

use async_trait::async_trait;

use super::value::{Row, SqlValue};
use crate::error::Result;

/// SQL syntax strategy for a database engine.
///
/// Implementations are stateless unit structs dispatched through
/// `drivers::DialectImpl`.
pub trait Dialect: Send + Sync {
    /// Dialect identifier ("sqlite", "mysql").
    fn name(&self) -> &'static str;

    /// Column definition for an auto-incrementing integer `id` primary key.
    ///
    /// - SQLite: `id INTEGER PRIMARY KEY` (rowid alias)
    /// - MySQL: `id INT NOT NULL AUTO_INCREMENT`
    fn id_column(&self) -> &'static str;

    /// Trailing table constraint required by [`Dialect::id_column`], if any.
    ///
    /// MySQL needs `, PRIMARY KEY (id)`; SQLite needs nothing.
    fn id_constraint(&self) -> &'static str;

    /// Statement renaming a table.
    fn rename_table(&self, from: &str, to: &str) -> String;

    /// Statement toggling foreign-key enforcement, where the engine needs it
    /// during bulk copies that temporarily break references.
    fn foreign_key_toggle(&self, enabled: bool) -> Option<String>;
}

/// The single synchronous statement-execution boundary to the store.
///
/// "Synchronous" in the migration sense: callers await each operation to
/// completion before issuing the next; there is no internal concurrency.
/// Placeholders are `?` on both supported engines.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Execute one DDL/DML statement, returning the affected row count.
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64>;

    /// Execute one parameterized statement once per parameter set.
    ///
    /// The batch is a single logical operation; drivers may send it as one
    /// physical batch for efficiency.
    async fn execute_batch(&self, sql: &str, batches: Vec<Vec<SqlValue>>) -> Result<()>;

    /// Run a read query, materializing the full result set.
    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>>;

    /// Does a table with this exact name exist?
    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Does the table have a column with this exact name?
    async fn has_column(&self, table: &str, column: &str) -> Result<bool>;

    /// The SQL dialect of this executor.
    fn dialect(&self) -> crate::drivers::DialectImpl;

    /// Release the underlying connection or pool.
    async fn close(&self);
}

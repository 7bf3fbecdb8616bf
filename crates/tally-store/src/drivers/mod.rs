//! Database driver implementations.
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy for the engine
//! - `StatementExecutor`: the statement-execution boundary
//!
//! Polymorphism is enum-based: instead of `Box<dyn Trait>`, the `DialectImpl`
//! and `ExecutorImpl` enums delegate to the concrete driver through a match,
//! keeping dispatch static.

pub mod mysql;
pub mod sqlite;

pub use mysql::{MysqlDialect, MysqlExecutor};
pub use sqlite::{SqliteDialect, SqliteExecutor};

use async_trait::async_trait;

use crate::config::DbConfig;
use crate::core::traits::{Dialect, StatementExecutor};
use crate::core::value::{Row, SqlValue};
use crate::error::{Result, StoreError};

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone, Copy)]
pub enum DialectImpl {
    Sqlite(SqliteDialect),
    Mysql(MysqlDialect),
}

impl Dialect for DialectImpl {
    fn name(&self) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.id_column(),
            DialectImpl::Mysql(d) => d.id_column(),
        }
    }

    fn id_constraint(&self) -> &'static str {
        match self {
            DialectImpl::Sqlite(d) => d.id_constraint(),
            DialectImpl::Mysql(d) => d.id_constraint(),
        }
    }

    fn rename_table(&self, from: &str, to: &str) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.rename_table(from, to),
            DialectImpl::Mysql(d) => d.rename_table(from, to),
        }
    }

    fn foreign_key_toggle(&self, enabled: bool) -> Option<String> {
        match self {
            DialectImpl::Sqlite(d) => d.foreign_key_toggle(enabled),
            DialectImpl::Mysql(d) => d.foreign_key_toggle(enabled),
        }
    }
}

/// Enum-based static dispatch for executors.
///
/// Owned by the [`crate::store::Store`]; the patch engine only ever sees a
/// shared reference for the duration of startup.
#[derive(Debug)]
pub enum ExecutorImpl {
    Sqlite(SqliteExecutor),
    Mysql(MysqlExecutor),
}

impl ExecutorImpl {
    /// Connect to the configured backend.
    ///
    /// Any failure here is an initialization error: the store could not be
    /// reached at all, which aborts startup.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        config.validate()?;
        match config {
            DbConfig::Sqlite { path } => {
                let executor = SqliteExecutor::open(path).map_err(StoreError::init)?;
                Ok(ExecutorImpl::Sqlite(executor))
            }
            DbConfig::Mysql {
                host,
                port,
                database,
                user,
                password,
            } => {
                let executor = MysqlExecutor::connect(host, *port, database, user, password)
                    .await
                    .map_err(StoreError::init)?;
                Ok(ExecutorImpl::Mysql(executor))
            }
        }
    }
}

#[async_trait]
impl StatementExecutor for ExecutorImpl {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        match self {
            ExecutorImpl::Sqlite(e) => e.execute(sql, params).await,
            ExecutorImpl::Mysql(e) => e.execute(sql, params).await,
        }
    }

    async fn execute_batch(&self, sql: &str, batches: Vec<Vec<SqlValue>>) -> Result<()> {
        match self {
            ExecutorImpl::Sqlite(e) => e.execute_batch(sql, batches).await,
            ExecutorImpl::Mysql(e) => e.execute_batch(sql, batches).await,
        }
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        match self {
            ExecutorImpl::Sqlite(e) => e.query(sql, params).await,
            ExecutorImpl::Mysql(e) => e.query(sql, params).await,
        }
    }

    async fn has_table(&self, table: &str) -> Result<bool> {
        match self {
            ExecutorImpl::Sqlite(e) => e.has_table(table).await,
            ExecutorImpl::Mysql(e) => e.has_table(table).await,
        }
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        match self {
            ExecutorImpl::Sqlite(e) => e.has_column(table, column).await,
            ExecutorImpl::Mysql(e) => e.has_column(table, column).await,
        }
    }

    fn dialect(&self) -> DialectImpl {
        match self {
            ExecutorImpl::Sqlite(e) => e.dialect(),
            ExecutorImpl::Mysql(e) => e.dialect(),
        }
    }

    async fn close(&self) {
        match self {
            ExecutorImpl::Sqlite(e) => e.close().await,
            ExecutorImpl::Mysql(e) => e.close().await,
        }
    }
}

//! MySQL statement executor backed by mysql_async.

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Opts, OptsBuilder, Params, Pool, Value};
use tracing::{debug, info};

use crate::core::traits::StatementExecutor;
use crate::core::value::{Row, SqlValue};
use crate::drivers::DialectImpl;
use crate::error::Result;

/// MySQL executor implementation using a connection pool.
#[derive(Debug)]
pub struct MysqlExecutor {
    pool: Pool,
}

impl MysqlExecutor {
    /// Connect to the configured database and verify the connection.
    pub async fn connect(
        host: &str,
        port: u16,
        database: &str,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        let builder = OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port)
            .db_name(Some(database))
            .user(Some(user))
            .pass(Some(password))
            .init(vec!["SET NAMES utf8mb4"]);

        let opts: Opts = builder.into();
        let pool = Pool::new(opts);

        let mut conn = pool.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        drop(conn);

        info!("Connected to MySQL: {}:{}/{}", host, port, database);
        Ok(Self { pool })
    }
}

fn to_params(values: Vec<SqlValue>) -> Params {
    if values.is_empty() {
        Params::Empty
    } else {
        Params::Positional(values.into_iter().map(to_mysql).collect())
    }
}

fn to_mysql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Integer(i) => Value::Int(i),
        SqlValue::Real(f) => Value::Double(f),
        SqlValue::Text(s) => Value::Bytes(s.into_bytes()),
        SqlValue::Blob(b) => Value::Bytes(b),
    }
}

fn from_mysql(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Integer(i),
        Value::UInt(u) => SqlValue::Integer(u as i64),
        Value::Float(f) => SqlValue::Real(f as f64),
        Value::Double(f) => SqlValue::Real(f),
        Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => SqlValue::Text(s),
            Err(e) => SqlValue::Blob(e.into_bytes()),
        },
        // The schema stores every timestamp as epoch milliseconds, so
        // temporal wire values never appear in practice.
        other => SqlValue::Text(other.as_sql(true)),
    }
}

#[async_trait]
impl StatementExecutor for MysqlExecutor {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(sql, to_params(params)).await?;
        Ok(conn.affected_rows())
    }

    async fn execute_batch(&self, sql: &str, batches: Vec<Vec<SqlValue>>) -> Result<()> {
        if batches.is_empty() {
            return Ok(());
        }
        let mut conn = self.pool.get_conn().await?;
        conn.exec_batch(sql, batches.into_iter().map(to_params))
            .await?;
        Ok(())
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let mut conn = self.pool.get_conn().await?;
        let rows: Vec<mysql_async::Row> = conn.exec(sql, to_params(params)).await?;
        Ok(rows
            .into_iter()
            .map(|row| Row::new(row.unwrap().into_iter().map(from_mysql).collect()))
            .collect())
    }

    async fn has_table(&self, table: &str) -> Result<bool> {
        let rows = self
            .query(
                "SELECT COUNT(*) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
                vec![SqlValue::from(table)],
            )
            .await?;
        Ok(rows.first().and_then(|r| r.integer(0)).unwrap_or(0) > 0)
    }

    async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let rows = self
            .query(
                "SELECT COUNT(*) FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?",
                vec![SqlValue::from(table), SqlValue::from(column)],
            )
            .await?;
        Ok(rows.first().and_then(|r| r.integer(0)).unwrap_or(0) > 0)
    }

    fn dialect(&self) -> DialectImpl {
        DialectImpl::Mysql(super::MysqlDialect::new())
    }

    async fn close(&self) {
        if let Err(e) = self.pool.clone().disconnect().await {
            debug!("MySQL pool disconnect reported: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversion_to_mysql() {
        assert_eq!(to_mysql(SqlValue::Integer(5)), Value::Int(5));
        assert_eq!(to_mysql(SqlValue::Null), Value::NULL);
        assert_eq!(
            to_mysql(SqlValue::Text("a".into())),
            Value::Bytes(b"a".to_vec())
        );
    }

    #[test]
    fn test_value_conversion_from_mysql() {
        assert_eq!(from_mysql(Value::UInt(7)), SqlValue::Integer(7));
        assert_eq!(
            from_mysql(Value::Bytes(b"nether".to_vec())),
            SqlValue::Text("nether".into())
        );
        assert_eq!(from_mysql(Value::NULL), SqlValue::Null);
    }

    #[test]
    fn test_empty_params_collapse() {
        assert!(matches!(to_params(vec![]), Params::Empty));
        assert!(matches!(
            to_params(vec![SqlValue::Integer(1)]),
            Params::Positional(_)
        ));
    }
}

//! Server registry.
//!
//! Supplies the set of known server scope identifiers and registers the
//! running process's own identity. Patches consume this read-only.

use tracing::info;
use uuid::Uuid;

use crate::core::traits::StatementExecutor;
use crate::core::value::SqlValue;
use crate::drivers::ExecutorImpl;
use crate::error::{Result, StoreError};
use crate::schema::servers;

/// One registered server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
}

/// All registered servers, in registry id order.
pub async fn all_servers(db: &ExecutorImpl) -> Result<Vec<ServerRecord>> {
    let sql = format!(
        "SELECT {}, {}, {} FROM {} ORDER BY {}",
        servers::ID,
        servers::UUID,
        servers::NAME,
        servers::TABLE,
        servers::ID
    );
    let rows = db.query(&sql, vec![]).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row
            .integer(0)
            .ok_or_else(|| StoreError::Schema("server row without id".into()))?;
        let uuid = row
            .uuid(1)
            .ok_or_else(|| StoreError::Schema(format!("server {} has a malformed uuid", id)))?;
        let name = row.text(2).unwrap_or_default().to_owned();
        out.push(ServerRecord { id, uuid, name });
    }
    Ok(out)
}

/// Registry id of the server with this uuid, if registered.
pub async fn server_id(db: &ExecutorImpl, uuid: Uuid) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {}=? LIMIT 1",
        servers::ID,
        servers::TABLE,
        servers::UUID
    );
    let rows = db.query(&sql, vec![SqlValue::from(uuid)]).await?;
    Ok(rows.first().and_then(|r| r.integer(0)))
}

/// Register this process's server if it is not registered yet, returning its
/// registry id either way.
pub async fn ensure_registered(db: &ExecutorImpl, uuid: Uuid, name: &str) -> Result<i64> {
    if let Some(id) = server_id(db, uuid).await? {
        return Ok(id);
    }

    let sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (?, ?)",
        servers::TABLE,
        servers::UUID,
        servers::NAME
    );
    db.execute(&sql, vec![SqlValue::from(uuid), SqlValue::from(name)])
        .await?;
    info!("Registered server {} ({}) in the registry", name, uuid);

    server_id(db, uuid)
        .await?
        .ok_or_else(|| StoreError::Schema(format!("server {} vanished after registration", uuid)))
}

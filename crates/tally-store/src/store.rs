//! Store lifecycle: connect, bring the schema up to date, hand out access.

use tracing::info;
use uuid::Uuid;

use crate::config::DbConfig;
use crate::core::traits::StatementExecutor;
use crate::drivers::ExecutorImpl;
use crate::error::Result;
use crate::patch::PatchSequence;
use crate::registry;
use crate::schema;

/// An open analytics store whose schema is the canonical shape.
///
/// `open` runs the whole migration before returning, on the caller's task.
/// Nothing should touch the database concurrently until it has returned.
#[derive(Debug)]
pub struct Store {
    db: ExecutorImpl,
    server_uuid: Uuid,
    server_id: i64,
}

impl Store {
    /// Connect, create any missing canonical tables, register this server,
    /// and run the patch sequence. Fails fast: a connection failure is an
    /// initialization error, a patch failure names the patch that broke.
    pub async fn open(config: &DbConfig, server_uuid: Uuid, server_name: &str) -> Result<Self> {
        config.validate()?;
        let db = ExecutorImpl::connect(config).await?;
        info!(backend = config.backend(), "Connected to analytics store");

        // A failed migration must still release the connection pool.
        let server_id = match Self::migrate(&db, server_uuid, server_name).await {
            Ok(id) => id,
            Err(e) => {
                db.close().await;
                return Err(e);
            }
        };

        Ok(Self {
            db,
            server_uuid,
            server_id,
        })
    }

    async fn migrate(db: &ExecutorImpl, server_uuid: Uuid, server_name: &str) -> Result<i64> {
        schema::create_tables(db).await?;
        let server_id = registry::ensure_registered(db, server_uuid, server_name).await?;
        PatchSequence::new(server_uuid).apply_all(db).await?;
        Ok(server_id)
    }

    pub fn executor(&self) -> &ExecutorImpl {
        &self.db
    }

    pub fn server_uuid(&self) -> Uuid {
        self.server_uuid
    }

    /// Registry id of this server in the open store.
    pub fn server_id(&self) -> i64 {
        self.server_id
    }

    pub async fn close(self) {
        self.db.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let config = DbConfig::Sqlite {
            path: PathBuf::new(),
        };
        let err = Store::open(&config, Uuid::new_v4(), "Main")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}

//! Converts the worlds table's numeric server scope into the server uuid.
//!
//! Rebuilds `tally_worlds` through a temp copy so a crash mid-way resumes
//! cleanly: the rename only happens when no temp table is left over, the
//! new-shape table is created fresh, and the temp copy is dropped last.
//! Row ids are carried over unchanged so world-time facts keep pointing at
//! the right rows.

use async_trait::async_trait;

use crate::core::traits::StatementExecutor;
use crate::drivers::ExecutorImpl;
use crate::error::Result;
use crate::schema::worlds;

use super::{drop_table, stage_table, Patch};

const TEMP_TABLE: &str = "temp_worlds";
const OLD_SCOPE_COLUMN: &str = "server_id";

#[derive(Default)]
pub struct WorldServerUuidPatch;

impl WorldServerUuidPatch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Patch for WorldServerUuidPatch {
    fn name(&self) -> &'static str {
        "WorldServerUuidPatch"
    }

    async fn has_been_applied(&self, db: &ExecutorImpl) -> Result<bool> {
        Ok(db.has_column(worlds::TABLE, worlds::SERVER_UUID).await?
            && !db.has_column(worlds::TABLE, OLD_SCOPE_COLUMN).await?
            && !db.has_table(TEMP_TABLE).await?)
    }

    async fn apply(&mut self, db: &ExecutorImpl) -> Result<()> {
        stage_table(db, worlds::TABLE, TEMP_TABLE).await?;
        drop_table(db, worlds::TABLE).await?;
        db.execute(&worlds::create_sql(&db.dialect()), vec![]).await?;

        // Every remaining scope resolves to a registered server: the split
        // patch has already deleted the sentinel rows, and registry rows are
        // never removed. An unresolvable scope would fail the copy on the
        // NOT NULL uuid column, which is the right outcome for a corrupt
        // registry.
        let sql = format!(
            "INSERT INTO {worlds} ({id}, {name}, {server_uuid}) \
             SELECT {id}, {name}, \
             (SELECT {reg_uuid} FROM {registry} WHERE {registry}.{reg_id} = {temp}.{old_scope} LIMIT 1) \
             FROM {temp}",
            worlds = worlds::TABLE,
            id = worlds::ID,
            name = worlds::NAME,
            server_uuid = worlds::SERVER_UUID,
            registry = crate::schema::servers::TABLE,
            reg_uuid = crate::schema::servers::UUID,
            reg_id = crate::schema::servers::ID,
            temp = TEMP_TABLE,
            old_scope = OLD_SCOPE_COLUMN
        );
        db.execute(&sql, vec![]).await?;

        drop_table(db, TEMP_TABLE).await?;
        Ok(())
    }
}

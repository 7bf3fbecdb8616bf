//! Server-scoping split for the worlds table.
//!
//! Before this patch a world name had one global row, referenced by every
//! server's world-time facts. After it, a world row belongs to exactly one
//! server: identity is `(world_name, server_id)`, and the same name may
//! exist once per server. The patch reconstructs which names belong to which
//! server from session history, inserts the per-server rows, repoints every
//! world-time fact to its own server's row, and deletes the old global rows.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::core::traits::StatementExecutor;
use crate::core::value::{Row, SqlValue};
use crate::drivers::ExecutorImpl;
use crate::error::{Result, StoreError};
use crate::registry;
use crate::schema::{sessions, world_times, worlds};

use super::{add_column, Patch};

/// Transitional scope column; replaced by `server_uuid` one patch later.
const SCOPE_COLUMN: &str = "server_id";

/// Scope value of rows the split has not reached yet.
const SENTINEL_SCOPE: i64 = 0;

#[derive(Debug, Clone, PartialEq)]
struct WorldRow {
    id: i64,
    server_id: i64,
    name: String,
}

#[derive(Default)]
pub struct WorldServerScopePatch;

impl WorldServerScopePatch {
    pub fn new() -> Self {
        Self
    }

    /// True when no row carries the sentinel scope anymore.
    async fn all_rows_scoped(&self, db: &ExecutorImpl) -> Result<bool> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}=? LIMIT 1",
            worlds::ID,
            worlds::TABLE,
            SCOPE_COLUMN
        );
        let rows = db.query(&sql, vec![SqlValue::from(SENTINEL_SCOPE)]).await?;
        Ok(rows.is_empty())
    }

    /// Distinct world names this server's session history references,
    /// reconstructed through world_times -> sessions.
    async fn world_names_for(&self, db: &ExecutorImpl, server_id: i64) -> Result<HashSet<String>> {
        let sql = format!(
            "SELECT DISTINCT {worlds}.{name} FROM {worlds} \
             INNER JOIN {times} ON {times}.{world_id} = {worlds}.{id} \
             INNER JOIN {sessions} ON {times}.{session_id} = {sessions}.{sid} \
             WHERE {sessions}.{server} = ?",
            worlds = worlds::TABLE,
            name = worlds::NAME,
            id = worlds::ID,
            times = world_times::TABLE,
            world_id = world_times::WORLD_ID,
            session_id = world_times::SESSION_ID,
            sessions = sessions::TABLE,
            sid = sessions::ID,
            server = sessions::SERVER_ID
        );
        let rows = db.query(&sql, vec![SqlValue::from(server_id)]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.text(0).map(str::to_owned))
            .collect())
    }

    /// Insert a `(name, server)` world row for every discovered name that
    /// does not have one yet.
    async fn save_worlds(
        &self,
        db: &ExecutorImpl,
        names: &HashSet<String>,
        server_id: i64,
    ) -> Result<()> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {}=?",
            worlds::NAME,
            worlds::TABLE,
            SCOPE_COLUMN
        );
        let existing: HashSet<String> = db
            .query(&sql, vec![SqlValue::from(server_id)])
            .await?
            .iter()
            .filter_map(|r| r.text(0).map(str::to_owned))
            .collect();

        let batches: Vec<Vec<SqlValue>> = names
            .iter()
            .filter(|name| !existing.contains(*name))
            .map(|name| vec![SqlValue::from(name.as_str()), SqlValue::from(server_id)])
            .collect();
        if batches.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            worlds::TABLE,
            worlds::NAME,
            SCOPE_COLUMN
        );
        db.execute_batch(&sql, batches).await
    }

    async fn world_rows(&self, db: &ExecutorImpl) -> Result<Vec<WorldRow>> {
        let sql = format!(
            "SELECT {}, {}, {} FROM {}",
            worlds::ID,
            SCOPE_COLUMN,
            worlds::NAME,
            worlds::TABLE
        );
        let rows = db.query(&sql, vec![]).await?;
        rows.iter().map(parse_world_row).collect()
    }

    /// Repoint every world-time fact from the old global world row to the
    /// new row with the same name and the fact's own server scope, in one
    /// batched update keyed on `(old_world_id, server_id)`.
    async fn repoint_world_times(&self, db: &ExecutorImpl) -> Result<()> {
        let all = self.world_rows(db).await?;

        let mut batches = Vec::new();
        for old in all.iter().filter(|w| w.server_id == SENTINEL_SCOPE) {
            for new in all
                .iter()
                .filter(|w| w.server_id != SENTINEL_SCOPE && w.name == old.name)
            {
                batches.push(vec![
                    SqlValue::from(new.id),
                    SqlValue::from(old.id),
                    SqlValue::from(new.server_id),
                ]);
            }
        }
        if batches.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE {} SET {}=? WHERE {}=? AND {}=?",
            world_times::TABLE,
            world_times::WORLD_ID,
            world_times::WORLD_ID,
            world_times::SERVER_ID
        );
        db.execute_batch(&sql, batches).await
    }
}

fn parse_world_row(row: &Row) -> Result<WorldRow> {
    let id = row
        .integer(0)
        .ok_or_else(|| StoreError::Schema("world row without id".into()))?;
    let server_id = row
        .integer(1)
        .ok_or_else(|| StoreError::Schema(format!("world {} without server scope", id)))?;
    let name = row
        .text(2)
        .ok_or_else(|| StoreError::Schema(format!("world {} without name", id)))?
        .to_owned();
    Ok(WorldRow {
        id,
        server_id,
        name,
    })
}

#[async_trait]
impl Patch for WorldServerScopePatch {
    fn name(&self) -> &'static str {
        "WorldServerScopePatch"
    }

    async fn has_been_applied(&self, db: &ExecutorImpl) -> Result<bool> {
        // The uuid-scoped worlds layout of the next patch supersedes this
        // one; its column makes this patch obsolete.
        if db.has_table(worlds::TABLE).await?
            && db.has_column(worlds::TABLE, worlds::SERVER_UUID).await?
        {
            return Ok(true);
        }
        Ok(db.has_column(worlds::TABLE, SCOPE_COLUMN).await? && self.all_rows_scoped(db).await?)
    }

    async fn apply(&mut self, db: &ExecutorImpl) -> Result<()> {
        if !db.has_column(worlds::TABLE, SCOPE_COLUMN).await? {
            let definition = format!(
                "{} integer NOT NULL DEFAULT {}",
                SCOPE_COLUMN, SENTINEL_SCOPE
            );
            add_column(db, worlds::TABLE, &definition).await?;
        }

        for server in registry::all_servers(db).await? {
            let names = self.world_names_for(db, server.id).await?;
            self.save_worlds(db, &names, server.id).await?;
        }

        self.repoint_world_times(db).await?;

        let sql = format!("DELETE FROM {} WHERE {}=?", worlds::TABLE, SCOPE_COLUMN);
        db.execute(&sql, vec![SqlValue::from(SENTINEL_SCOPE)]).await?;
        Ok(())
    }
}

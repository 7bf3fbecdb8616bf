//! Schema patches: ordered, idempotent migration steps.
//!
//! Each patch reports applicability from the physical schema shape alone
//! (table and column existence, sentinel-row probes) and transforms the
//! schema when it is not yet applied. A patch that rebuilds a table does so
//! through a staging rename: the live table is renamed to a `temp_*` name
//! **only if that temp does not already exist**. An existing temp is the
//! remains of an interrupted run and is reused, so no data is ever lost. The
//! temp is dropped only after the copy succeeds, which means a leftover temp
//! always forces the patch to report "not applied" and re-drive itself on
//! the next run.

mod geolocation_uuid;
mod legacy_layout;
mod sequence;
mod world_server_scope;
mod world_server_uuid;

pub use geolocation_uuid::GeolocationUuidPatch;
pub use legacy_layout::LegacyLayoutPatch;
pub use sequence::PatchSequence;
pub use world_server_scope::WorldServerScopePatch;
pub use world_server_uuid::WorldServerUuidPatch;

use async_trait::async_trait;

use crate::core::traits::{Dialect, StatementExecutor};
use crate::drivers::ExecutorImpl;
use crate::error::Result;

/// One self-contained schema/data migration step.
///
/// Implementations are constructed fresh per migration run, invoked at most
/// once, and discarded; `apply` takes `&mut self` only for per-run scratch
/// state (e.g. a resolved server id).
#[async_trait]
pub trait Patch: Send + Sync {
    /// Stable name, used in logs and in patch-apply errors.
    fn name(&self) -> &'static str;

    /// Whether the schema already has the post-patch shape.
    ///
    /// Read-only and side-effect free; safe to call any number of times.
    /// Must return `false` while this patch's `temp_*` table exists.
    async fn has_been_applied(&self, db: &ExecutorImpl) -> Result<bool>;

    /// Perform the transformation. Runs to completion or fails outright;
    /// there is no cancellation.
    async fn apply(&mut self, db: &ExecutorImpl) -> Result<()>;
}

/// Rename `table` to `temp`, unless `temp` already exists from an
/// interrupted earlier run, in which case the rename is skipped and the
/// staged data is reused.
pub(crate) async fn stage_table(db: &ExecutorImpl, table: &str, temp: &str) -> Result<()> {
    if !db.has_table(temp).await? {
        rename_table(db, table, temp).await?;
    }
    Ok(())
}

pub(crate) async fn rename_table(db: &ExecutorImpl, from: &str, to: &str) -> Result<()> {
    let sql = db.dialect().rename_table(from, to);
    db.execute(&sql, vec![]).await?;
    Ok(())
}

pub(crate) async fn drop_table(db: &ExecutorImpl, table: &str) -> Result<()> {
    db.execute(&format!("DROP TABLE IF EXISTS {}", table), vec![])
        .await?;
    Ok(())
}

pub(crate) async fn add_column(db: &ExecutorImpl, table: &str, definition: &str) -> Result<()> {
    db.execute(&format!("ALTER TABLE {} ADD COLUMN {}", table, definition), vec![])
        .await?;
    Ok(())
}

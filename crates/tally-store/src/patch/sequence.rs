//! Fixed-order patch orchestration.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::traits::StatementExecutor;
use crate::core::value::SqlValue;
use crate::drivers::ExecutorImpl;
use crate::error::{Result, StoreError};
use crate::schema::schema_log;

use super::{
    GeolocationUuidPatch, LegacyLayoutPatch, Patch, WorldServerScopePatch, WorldServerUuidPatch,
};

/// All patches in their one valid order. Order is part of each patch's
/// contract: later patches assume the shapes earlier ones produce.
pub struct PatchSequence {
    patches: Vec<Box<dyn Patch>>,
}

impl PatchSequence {
    pub fn new(server_uuid: Uuid) -> Self {
        Self {
            patches: vec![
                Box::new(LegacyLayoutPatch::new(server_uuid)),
                Box::new(WorldServerScopePatch::new()),
                Box::new(WorldServerUuidPatch::new()),
                Box::new(GeolocationUuidPatch::new()),
            ],
        }
    }

    /// Run every patch that is not yet applied, in order, failing fast on
    /// the first error. Safe to call again after a failure or crash: patches
    /// that completed report applied and are skipped, the failed one
    /// re-drives itself from its staged state.
    pub async fn apply_all(&mut self, db: &ExecutorImpl) -> Result<usize> {
        let mut applied = 0;
        for patch in &mut self.patches {
            let name = patch.name();
            if patch
                .has_been_applied(db)
                .await
                .map_err(|e| StoreError::patch(name, e))?
            {
                debug!("Patch already applied: {}", name);
                continue;
            }

            info!("Applying patch: {}", name);
            patch
                .apply(db)
                .await
                .map_err(|e| StoreError::patch(name, e))?;
            record_applied(db, name).await;
            applied += 1;
        }
        if applied > 0 {
            info!("Applied {} schema patch(es)", applied);
        }
        Ok(applied)
    }
}

/// Append to the write-only patch log, best effort. Applicability is never
/// derived from this table, so a failed insert must not fail a migration
/// that already succeeded.
async fn record_applied(db: &ExecutorImpl, name: &str) {
    let sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (?, ?)",
        schema_log::TABLE,
        schema_log::NAME,
        schema_log::APPLIED
    );
    let params = vec![
        SqlValue::from(name),
        SqlValue::from(Utc::now().timestamp_millis()),
    ];
    if let Err(e) = db.execute(&sql, params).await {
        warn!("Could not record applied patch {}: {}", name, e);
    }
}

//! Rebuild of the original single-server table layout.
//!
//! The earliest installs stored all analytics for exactly one server, with a
//! `tally_gamemode_times` table that no later layout has. This patch splits
//! that layout into the per-server one: global user rows stay global, while
//! per-server state moves into `tally_user_info`, and command usage, TPS and
//! nicknames gain a `server_id` column filled with the running server's
//! registry id. World tables are rebuilt empty in their current shape; the
//! legacy gamemode counters have no equivalent and are dropped.

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::traits::{Dialect, StatementExecutor};
use crate::core::value::SqlValue;
use crate::drivers::ExecutorImpl;
use crate::error::{Result, StoreError};
use crate::registry;
use crate::schema::{
    command_usage, geolocations, kills, nicknames, sessions, tps, user_info, users, world_times,
    worlds,
};

use super::{drop_table, stage_table, Patch};

/// Marker table only the legacy layout has.
const LEGACY_MARKER: &str = "tally_gamemode_times";

pub struct LegacyLayoutPatch {
    server_uuid: Uuid,
    /// Resolved at the start of `apply`; scratch for this run only.
    server_id: Option<i64>,
}

impl LegacyLayoutPatch {
    pub fn new(server_uuid: Uuid) -> Self {
        Self {
            server_uuid,
            server_id: None,
        }
    }

    fn own_server_id(&self) -> Result<i64> {
        self.server_id
            .ok_or_else(|| StoreError::Schema("server id not resolved before copy".into()))
    }

    async fn copy_command_usage(&self, db: &ExecutorImpl) -> Result<()> {
        let temp = "temp_command_usage";
        stage_table(db, command_usage::TABLE, temp).await?;
        drop_table(db, command_usage::TABLE).await?;
        db.execute(&command_usage::create_sql(&db.dialect()), vec![])
            .await?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}) SELECT {}, {}, ? FROM {}",
            command_usage::TABLE,
            command_usage::COMMAND,
            command_usage::TIMES_USED,
            command_usage::SERVER_ID,
            command_usage::COMMAND,
            command_usage::TIMES_USED,
            temp
        );
        db.execute(&sql, vec![SqlValue::from(self.own_server_id()?)])
            .await?;

        drop_table(db, temp).await
    }

    async fn copy_tps(&self, db: &ExecutorImpl) -> Result<()> {
        let temp = "temp_tps";
        stage_table(db, tps::TABLE, temp).await?;
        drop_table(db, tps::TABLE).await?;
        db.execute(&tps::create_sql(&db.dialect()), vec![]).await?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) \
             SELECT ?, {}, {}, {}, {}, {}, {}, {} FROM {}",
            tps::TABLE,
            tps::SERVER_ID,
            tps::DATE,
            tps::TPS,
            tps::PLAYERS_ONLINE,
            tps::CPU_USAGE,
            tps::RAM_USAGE,
            tps::ENTITIES,
            tps::CHUNKS_LOADED,
            tps::DATE,
            tps::TPS,
            tps::PLAYERS_ONLINE,
            tps::CPU_USAGE,
            tps::RAM_USAGE,
            tps::ENTITIES,
            tps::CHUNKS_LOADED,
            temp
        );
        db.execute(&sql, vec![SqlValue::from(self.own_server_id()?)])
            .await?;

        drop_table(db, temp).await
    }

    async fn copy_users(&self, db: &ExecutorImpl) -> Result<()> {
        let server_id = self.own_server_id()?;
        let dialect = db.dialect();

        stage_table(db, users::TABLE, "temp_users").await?;
        stage_table(db, nicknames::TABLE, "temp_nicknames").await?;
        stage_table(db, kills::TABLE, "temp_kills").await?;

        drop_table(db, users::TABLE).await?;
        drop_table(db, nicknames::TABLE).await?;
        drop_table(db, kills::TABLE).await?;
        db.execute(&users::create_sql(&dialect), vec![]).await?;
        db.execute(&nicknames::create_sql(&dialect), vec![]).await?;

        // Legacy sessions cannot be mapped onto the per-server session rows;
        // they are rebuilt empty in the current shape.
        drop_table(db, sessions::TABLE).await?;
        db.execute(&sessions::create_sql(&dialect), vec![]).await?;
        db.execute(&kills::create_sql(&dialect), vec![]).await?;
        db.execute(&user_info::create_sql(&dialect), vec![]).await?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}) SELECT id, uuid, registered, name FROM temp_users",
            users::TABLE,
            users::ID,
            users::UUID,
            users::REGISTERED,
            users::NAME
        );
        db.execute(&sql, vec![]).await?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}) \
             SELECT id, registered, opped, banned, ? FROM temp_users",
            user_info::TABLE,
            user_info::USER_ID,
            user_info::REGISTERED,
            user_info::OPPED,
            user_info::BANNED,
            user_info::SERVER_ID
        );
        db.execute(&sql, vec![SqlValue::from(server_id)]).await?;

        let sql = format!(
            "INSERT INTO {} ({}, {}, {}) SELECT user_id, nickname, ? FROM temp_nicknames",
            nicknames::TABLE,
            nicknames::USER_ID,
            nicknames::NICKNAME,
            nicknames::SERVER_ID
        );
        db.execute(&sql, vec![SqlValue::from(server_id)]).await?;

        // Legacy kills predate sessions, so they keep a zero session
        // reference. MySQL enforces the reference during the copy.
        if let Some(off) = dialect.foreign_key_toggle(false) {
            db.execute(&off, vec![]).await?;
        }
        let sql = format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}) \
             SELECT killer_id, victim_id, weapon, date, 0 FROM temp_kills",
            kills::TABLE,
            kills::KILLER_ID,
            kills::VICTIM_ID,
            kills::WEAPON,
            kills::DATE,
            kills::SESSION_ID
        );
        let copied = db.execute(&sql, vec![]).await;
        if let Some(on) = dialect.foreign_key_toggle(true) {
            db.execute(&on, vec![]).await?;
        }
        copied?;

        Ok(())
    }
}

#[async_trait]
impl Patch for LegacyLayoutPatch {
    fn name(&self) -> &'static str {
        "LegacyLayoutPatch"
    }

    async fn has_been_applied(&self, db: &ExecutorImpl) -> Result<bool> {
        Ok(!db.has_table(LEGACY_MARKER).await?)
    }

    async fn apply(&mut self, db: &ExecutorImpl) -> Result<()> {
        let id = registry::server_id(db, self.server_uuid).await?.ok_or_else(|| {
            StoreError::Schema(format!(
                "server {} is not registered; register before migrating",
                self.server_uuid
            ))
        })?;
        self.server_id = Some(id);

        self.copy_command_usage(db).await?;
        self.copy_tps(db).await?;

        drop_table(db, user_info::TABLE).await?;
        self.copy_users(db).await?;

        // Geolocation and world data have no usable legacy form; rebuild the
        // tables empty in their canonical shape.
        drop_table(db, geolocations::TABLE).await?;
        db.execute(&geolocations::create_sql(&db.dialect()), vec![])
            .await?;
        drop_table(db, world_times::TABLE).await?;
        drop_table(db, worlds::TABLE).await?;
        db.execute(&worlds::create_sql(&db.dialect()), vec![]).await?;
        db.execute(&world_times::create_sql(&db.dialect()), vec![])
            .await?;

        drop_table(db, LEGACY_MARKER).await?;
        drop_table(db, "temp_nicknames").await?;
        drop_table(db, "temp_kills").await?;
        drop_table(db, "temp_users").await
    }
}

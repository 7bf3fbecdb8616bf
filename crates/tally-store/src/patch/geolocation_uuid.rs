//! Replaces the geolocations table's numeric user reference with the user
//! uuid, rebuilding the table through a crash-safe temp copy.

use async_trait::async_trait;

use crate::core::traits::StatementExecutor;
use crate::drivers::ExecutorImpl;
use crate::error::Result;
use crate::schema::{geolocations, users};

use super::{drop_table, stage_table, Patch};

const TEMP_TABLE: &str = "temp_geolocations";
const OLD_USER_COLUMN: &str = "user_id";

#[derive(Default)]
pub struct GeolocationUuidPatch;

impl GeolocationUuidPatch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Patch for GeolocationUuidPatch {
    fn name(&self) -> &'static str {
        "GeolocationUuidPatch"
    }

    async fn has_been_applied(&self, db: &ExecutorImpl) -> Result<bool> {
        Ok(db.has_column(geolocations::TABLE, geolocations::ID).await?
            && db.has_column(geolocations::TABLE, geolocations::UUID).await?
            && !db.has_column(geolocations::TABLE, OLD_USER_COLUMN).await?
            && !db.has_table(TEMP_TABLE).await?)
    }

    async fn apply(&mut self, db: &ExecutorImpl) -> Result<()> {
        stage_table(db, geolocations::TABLE, TEMP_TABLE).await?;
        drop_table(db, geolocations::TABLE).await?;
        db.execute(&geolocations::create_sql(&db.dialect()), vec![])
            .await?;

        // Rows whose user id no longer resolves keep a NULL uuid; the uuid
        // column is nullable for exactly this reason.
        let sql = format!(
            "INSERT INTO {geo} ({uuid}, {ip}, {ip_hash}, {location}, {last_used}) \
             SELECT \
             (SELECT {users}.{user_uuid} FROM {users} WHERE {users}.{user_id} = {temp}.{old_user} LIMIT 1), \
             {ip}, {ip_hash}, {location}, {last_used} FROM {temp}",
            geo = geolocations::TABLE,
            uuid = geolocations::UUID,
            ip = geolocations::IP,
            ip_hash = geolocations::IP_HASH,
            location = geolocations::GEOLOCATION,
            last_used = geolocations::LAST_USED,
            users = users::TABLE,
            user_uuid = users::UUID,
            user_id = users::ID,
            temp = TEMP_TABLE,
            old_user = OLD_USER_COLUMN
        );
        db.execute(&sql, vec![]).await?;

        drop_table(db, TEMP_TABLE).await?;
        Ok(())
    }
}

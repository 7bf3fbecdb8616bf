//! Canonical table definitions.
//!
//! One module per table: the table name, its column names, and the canonical
//! `CREATE TABLE IF NOT EXISTS` statement. These definitions are the single
//! source of truth for table shape: fresh installs create through them and
//! every patch that rebuilds a table creates through them, so migrated and
//! freshly created schemas can never diverge.

use crate::core::traits::{Dialect, StatementExecutor};
use crate::drivers::{DialectImpl, ExecutorImpl};
use crate::error::Result;
use tracing::debug;

/// Server registry table.
pub mod servers {
    use super::*;

    pub const TABLE: &str = "tally_servers";
    pub const ID: &str = "id";
    pub const UUID: &str = "uuid";
    pub const NAME: &str = "name";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {UUID} varchar(36) NOT NULL, \
             {NAME} varchar(100) NOT NULL{pk})"
        )
    }
}

/// Known players across all servers.
pub mod users {
    use super::*;

    pub const TABLE: &str = "tally_users";
    pub const ID: &str = "id";
    pub const UUID: &str = "uuid";
    pub const REGISTERED: &str = "registered";
    pub const NAME: &str = "name";
    pub const TIMES_KICKED: &str = "times_kicked";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {UUID} varchar(36) NOT NULL, \
             {REGISTERED} bigint NOT NULL, \
             {NAME} varchar(16) NOT NULL, \
             {TIMES_KICKED} integer NOT NULL DEFAULT 0{pk})"
        )
    }
}

/// Per-server player state.
pub mod user_info {
    use super::*;

    pub const TABLE: &str = "tally_user_info";
    pub const USER_ID: &str = "user_id";
    pub const REGISTERED: &str = "registered";
    pub const OPPED: &str = "opped";
    pub const BANNED: &str = "banned";
    pub const SERVER_ID: &str = "server_id";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {USER_ID} integer NOT NULL, \
             {REGISTERED} bigint NOT NULL, \
             {OPPED} boolean NOT NULL DEFAULT 0, \
             {BANNED} boolean NOT NULL DEFAULT 0, \
             {SERVER_ID} integer NOT NULL)"
        )
    }
}

/// Per-server nickname history.
pub mod nicknames {
    use super::*;

    pub const TABLE: &str = "tally_nicknames";
    pub const USER_ID: &str = "user_id";
    pub const NICKNAME: &str = "nickname";
    pub const SERVER_ID: &str = "server_id";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {USER_ID} integer NOT NULL, \
             {NICKNAME} varchar(75) NOT NULL, \
             {SERVER_ID} integer NOT NULL)"
        )
    }
}

/// Play sessions, the central fact table.
pub mod sessions {
    use super::*;

    pub const TABLE: &str = "tally_sessions";
    pub const ID: &str = "id";
    pub const USER_ID: &str = "user_id";
    pub const SERVER_ID: &str = "server_id";
    pub const SESSION_START: &str = "session_start";
    pub const SESSION_END: &str = "session_end";
    pub const MOB_KILLS: &str = "mob_kills";
    pub const DEATHS: &str = "deaths";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {USER_ID} integer NOT NULL, \
             {SERVER_ID} integer NOT NULL, \
             {SESSION_START} bigint NOT NULL, \
             {SESSION_END} bigint NOT NULL, \
             {MOB_KILLS} integer NOT NULL DEFAULT 0, \
             {DEATHS} integer NOT NULL DEFAULT 0{pk})"
        )
    }
}

/// Player-versus-player kills, tied to the killer's session.
pub mod kills {
    use super::*;

    pub const TABLE: &str = "tally_kills";
    pub const KILLER_ID: &str = "killer_id";
    pub const VICTIM_ID: &str = "victim_id";
    pub const WEAPON: &str = "weapon";
    pub const DATE: &str = "date";
    pub const SESSION_ID: &str = "session_id";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {KILLER_ID} integer NOT NULL, \
             {VICTIM_ID} integer NOT NULL, \
             {WEAPON} varchar(30) NOT NULL, \
             {DATE} bigint NOT NULL, \
             {SESSION_ID} integer NOT NULL)"
        )
    }
}

/// World name registry, scoped per server.
///
/// Identity is `(world_name, server_uuid)`: the same name may exist once per
/// server. Patches related to this table: the legacy layout rebuild, the
/// server-scoping split, and the numeric-scope-to-uuid conversion.
pub mod worlds {
    use super::*;

    pub const TABLE: &str = "tally_worlds";
    pub const ID: &str = "id";
    pub const NAME: &str = "world_name";
    pub const SERVER_UUID: &str = "server_uuid";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {NAME} varchar(100) NOT NULL, \
             {SERVER_UUID} varchar(36) NOT NULL{pk})"
        )
    }
}

/// Per-session time spent in each world, split by gamemode.
pub mod world_times {
    use super::*;

    pub const TABLE: &str = "tally_world_times";
    pub const USER_ID: &str = "user_id";
    pub const WORLD_ID: &str = "world_id";
    pub const SERVER_ID: &str = "server_id";
    pub const SESSION_ID: &str = "session_id";
    pub const SURVIVAL: &str = "survival_time";
    pub const CREATIVE: &str = "creative_time";
    pub const ADVENTURE: &str = "adventure_time";
    pub const SPECTATOR: &str = "spectator_time";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {USER_ID} integer NOT NULL, \
             {WORLD_ID} integer NOT NULL, \
             {SERVER_ID} integer NOT NULL, \
             {SESSION_ID} integer NOT NULL, \
             {SURVIVAL} bigint NOT NULL DEFAULT 0, \
             {CREATIVE} bigint NOT NULL DEFAULT 0, \
             {ADVENTURE} bigint NOT NULL DEFAULT 0, \
             {SPECTATOR} bigint NOT NULL DEFAULT 0)"
        )
    }
}

/// Player connection geolocation, keyed by user uuid.
///
/// `uuid` is nullable: the re-keying patch resolves legacy numeric user
/// references best-effort, and an orphaned reference yields NULL instead of
/// aborting the copy.
pub mod geolocations {
    use super::*;

    pub const TABLE: &str = "tally_geolocations";
    pub const ID: &str = "id";
    pub const UUID: &str = "uuid";
    pub const IP: &str = "ip";
    pub const IP_HASH: &str = "ip_hash";
    pub const GEOLOCATION: &str = "geolocation";
    pub const LAST_USED: &str = "last_used";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {UUID} varchar(36), \
             {IP} varchar(39) NOT NULL, \
             {IP_HASH} varchar(200), \
             {GEOLOCATION} varchar(50) NOT NULL, \
             {LAST_USED} bigint NOT NULL DEFAULT 0{pk})"
        )
    }
}

/// Per-server command usage counters.
pub mod command_usage {
    use super::*;

    pub const TABLE: &str = "tally_command_usage";
    pub const ID: &str = "id";
    pub const COMMAND: &str = "command";
    pub const TIMES_USED: &str = "times_used";
    pub const SERVER_ID: &str = "server_id";

    pub fn create_sql(dialect: &DialectImpl) -> String {
        let id = dialect.id_column();
        let pk = dialect.id_constraint();
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} ({id}, \
             {COMMAND} varchar(20) NOT NULL, \
             {TIMES_USED} integer NOT NULL DEFAULT 0, \
             {SERVER_ID} integer NOT NULL{pk})"
        )
    }
}

/// Per-server performance samples.
pub mod tps {
    use super::*;

    pub const TABLE: &str = "tally_tps";
    pub const SERVER_ID: &str = "server_id";
    pub const DATE: &str = "date";
    pub const TPS: &str = "tps";
    pub const PLAYERS_ONLINE: &str = "players_online";
    pub const CPU_USAGE: &str = "cpu_usage";
    pub const RAM_USAGE: &str = "ram_usage";
    pub const ENTITIES: &str = "entities";
    pub const CHUNKS_LOADED: &str = "chunks_loaded";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {SERVER_ID} integer NOT NULL, \
             {DATE} bigint NOT NULL, \
             {TPS} double NOT NULL, \
             {PLAYERS_ONLINE} integer NOT NULL, \
             {CPU_USAGE} double NOT NULL, \
             {RAM_USAGE} bigint NOT NULL, \
             {ENTITIES} integer NOT NULL, \
             {CHUNKS_LOADED} integer NOT NULL)"
        )
    }
}

/// Write-only log of applied schema patches.
///
/// Never consulted when deciding applicability; that is always derived from
/// the physical schema. This exists for operators diagnosing a migration
/// after the fact.
pub mod schema_log {
    use super::*;

    pub const TABLE: &str = "tally_schema_log";
    pub const NAME: &str = "name";
    pub const APPLIED: &str = "applied";

    pub fn create_sql(_dialect: &DialectImpl) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (\
             {NAME} varchar(100) NOT NULL, \
             {APPLIED} bigint NOT NULL)"
        )
    }
}

/// Create every canonical table that does not exist yet, in reference order.
pub async fn create_tables(db: &ExecutorImpl) -> Result<()> {
    let dialect = db.dialect();
    let statements = [
        servers::create_sql(&dialect),
        users::create_sql(&dialect),
        user_info::create_sql(&dialect),
        nicknames::create_sql(&dialect),
        sessions::create_sql(&dialect),
        kills::create_sql(&dialect),
        worlds::create_sql(&dialect),
        world_times::create_sql(&dialect),
        geolocations::create_sql(&dialect),
        command_usage::create_sql(&dialect),
        tps::create_sql(&dialect),
        schema_log::create_sql(&dialect),
    ];
    for sql in &statements {
        debug!("Ensuring table: {}", sql);
        db.execute(sql, vec![]).await?;
    }
    Ok(())
}

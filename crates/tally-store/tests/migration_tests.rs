//! End-to-end migration runs against in-memory SQLite, starting from the
//! historical on-disk layouts the patch sequence has to cope with.

use std::path::PathBuf;

use uuid::Uuid;

use tally_store::core::traits::StatementExecutor;
use tally_store::core::value::SqlValue;
use tally_store::drivers::{ExecutorImpl, SqliteExecutor};
use tally_store::patch::{Patch, PatchSequence, WorldServerScopePatch, WorldServerUuidPatch};
use tally_store::{registry, schema, DbConfig, ErrorKind, Store};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open_db() -> ExecutorImpl {
    init_tracing();
    ExecutorImpl::Sqlite(SqliteExecutor::open_in_memory().unwrap())
}

async fn exec(db: &ExecutorImpl, sql: &str) {
    db.execute(sql, vec![]).await.unwrap();
}

async fn count(db: &ExecutorImpl, sql: &str) -> i64 {
    let rows = db.query(sql, vec![]).await.unwrap();
    rows[0].integer(0).unwrap()
}

#[tokio::test]
async fn store_open_releases_connection_when_migration_fails() {
    init_tracing();
    let path = std::env::temp_dir().join(format!("tally-{}.db", Uuid::new_v4()));
    {
        // A registry table of the wrong shape breaks registration after the
        // connection itself succeeded.
        let db = ExecutorImpl::Sqlite(SqliteExecutor::open(&path).unwrap());
        exec(&db, "CREATE TABLE tally_servers (wrong integer)").await;
        db.close().await;
    }

    let config = DbConfig::Sqlite { path: path.clone() };
    let err = Store::open(&config, Uuid::new_v4(), "Main").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    std::fs::remove_file(&path).unwrap();
}

/// The original single-server layout: no server registry, no per-server
/// scoping anywhere, and the gamemode-times marker table.
async fn build_legacy_schema(db: &ExecutorImpl) {
    exec(
        db,
        "CREATE TABLE tally_users (id INTEGER PRIMARY KEY, uuid varchar(36) NOT NULL, \
         registered bigint NOT NULL, name varchar(16) NOT NULL, \
         opped boolean NOT NULL DEFAULT 0, banned boolean NOT NULL DEFAULT 0)",
    )
    .await;
    exec(
        db,
        "CREATE TABLE tally_nicknames (user_id integer NOT NULL, nickname varchar(75) NOT NULL)",
    )
    .await;
    exec(
        db,
        "CREATE TABLE tally_kills (killer_id integer NOT NULL, victim_id integer NOT NULL, \
         weapon varchar(30) NOT NULL, date bigint NOT NULL)",
    )
    .await;
    exec(
        db,
        "CREATE TABLE tally_command_usage (id INTEGER PRIMARY KEY, \
         command varchar(20) NOT NULL, times_used integer NOT NULL DEFAULT 0)",
    )
    .await;
    exec(
        db,
        "CREATE TABLE tally_tps (date bigint NOT NULL, tps double NOT NULL, \
         players_online integer NOT NULL, cpu_usage double NOT NULL, \
         ram_usage bigint NOT NULL, entities integer NOT NULL, \
         chunks_loaded integer NOT NULL)",
    )
    .await;
    exec(
        db,
        "CREATE TABLE tally_gamemode_times (user_id integer NOT NULL, \
         survival bigint NOT NULL, creative bigint NOT NULL)",
    )
    .await;
}

async fn run_sequence(db: &ExecutorImpl, server_uuid: Uuid) -> usize {
    schema::create_tables(db).await.unwrap();
    registry::ensure_registered(db, server_uuid, "Main").await.unwrap();
    PatchSequence::new(server_uuid).apply_all(db).await.unwrap()
}

#[tokio::test]
async fn fresh_install_needs_no_patches() {
    let db = open_db();
    assert_eq!(run_sequence(&db, Uuid::new_v4()).await, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM tally_schema_log").await, 0);
}

#[tokio::test]
async fn store_open_is_idempotent() {
    init_tracing();
    let config = DbConfig::Sqlite {
        path: PathBuf::from(":memory:"),
    };
    let store = Store::open(&config, Uuid::new_v4(), "Main").await.unwrap();
    assert!(store.server_id() > 0);
    store.close().await;
}

#[tokio::test]
async fn legacy_layout_is_rebuilt_per_server() {
    let db = open_db();
    build_legacy_schema(&db).await;

    exec(
        &db,
        "INSERT INTO tally_users (uuid, registered, name, opped, banned) VALUES \
         ('a1a1a1a1-0000-0000-0000-000000000001', 100, 'Steve', 1, 0), \
         ('a1a1a1a1-0000-0000-0000-000000000002', 200, 'Alex', 0, 1)",
    )
    .await;
    exec(&db, "INSERT INTO tally_nicknames (user_id, nickname) VALUES (1, 'S')").await;
    exec(
        &db,
        "INSERT INTO tally_kills (killer_id, victim_id, weapon, date) VALUES (1, 2, 'Sword', 300)",
    )
    .await;
    exec(&db, "INSERT INTO tally_command_usage (command, times_used) VALUES ('tp', 7)").await;
    exec(
        &db,
        "INSERT INTO tally_tps (date, tps, players_online, cpu_usage, ram_usage, entities, \
         chunks_loaded) VALUES (400, 19.5, 3, 12.0, 1024, 50, 120)",
    )
    .await;

    let server_uuid = Uuid::new_v4();
    assert_eq!(run_sequence(&db, server_uuid).await, 1);
    let server_id = registry::server_id(&db, server_uuid).await.unwrap().unwrap();

    // Global identity survives; per-server state is split out and scoped.
    assert_eq!(count(&db, "SELECT COUNT(*) FROM tally_users").await, 2);
    assert!(!db.has_column("tally_users", "opped").await.unwrap());
    assert_eq!(
        count(
            &db,
            &format!("SELECT COUNT(*) FROM tally_user_info WHERE server_id = {server_id}")
        )
        .await,
        2
    );
    assert_eq!(
        count(
            &db,
            &format!("SELECT COUNT(*) FROM tally_nicknames WHERE server_id = {server_id}")
        )
        .await,
        1
    );
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM tally_kills WHERE session_id = 0").await,
        1
    );
    assert_eq!(
        count(
            &db,
            &format!("SELECT times_used FROM tally_command_usage WHERE server_id = {server_id}")
        )
        .await,
        7
    );
    assert_eq!(
        count(
            &db,
            &format!("SELECT COUNT(*) FROM tally_tps WHERE server_id = {server_id}")
        )
        .await,
        1
    );

    assert!(!db.has_table("tally_gamemode_times").await.unwrap());
    for temp in ["temp_users", "temp_nicknames", "temp_kills", "temp_command_usage", "temp_tps"] {
        assert!(!db.has_table(temp).await.unwrap(), "leftover {}", temp);
    }
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM tally_schema_log WHERE name = 'LegacyLayoutPatch'"
        )
        .await,
        1
    );

    // A second run over the migrated database changes nothing.
    assert_eq!(
        PatchSequence::new(server_uuid).apply_all(&db).await.unwrap(),
        0
    );
}

/// The mid-history layout where worlds are global: one row per name,
/// referenced by every server's world-time facts.
async fn build_global_worlds(db: &ExecutorImpl) {
    schema::create_tables(db).await.unwrap();
    exec(db, "DROP TABLE tally_worlds").await;
    exec(
        db,
        "CREATE TABLE tally_worlds (id INTEGER PRIMARY KEY, world_name varchar(100) NOT NULL)",
    )
    .await;
}

#[tokio::test]
async fn global_worlds_are_split_and_rekeyed_by_uuid() {
    let db = open_db();
    build_global_worlds(&db).await;

    let uuid_a = Uuid::new_v4();
    let uuid_b = Uuid::new_v4();
    let server_a = registry::ensure_registered(&db, uuid_a, "Alpha").await.unwrap();
    let server_b = registry::ensure_registered(&db, uuid_b, "Beta").await.unwrap();

    exec(&db, "INSERT INTO tally_worlds (id, world_name) VALUES (1, 'world'), (2, 'nether')").await;
    // One session per server; both visited 'world', only Alpha the nether.
    exec(
        &db,
        &format!(
            "INSERT INTO tally_sessions (id, user_id, server_id, session_start, session_end) \
             VALUES (10, 1, {server_a}, 0, 1), (20, 1, {server_b}, 0, 1)"
        ),
    )
    .await;
    exec(
        &db,
        &format!(
            "INSERT INTO tally_world_times (user_id, world_id, server_id, session_id) \
             VALUES (1, 1, {server_a}, 10), (1, 2, {server_a}, 10), (1, 1, {server_b}, 20)"
        ),
    )
    .await;

    assert_eq!(
        PatchSequence::new(uuid_a).apply_all(&db).await.unwrap(),
        2
    );

    // One 'world' row per server, 'nether' only for Alpha, nothing global.
    let rows = db
        .query(
            "SELECT world_name, server_uuid FROM tally_worlds ORDER BY world_name, server_uuid",
            vec![],
        )
        .await
        .unwrap();
    let mut seen: Vec<(String, Uuid)> = rows
        .iter()
        .map(|r| (r.text(0).unwrap().to_owned(), r.uuid(1).unwrap()))
        .collect();
    seen.sort();
    let mut expected = vec![
        ("nether".to_owned(), uuid_a),
        ("world".to_owned(), uuid_a),
        ("world".to_owned(), uuid_b),
    ];
    expected.sort();
    assert_eq!(seen, expected);

    // Every fact points at a world row carrying its own server's uuid.
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM tally_world_times t \
             INNER JOIN tally_worlds w ON t.world_id = w.id \
             INNER JOIN tally_servers s ON w.server_uuid = s.uuid \
             WHERE s.id = t.server_id"
        )
        .await,
        3
    );
    assert!(!db.has_table("temp_worlds").await.unwrap());
}

#[tokio::test]
async fn uuid_scoped_worlds_supersede_the_numeric_split() {
    let db = open_db();
    schema::create_tables(&db).await.unwrap();

    // Canonical worlds already carry server_uuid; the split patch must
    // report applied without a server_id column ever having existed.
    let patch = WorldServerScopePatch::new();
    assert!(patch.has_been_applied(&db).await.unwrap());
}

#[tokio::test]
async fn uuid_conversion_fails_before_the_split_ran() {
    let db = open_db();
    build_global_worlds(&db).await;
    exec(&db, "INSERT INTO tally_worlds (id, world_name) VALUES (1, 'world')").await;

    // Out of order: the uuid conversion needs the numeric scope column the
    // split patch adds.
    let mut patch = WorldServerUuidPatch::new();
    assert!(patch.apply(&db).await.is_err());
}

#[tokio::test]
async fn orphaned_geolocation_rows_keep_null_uuid() {
    let db = open_db();
    schema::create_tables(&db).await.unwrap();
    let server_uuid = Uuid::new_v4();
    registry::ensure_registered(&db, server_uuid, "Main").await.unwrap();

    // Old numeric-keyed geolocations; user 99 no longer exists.
    exec(&db, "DROP TABLE tally_geolocations").await;
    exec(
        &db,
        "CREATE TABLE tally_geolocations (id INTEGER PRIMARY KEY, user_id integer NOT NULL, \
         ip varchar(39) NOT NULL, ip_hash varchar(200), geolocation varchar(50) NOT NULL, \
         last_used bigint NOT NULL DEFAULT 0)",
    )
    .await;
    let user_uuid = Uuid::new_v4();
    db.execute(
        "INSERT INTO tally_users (uuid, registered, name) VALUES (?, 1, 'Steve')",
        vec![SqlValue::from(user_uuid)],
    )
    .await
    .unwrap();
    exec(
        &db,
        "INSERT INTO tally_geolocations (user_id, ip, ip_hash, geolocation, last_used) VALUES \
         (1, '1.2.3.4', 'h1', 'Finland', 5), (99, '5.6.7.8', 'h2', 'Sweden', 6)",
    )
    .await;

    assert_eq!(
        PatchSequence::new(server_uuid).apply_all(&db).await.unwrap(),
        1
    );

    let rows = db
        .query(
            "SELECT uuid, geolocation FROM tally_geolocations ORDER BY id",
            vec![],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].uuid(0), Some(user_uuid));
    assert_eq!(rows[1].uuid(0), None);
    assert_eq!(rows[1].text(1), Some("Sweden"));
}

#[tokio::test]
async fn interrupted_rebuild_resumes_from_staged_table() {
    let db = open_db();
    schema::create_tables(&db).await.unwrap();
    let server_uuid = Uuid::new_v4();
    registry::ensure_registered(&db, server_uuid, "Main").await.unwrap();

    // Snapshot of a crash mid-patch: the old table was already renamed away
    // and the new shape created, but no row was copied yet.
    exec(
        &db,
        "CREATE TABLE temp_geolocations (id INTEGER PRIMARY KEY, user_id integer NOT NULL, \
         ip varchar(39) NOT NULL, ip_hash varchar(200), geolocation varchar(50) NOT NULL, \
         last_used bigint NOT NULL DEFAULT 0)",
    )
    .await;
    let user_uuid = Uuid::new_v4();
    db.execute(
        "INSERT INTO tally_users (uuid, registered, name) VALUES (?, 1, 'Steve')",
        vec![SqlValue::from(user_uuid)],
    )
    .await
    .unwrap();
    exec(
        &db,
        "INSERT INTO temp_geolocations (user_id, ip, ip_hash, geolocation, last_used) \
         VALUES (1, '1.2.3.4', 'h1', 'Finland', 5)",
    )
    .await;

    // The leftover temp forces a re-run even though the live table already
    // has the new shape.
    assert_eq!(
        PatchSequence::new(server_uuid).apply_all(&db).await.unwrap(),
        1
    );
    assert!(!db.has_table("temp_geolocations").await.unwrap());
    let rows = db
        .query("SELECT uuid, geolocation FROM tally_geolocations", vec![])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].uuid(0), Some(user_uuid));
}

#[tokio::test]
async fn patch_failure_names_the_patch() {
    let db = open_db();
    schema::create_tables(&db).await.unwrap();
    // Missing registry row: the legacy rebuild cannot resolve its own id.
    exec(&db, "CREATE TABLE tally_gamemode_times (user_id integer NOT NULL)").await;

    let err = PatchSequence::new(Uuid::new_v4())
        .apply_all(&db)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PatchApply);
    assert!(err.to_string().contains("LegacyLayoutPatch"));
}

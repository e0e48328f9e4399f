use roster_core::db::migrations::latest_version;
use roster_core::db::{open_db, open_db_in_memory, DatabaseLocation, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "teams");
    assert_table_exists(&conn, "members");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO members (name, team_id) VALUES ('ghost', 42);",
            [],
        )
        .unwrap_err();
    assert!(DbError::Sqlite(err).is_constraint_violation());
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let location = DatabaseLocation::File(dir.path().join("roster.db"));

    let conn_first = open_db(&location).unwrap();
    conn_first
        .execute("INSERT INTO teams (name) VALUES ('TeamA');", [])
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&location).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let teams: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM teams;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(teams, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&DatabaseLocation::File(path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

//! Migration tests
//!
//! Tests database schema migrations against fresh and existing files.

use rusqlite::Connection;
use tempfile::NamedTempFile;
use tictactoe_storage_sqlite::migrations::{self, SCHEMA_VERSION};
use tictactoe_storage_sqlite::{Database, HeightStore, SettingsStore, SqliteStore};

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
    rows.map(|r| r.unwrap()).collect()
}

#[test]
fn test_fresh_migration() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();

    let tables = table_names(&conn);
    assert!(tables.contains(&"sync_heights".to_string()));
    assert!(tables.contains(&"local_settings".to_string()));
    assert!(tables.contains(&"schema_version".to_string()));
}

#[test]
fn test_migration_idempotency() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    migrations::run_migrations(&conn).unwrap();
    migrations::run_migrations(&conn).unwrap();

    assert_eq!(migrations::get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
}

#[test]
fn test_upgrade_from_v1_keeps_heights() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();

    // Database left behind by a build that only knew about sync heights
    conn.execute_batch(
        r#"
        CREATE TABLE sync_heights (
            chain_id TEXT PRIMARY KEY NOT NULL,
            height TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
        INSERT INTO schema_version (version) VALUES (1);
        INSERT INTO sync_heights VALUES ('aa01', '10', '2024-01-01T00:00:00Z');
        "#,
    )
    .unwrap();
    drop(conn);

    let store = SqliteStore::open(file.path()).unwrap();
    assert_eq!(store.load_height("aa01").unwrap(), Some(10));
    store.save_player_name("alice").unwrap();
    assert_eq!(store.load_player_name().unwrap().as_deref(), Some("alice"));
}

#[test]
fn test_newer_schema_rejected() {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();
    conn.execute_batch(
        "CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
         INSERT INTO schema_version (version) VALUES (99);",
    )
    .unwrap();
    drop(conn);

    assert!(Database::open(file.path()).is_err());
}

#[test]
fn test_heights_survive_reopen() {
    let file = NamedTempFile::new().unwrap();
    {
        let store = SqliteStore::open(file.path()).unwrap();
        store.save_height("aa01", 42).unwrap();
        store.save_mnemonic("abandon about").unwrap();
    }

    let store = SqliteStore::open(file.path()).unwrap();
    assert_eq!(store.load_height("aa01").unwrap(), Some(42));
    assert_eq!(store.load_mnemonic().unwrap().as_deref(), Some("abandon about"));
}

use fleetsched_core::db::migrations::apply_migrations;
use fleetsched_core::db::{open_db, open_db_in_memory, schema_status, DbError};
use fleetsched_core::{RepoError, SqliteTaskRepository};
use rusqlite::Connection;

fn task_columns(conn: &Connection) -> Vec<String> {
    let mut stmt = conn.prepare("PRAGMA table_info(tasks);").unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

/// A view squatting on the `tasks` name survives `CREATE TABLE IF NOT EXISTS`
/// and then fails the index statement of the first step.
fn squat_tasks_name(conn: &Connection) {
    conn.execute_batch("CREATE VIEW tasks AS SELECT 1 AS updated_at;")
        .unwrap();
}

#[test]
fn fresh_store_has_task_document_columns_and_nothing_pending() {
    let conn = open_db_in_memory().unwrap();

    let status = schema_status(&conn).unwrap();
    assert!(status.is_current());
    assert_eq!(status.pending(), 0);

    let columns = task_columns(&conn);
    for expected in ["task_uuid", "version", "document", "created_at", "updated_at"] {
        assert!(columns.iter().any(|name| name == expected), "missing {expected}");
    }
}

#[test]
fn unmigrated_file_reports_pending_steps_until_opened() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    drop(Connection::open(&path).unwrap());

    let raw = Connection::open(&path).unwrap();
    let before = schema_status(&raw).unwrap();
    assert_eq!(before.current, 0);
    assert!(before.pending() >= 1);
    drop(raw);

    let conn = open_db(&path).unwrap();
    let after = schema_status(&conn).unwrap();
    assert_eq!(after.current, before.latest);
    assert_eq!(after.pending(), 0);
}

#[test]
fn failed_step_is_named_and_rolled_back() {
    let mut conn = Connection::open_in_memory().unwrap();
    squat_tasks_name(&conn);

    let err = apply_migrations(&mut conn).unwrap_err();
    match err {
        DbError::MigrationFailed { version, name, .. } => {
            assert_eq!(version, 1);
            assert_eq!(name, "task_documents");
        }
        other => panic!("unexpected error: {other}"),
    }

    let status = schema_status(&conn).unwrap();
    assert_eq!(status.current, 0);
    assert!(!status.is_current());
}

#[test]
fn open_db_surfaces_failed_step_and_leaves_file_unversioned() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("squatted.db");
    squat_tasks_name(&Connection::open(&path).unwrap());

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, DbError::MigrationFailed { version: 1, .. }));

    let raw = Connection::open(&path).unwrap();
    assert_eq!(schema_status(&raw).unwrap().current, 0);
}

#[test]
fn store_from_newer_build_is_refused_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 42;")
        .unwrap();

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 42);
            assert!(latest_supported < db_version);
        }
        other => panic!("unexpected error: {other}"),
    }

    let raw = Connection::open(&path).unwrap();
    assert_eq!(schema_status(&raw).unwrap().current, 42);
    assert!(task_columns(&raw).is_empty());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTaskRepository::try_new(&conn).err().expect("must reject");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

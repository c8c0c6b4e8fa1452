use chrono::NaiveDate;
use fleetsched_core::db::open_db_in_memory;
use fleetsched_core::{
    AssignmentType, ExecutionStatus, RepoError, SqliteTaskRepository, Task, TaskRepository,
    WorkItem, WorkItemStatus,
};
use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

fn day(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

fn sample_task() -> Task {
    Task::new(Uuid::new_v4(), "winter validation").with_work_items(vec![
        WorkItem::new(Uuid::new_v4(), "cold start"),
        WorkItem::new(Uuid::new_v4(), "defrost"),
    ])
}

fn insert_raw(conn: &rusqlite::Connection, task_id: Uuid, document: serde_json::Value) {
    conn.execute(
        "INSERT INTO tasks (task_uuid, version, document) VALUES (?1, 3, ?2);",
        params![task_id.to_string(), document.to_string()],
    )
    .unwrap();
}

#[test]
fn create_and_load_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task = sample_task();

    repo.create_task(&task).unwrap();
    let loaded = repo.load_task(task.id).unwrap();
    assert_eq!(loaded, task);
}

#[test]
fn create_twice_returns_already_exists() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task = sample_task();
    repo.create_task(&task).unwrap();

    let err = repo.create_task(&task).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyExists(id) if id == task.id));
}

#[test]
fn load_missing_task_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = repo.load_task(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn save_bumps_version_and_rejects_stale_writer() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task = sample_task();
    repo.create_task(&task).unwrap();

    let mut first = repo.load_task(task.id).unwrap();
    let mut second = repo.load_task(task.id).unwrap();

    first.title = "first writer".to_string();
    assert_eq!(repo.save_task(&first).unwrap(), 1);

    second.title = "second writer".to_string();
    let err = repo.save_task(&second).unwrap_err();
    assert!(matches!(
        err,
        RepoError::VersionConflict {
            expected: 0,
            actual: 1,
            ..
        }
    ));

    let stored = repo.load_task(task.id).unwrap();
    assert_eq!(stored.title, "first writer");
    assert_eq!(stored.version, 1);
}

#[test]
fn save_missing_task_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task = sample_task();

    let err = repo.save_task(&task).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[test]
fn stored_document_carries_projected_legacy_date() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let mut task = sample_task();
    let item = &mut task.work_items[0];
    item.assignment_id = Some(Uuid::new_v4());
    item.is_assigned = true;
    item.assignment_type = Some(AssignmentType::DateRange);
    item.assigned_start_date = Some(day("2024-01-10"));
    item.assigned_end_date = Some(day("2024-01-12"));
    item.execution_status = ExecutionStatus::Assigned;
    repo.create_task(&task).unwrap();

    let document: String = conn
        .query_row(
            "SELECT document FROM tasks WHERE task_uuid = ?1;",
            [task.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(value["workItems"][0]["assignedDate"], "2024-01-10");
    assert_eq!(value["workItems"][1]["assignedDate"], serde_json::Value::Null);

    let loaded = repo.load_task(task.id).unwrap();
    assert_eq!(loaded.work_items[0].legacy_assigned_date, None);
    assert_eq!(loaded.work_items[0].assigned_date(), Some(day("2024-01-10")));
}

#[test]
fn loads_pre_ledger_documents_in_every_stored_shape() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let item_id = Uuid::new_v4();
    let items = json!([{
        "id": item_id,
        "title": "hot soak",
        "status": "in_progress",
        "isAssigned": true,
        "assignedDate": "2023-08-14",
        "executionStatus": "assigned"
    }]);

    let as_array = Uuid::new_v4();
    insert_raw(&conn, as_array, json!({ "id": as_array, "title": "a", "workItems": items }));
    let as_string = Uuid::new_v4();
    insert_raw(
        &conn,
        as_string,
        json!({ "id": as_string, "title": "b", "workItems": items.to_string() }),
    );
    let as_subtasks = Uuid::new_v4();
    insert_raw(&conn, as_subtasks, json!({ "id": as_subtasks, "title": "c", "subtasks": items }));

    for task_id in [as_array, as_string, as_subtasks] {
        let task = repo.load_task(task_id).unwrap();
        assert_eq!(task.version, 3);
        assert!(task.assignments.is_empty());
        let item = task.work_item(item_id).unwrap();
        assert_eq!(item.status, WorkItemStatus::InProgress);
        assert_eq!(item.legacy_assigned_date, Some(day("2023-08-14")));
        assert_eq!(item.assigned_date(), Some(day("2023-08-14")));
    }
}

#[test]
fn load_rejects_invalid_persisted_schedule() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task_id = Uuid::new_v4();
    insert_raw(
        &conn,
        task_id,
        json!({
            "id": task_id,
            "title": "broken",
            "assignments": [{
                "id": Uuid::new_v4(),
                "type": "date_range",
                "startDate": "2024-01-12",
                "endDate": "2024-01-10",
                "workItemIds": [],
                "assignedBy": "lead",
                "assignedAt": "2024-01-01T00:00:00Z",
                "isActive": true
            }],
            "workItems": []
        }),
    );

    let err = repo.load_task(task_id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn load_rejects_non_array_work_items() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::try_new(&conn).unwrap();
    let task_id = Uuid::new_v4();
    insert_raw(&conn, task_id, json!({ "id": task_id, "workItems": 7 }));

    let err = repo.load_task(task_id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

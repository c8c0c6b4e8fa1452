//! Task aggregate repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Load and replace one task aggregate as a single JSON document.
//! - Guard writes with the aggregate version counter.
//! - Hide stored-document shape variations from callers.
//!
//! # Invariants
//! - `save_task` succeeds only when the stored version equals `task.version`
//!   and then stores `task.version + 1`.
//! - The stored `assignedDate` key is always the read-time projection of the
//!   ledger-backed fields, so pre-ledger readers see a consistent value.
//! - Documents may store work items as an array, as a JSON-encoded string, or
//!   under the older `subtasks` key; all three load identically.

use crate::db::{schema_status, DbError};
use crate::model::assignment::{Assignment, AssignmentId, AssignmentType};
use crate::model::task::{ExecutionStatus, Task, TaskId, WorkItem, WorkItemId, WorkItemStatus};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task aggregate persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(TaskId),
    AlreadyExists(TaskId),
    /// Stored version moved since the aggregate was loaded.
    VersionConflict {
        task_id: TaskId,
        expected: u64,
        actual: u64,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "task already exists: {id}"),
            Self::VersionConflict {
                task_id,
                expected,
                actual,
            } => write!(
                f,
                "task {task_id} was modified concurrently: expected version {expected}, found {actual}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "task repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-aggregate persistence contract.
pub trait TaskRepository {
    /// Inserts a new aggregate at its current version.
    fn create_task(&self, task: &Task) -> RepoResult<()>;
    /// Loads one aggregate, failing with `NotFound` when absent.
    fn load_task(&self, task_id: TaskId) -> RepoResult<Task>;
    /// Replaces one aggregate and returns its new version.
    fn save_task(&self, task: &Task) -> RepoResult<u64>;
}

impl<R: TaskRepository + ?Sized> TaskRepository for &R {
    fn create_task(&self, task: &Task) -> RepoResult<()> {
        (**self).create_task(task)
    }

    fn load_task(&self, task_id: TaskId) -> RepoResult<Task> {
        (**self).load_task(task_id)
    }

    fn save_task(&self, task: &Task) -> RepoResult<u64> {
        (**self).save_task(task)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a migrated connection, rejecting unmigrated ones.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let status = schema_status(conn)?;
        if !status.is_current() {
            return Err(RepoError::UninitializedConnection {
                expected_version: status.latest,
                actual_version: status.current,
            });
        }
        Ok(Self { conn })
    }

    fn stored_version(&self, task_id: TaskId) -> RepoResult<Option<u64>> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM tasks WHERE task_uuid = ?1;",
                [task_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        version.map(version_from_db).transpose()
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<()> {
        validate_task(task)?;
        if self.stored_version(task.id)?.is_some() {
            return Err(RepoError::AlreadyExists(task.id));
        }

        let document = encode_document(task)?;
        self.conn.execute(
            "INSERT INTO tasks (task_uuid, version, document) VALUES (?1, ?2, ?3);",
            params![task.id.to_string(), version_to_db(task.version)?, document],
        )?;
        Ok(())
    }

    fn load_task(&self, task_id: TaskId) -> RepoResult<Task> {
        let row = self
            .conn
            .query_row(
                "SELECT version, document FROM tasks WHERE task_uuid = ?1;",
                [task_id.to_string()],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((version, document)) = row else {
            return Err(RepoError::NotFound(task_id));
        };

        let task = decode_document(task_id, version_from_db(version)?, &document)?;
        validate_task(&task)?;
        Ok(task)
    }

    fn save_task(&self, task: &Task) -> RepoResult<u64> {
        validate_task(task)?;
        let next_version = task.version.checked_add(1).ok_or_else(|| {
            RepoError::InvalidData(format!("task {} version counter overflow", task.id))
        })?;
        let document = encode_document(task)?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                version = ?1,
                document = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?3 AND version = ?4;",
            params![
                version_to_db(next_version)?,
                document,
                task.id.to_string(),
                version_to_db(task.version)?,
            ],
        )?;

        if changed == 0 {
            return match self.stored_version(task.id)? {
                None => Err(RepoError::NotFound(task.id)),
                Some(actual) => Err(RepoError::VersionConflict {
                    task_id: task.id,
                    expected: task.version,
                    actual,
                }),
            };
        }

        Ok(next_version)
    }
}

/// Checks aggregate invariants shared by read and write paths.
fn validate_task(task: &Task) -> RepoResult<()> {
    let mut work_item_ids = HashSet::new();
    for item in &task.work_items {
        if !work_item_ids.insert(item.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate work item id {} in task {}",
                item.id, task.id
            )));
        }
    }

    let mut assignment_ids = HashSet::new();
    for assignment in &task.assignments {
        if !assignment_ids.insert(assignment.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate assignment id {} in task {}",
                assignment.id, task.id
            )));
        }
        assignment.schedule.validate().map_err(|err| {
            RepoError::InvalidData(format!("assignment {}: {err}", assignment.id))
        })?;
        let mut members = HashSet::new();
        if !assignment.work_item_ids.iter().all(|id| members.insert(*id)) {
            return Err(RepoError::InvalidData(format!(
                "assignment {} lists a work item twice",
                assignment.id
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskDocument {
    id: TaskId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    assignments: Vec<Assignment>,
}

/// Stored work item shape. `assigned_date` is the legacy scalar key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkItemDocument {
    id: WorkItemId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: WorkItemStatus,
    #[serde(default)]
    is_executed: bool,
    #[serde(default)]
    assignment_id: Option<AssignmentId>,
    #[serde(default)]
    is_assigned: bool,
    #[serde(default)]
    assignment_type: Option<AssignmentType>,
    #[serde(default)]
    assigned_start_date: Option<NaiveDate>,
    #[serde(default)]
    assigned_end_date: Option<NaiveDate>,
    #[serde(default)]
    assigned_date: Option<NaiveDate>,
    #[serde(default)]
    execution_status: ExecutionStatus,
}

impl From<&WorkItem> for WorkItemDocument {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            status: item.status,
            is_executed: item.is_executed,
            assignment_id: item.assignment_id,
            is_assigned: item.is_assigned,
            assignment_type: item.assignment_type,
            assigned_start_date: item.assigned_start_date,
            assigned_end_date: item.assigned_end_date,
            assigned_date: item.assigned_date(),
            execution_status: item.execution_status,
        }
    }
}

impl From<WorkItemDocument> for WorkItem {
    fn from(doc: WorkItemDocument) -> Self {
        // Ledger-backed items derive the scalar; only pre-ledger items own it.
        let legacy_assigned_date = match doc.assignment_id {
            Some(_) => None,
            None => doc.assigned_date,
        };
        Self {
            id: doc.id,
            title: doc.title,
            status: doc.status,
            is_executed: doc.is_executed,
            assignment_id: doc.assignment_id,
            is_assigned: doc.is_assigned,
            assignment_type: doc.assignment_type,
            assigned_start_date: doc.assigned_start_date,
            assigned_end_date: doc.assigned_end_date,
            legacy_assigned_date,
            execution_status: doc.execution_status,
        }
    }
}

fn encode_document(task: &Task) -> RepoResult<String> {
    let header = TaskDocument {
        id: task.id,
        title: task.title.clone(),
        assignments: task.assignments.clone(),
    };
    let mut value = serde_json::to_value(header).map_err(invalid_json)?;
    let work_items: Vec<WorkItemDocument> =
        task.work_items.iter().map(WorkItemDocument::from).collect();
    if let Value::Object(map) = &mut value {
        map.insert(
            "workItems".to_string(),
            serde_json::to_value(work_items).map_err(invalid_json)?,
        );
    }
    serde_json::to_string(&value).map_err(invalid_json)
}

fn decode_document(task_id: TaskId, version: u64, document: &str) -> RepoResult<Task> {
    let value: Value = serde_json::from_str(document).map_err(invalid_json)?;
    let Value::Object(mut map) = value else {
        return Err(RepoError::InvalidData(format!(
            "task {task_id} document is not a JSON object"
        )));
    };

    let work_items = take_work_items(&mut map)?;
    let header: TaskDocument =
        serde_json::from_value(Value::Object(map)).map_err(invalid_json)?;
    if header.id != task_id {
        return Err(RepoError::InvalidData(format!(
            "task row {task_id} holds document for {}",
            header.id
        )));
    }

    Ok(Task {
        id: header.id,
        title: header.title,
        version,
        assignments: header.assignments,
        work_items: work_items.into_iter().map(WorkItem::from).collect(),
    })
}

fn take_work_items(map: &mut Map<String, Value>) -> RepoResult<Vec<WorkItemDocument>> {
    let raw = map
        .remove("workItems")
        .or_else(|| map.remove("subtasks"))
        .unwrap_or(Value::Null);
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => serde_json::from_value(Value::Array(items)).map_err(invalid_json),
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(invalid_json),
        other => Err(RepoError::InvalidData(format!(
            "work items must be an array or encoded array, got {other}"
        ))),
    }
}

fn invalid_json(err: serde_json::Error) -> RepoError {
    RepoError::InvalidData(format!("task document json: {err}"))
}

fn version_to_db(version: u64) -> RepoResult<i64> {
    i64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("version {version} exceeds storage range")))
}

fn version_from_db(version: i64) -> RepoResult<u64> {
    u64::try_from(version)
        .map_err(|_| RepoError::InvalidData(format!("negative stored version {version}")))
}

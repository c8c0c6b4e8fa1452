//! Assignment scheduling core for the vehicle-testing task dashboard.
//!
//! This crate is the single source of truth for scheduling invariants: which
//! calendar days an assignment covers, which requests conflict, and how the
//! assignment ledger and work item fields change on commit and removal.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod ports;
pub mod repo;
pub mod schedule;
pub mod service;

pub use access::{AccessError, Actor, Role};
pub use config::SchedulingConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::assignment::{
    Assignment, AssignmentId, AssignmentSchedule, AssignmentType, ScheduleShapeError,
};
pub use model::task::{ExecutionStatus, Task, TaskId, WorkItem, WorkItemId, WorkItemStatus};
pub use ports::{Clock, FixedClock, IdGenerator, SystemClock, UuidGenerator};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use schedule::conflict::{
    report_conflicts, ConflictClass, ConflictReport, ExistingClaim, ResourceConflictReason,
    ScheduleConflict, Severity,
};
pub use schedule::expand::{coverage_by_day, describe_span, expand, expand_iso, summarize};
pub use schedule::removal::{LedgerChange, LegacyReset, RemovalReport};
pub use schedule::validate::{AssignmentRequest, FieldError};
pub use service::assignment_service::{
    AssignmentOutcome, AssignmentService, AssignmentServiceError, CommitReceipt, RemovalOutcome,
    RemovalRequest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

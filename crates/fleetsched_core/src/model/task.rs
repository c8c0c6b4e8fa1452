//! Task aggregate and work items.
//!
//! # Responsibility
//! - Own the work items and assignment ledger of one task as a single
//!   persistence unit.
//! - Expose the legacy `assignedDate` scalar as a read-time projection of the
//!   ledger-backed fields.
//!
//! # Invariants
//! - `version` only moves forward; the persistence adapter bumps it on save.
//! - An executed work item (`is_executed`) is never eligible for a new
//!   assignment.
//! - Work items are never deleted by scheduling code.

use super::assignment::{Assignment, AssignmentId, AssignmentType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a task aggregate.
pub type TaskId = Uuid;

/// Stable identifier of a work item (subtask) inside a task.
pub type WorkItemId = Uuid;

/// Workflow status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemStatus {
    #[default]
    Pending,
    InProgress,
    Blocked,
    /// Terminal state.
    Completed,
}

/// Scheduling status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    NotAssigned,
    Assigned,
}

/// One schedulable unit of vehicle-testing work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub id: WorkItemId,
    pub title: String,
    pub status: WorkItemStatus,
    /// Owned by the external execution tracker. Absorbing once `true`.
    pub is_executed: bool,
    /// Back-reference into the task's assignment ledger.
    pub assignment_id: Option<AssignmentId>,
    pub is_assigned: bool,
    pub assignment_type: Option<AssignmentType>,
    pub assigned_start_date: Option<NaiveDate>,
    pub assigned_end_date: Option<NaiveDate>,
    /// Scalar date written before the ledger existed. Only meaningful when
    /// `assignment_id` is `None`.
    pub legacy_assigned_date: Option<NaiveDate>,
    pub execution_status: ExecutionStatus,
}

impl WorkItem {
    /// Creates an unassigned, unexecuted work item.
    pub fn new(id: WorkItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            status: WorkItemStatus::Pending,
            is_executed: false,
            assignment_id: None,
            is_assigned: false,
            assignment_type: None,
            assigned_start_date: None,
            assigned_end_date: None,
            legacy_assigned_date: None,
            execution_status: ExecutionStatus::NotAssigned,
        }
    }

    /// Legacy single-date view consumed by pre-ledger calendar readers.
    ///
    /// Ledger-backed items project their structured start date; items that
    /// predate the ledger fall back to the stored scalar.
    pub fn assigned_date(&self) -> Option<NaiveDate> {
        if self.assignment_id.is_some() {
            return self.assigned_start_date;
        }
        self.legacy_assigned_date
    }

    /// Returns whether the item has been run or closed and must not be
    /// scheduled again.
    pub fn is_locked(&self) -> bool {
        self.is_executed || self.status == WorkItemStatus::Completed
    }

    /// Returns whether every scheduling field is at its unassigned default.
    pub fn is_unassigned(&self) -> bool {
        self.assignment_id.is_none()
            && !self.is_assigned
            && self.assignment_type.is_none()
            && self.assigned_start_date.is_none()
            && self.assigned_end_date.is_none()
            && self.legacy_assigned_date.is_none()
            && self.execution_status == ExecutionStatus::NotAssigned
    }

    /// Resets every scheduling field, structured and legacy, to defaults.
    pub fn clear_schedule(&mut self) {
        self.assignment_id = None;
        self.is_assigned = false;
        self.assignment_type = None;
        self.assigned_start_date = None;
        self.assigned_end_date = None;
        self.legacy_assigned_date = None;
        self.execution_status = ExecutionStatus::NotAssigned;
    }
}

/// Task aggregate root: work items plus their assignment ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Monotonic counter; compared and bumped by the persistence adapter.
    pub version: u64,
    pub assignments: Vec<Assignment>,
    pub work_items: Vec<WorkItem>,
}

impl Task {
    /// Creates an empty aggregate at version 0.
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            version: 0,
            assignments: Vec::new(),
            work_items: Vec::new(),
        }
    }

    pub fn with_work_items(mut self, work_items: Vec<WorkItem>) -> Self {
        self.work_items = work_items;
        self
    }

    pub fn work_item(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.work_items.iter().find(|item| item.id == id)
    }

    pub fn work_item_mut(&mut self, id: WorkItemId) -> Option<&mut WorkItem> {
        self.work_items.iter_mut().find(|item| item.id == id)
    }

    pub fn find_assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.assignments.iter().find(|assignment| assignment.id == id)
    }

    pub fn find_assignment_mut(&mut self, id: AssignmentId) -> Option<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|assignment| assignment.id == id)
    }

    /// Looks up an assignment only when it is still active.
    pub fn active_assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.find_assignment(id)
            .filter(|assignment| assignment.is_active)
    }

    pub fn active_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(|assignment| assignment.is_active)
    }

    /// Deletes one ledger record. Returns `false` when it was already gone.
    pub fn remove_assignment(&mut self, id: AssignmentId) -> bool {
        let before = self.assignments.len();
        self.assignments.retain(|assignment| assignment.id != id);
        self.assignments.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::{ExecutionStatus, WorkItem, WorkItemStatus};
    use crate::model::assignment::AssignmentType;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn assigned_date_projects_structured_start_for_ledger_items() {
        let mut item = WorkItem::new(Uuid::new_v4(), "brake fade run");
        item.assignment_id = Some(Uuid::new_v4());
        item.assigned_start_date = Some(day("2024-01-10"));
        item.assigned_end_date = Some(day("2024-01-12"));
        item.legacy_assigned_date = Some(day("2023-12-01"));

        assert_eq!(item.assigned_date(), Some(day("2024-01-10")));
    }

    #[test]
    fn assigned_date_falls_back_to_legacy_scalar() {
        let mut item = WorkItem::new(Uuid::new_v4(), "cold start");
        item.legacy_assigned_date = Some(day("2023-12-01"));
        assert_eq!(item.assigned_date(), Some(day("2023-12-01")));
    }

    #[test]
    fn completed_or_executed_items_are_locked() {
        let mut item = WorkItem::new(Uuid::new_v4(), "emissions");
        assert!(!item.is_locked());
        item.status = WorkItemStatus::Completed;
        assert!(item.is_locked());
        item.status = WorkItemStatus::InProgress;
        item.is_executed = true;
        assert!(item.is_locked());
    }

    #[test]
    fn clear_schedule_restores_defaults() {
        let mut item = WorkItem::new(Uuid::new_v4(), "noise");
        item.assignment_id = Some(Uuid::new_v4());
        item.is_assigned = true;
        item.assignment_type = Some(AssignmentType::SingleDay);
        item.assigned_start_date = Some(day("2024-01-10"));
        item.assigned_end_date = Some(day("2024-01-10"));
        item.legacy_assigned_date = Some(day("2024-01-10"));
        item.execution_status = ExecutionStatus::Assigned;

        item.clear_schedule();
        assert!(item.is_unassigned());
    }
}

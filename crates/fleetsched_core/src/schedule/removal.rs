//! Detaching work items from the assignment ledger.
//!
//! # Responsibility
//! - Structured removal: drop one member from a ledger record, deleting the
//!   record once its member set is empty.
//! - Legacy removal: reset scheduling fields of items with no resolvable
//!   ledger back-reference.
//!
//! # Invariants
//! - Both entry points are idempotent; repeating them changes nothing.
//! - Work items themselves are never deleted.
//! - An item whose back-reference points at a different record is left
//!   untouched by structured removal.

use crate::model::assignment::AssignmentId;
use crate::model::task::{Task, WorkItemId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What happened to the ledger record during structured removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// Member removed; record survives with `remaining` members.
    Detached { remaining: usize },
    /// Last member removed; record deleted.
    Deleted,
    /// Item was not a member; record untouched.
    NotMember,
}

/// Result of one structured removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalReport {
    pub assignment_id: AssignmentId,
    pub work_item_id: WorkItemId,
    pub ledger: LedgerChange,
    /// Whether the item's scheduling fields were changed.
    pub item_reset: bool,
}

/// Result of one legacy removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyReset {
    Reset,
    AlreadyUnassigned,
}

/// Removal failures. None of them mutate the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalError {
    AssignmentNotFound(AssignmentId),
    WorkItemNotFound(WorkItemId),
    /// Legacy removal refused because the item resolves into the ledger.
    LedgerBacked {
        work_item_id: WorkItemId,
        assignment_id: AssignmentId,
    },
}

impl Display for RemovalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AssignmentNotFound(id) => write!(f, "assignment not found: {id}"),
            Self::WorkItemNotFound(id) => write!(f, "work item not found: {id}"),
            Self::LedgerBacked {
                work_item_id,
                assignment_id,
            } => write!(
                f,
                "work item {work_item_id} is tracked by assignment {assignment_id}; use structured removal"
            ),
        }
    }
}

impl Error for RemovalError {}

/// Detaches `work_item_id` from `assignment_id`.
pub fn remove_from_assignment(
    task: &mut Task,
    assignment_id: AssignmentId,
    work_item_id: WorkItemId,
) -> Result<RemovalReport, RemovalError> {
    if task.work_item(work_item_id).is_none() {
        return Err(RemovalError::WorkItemNotFound(work_item_id));
    }
    if task.find_assignment(assignment_id).is_none() {
        return Err(RemovalError::AssignmentNotFound(assignment_id));
    }

    let ledger = detach_member(task, assignment_id, work_item_id);

    let mut item_reset = false;
    if let Some(item) = task.work_item_mut(work_item_id) {
        let points_here = item.assignment_id.map_or(true, |id| id == assignment_id);
        if points_here && !item.is_unassigned() {
            item.clear_schedule();
            item_reset = true;
        }
    }

    Ok(RemovalReport {
        assignment_id,
        work_item_id,
        ledger,
        item_reset,
    })
}

/// Resets an item that has no resolvable ledger back-reference.
///
/// A back-reference to a record that no longer exists counts as
/// unresolvable and is cleared too.
pub fn reset_legacy(task: &mut Task, work_item_id: WorkItemId) -> Result<LegacyReset, RemovalError> {
    let back_reference = task
        .work_item(work_item_id)
        .ok_or(RemovalError::WorkItemNotFound(work_item_id))?
        .assignment_id;

    if let Some(assignment_id) = back_reference {
        if task.find_assignment(assignment_id).is_some() {
            return Err(RemovalError::LedgerBacked {
                work_item_id,
                assignment_id,
            });
        }
    }

    let item = task
        .work_item_mut(work_item_id)
        .ok_or(RemovalError::WorkItemNotFound(work_item_id))?;
    if item.is_unassigned() {
        return Ok(LegacyReset::AlreadyUnassigned);
    }
    item.clear_schedule();
    Ok(LegacyReset::Reset)
}

/// Drops one member from a ledger record and deletes the record when it
/// becomes empty. Missing records and non-members are no-ops.
pub(crate) fn detach_member(
    task: &mut Task,
    assignment_id: AssignmentId,
    work_item_id: WorkItemId,
) -> LedgerChange {
    let Some(assignment) = task.find_assignment_mut(assignment_id) else {
        return LedgerChange::NotMember;
    };
    if !assignment.detach(work_item_id) {
        return LedgerChange::NotMember;
    }
    let remaining = assignment.work_item_ids.len();
    if remaining == 0 {
        task.remove_assignment(assignment_id);
        return LedgerChange::Deleted;
    }
    LedgerChange::Detached { remaining }
}

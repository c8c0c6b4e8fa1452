//! Committing validated requests into the assignment ledger.
//!
//! # Responsibility
//! - Release claims that an override request has been allowed to take over.
//! - Detach targeted items from records they were previously scheduled by.
//! - Append the new active record with exactly its type's fields.
//!
//! # Invariants
//! - Only reached after conflict classification cleared the request.
//! - Releasing the same claim twice is a no-op.
//! - A record whose member set becomes empty is deleted, not kept inactive.

use super::conflict::{ExistingClaim, ScheduleConflict};
use super::removal::{detach_member, LedgerChange};
use super::validate::ValidatedRequest;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::task::{Task, WorkItemId};
use chrono::{DateTime, Utc};

/// Ledger effects of releasing overridden claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Records that lost at least one member but survive.
    pub detached_from: Vec<AssignmentId>,
    /// Records deleted because their member set became empty.
    pub deleted: Vec<AssignmentId>,
    /// Items whose pre-ledger scalar date was cleared.
    pub legacy_cleared: Vec<WorkItemId>,
}

impl ReleaseSummary {
    fn record(&mut self, assignment_id: AssignmentId, change: LedgerChange) {
        match change {
            LedgerChange::Deleted => {
                self.detached_from.retain(|id| *id != assignment_id);
                push_unique(&mut self.deleted, assignment_id);
            }
            LedgerChange::Detached { .. } => push_unique(&mut self.detached_from, assignment_id),
            LedgerChange::NotMember => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detached_from.is_empty() && self.deleted.is_empty() && self.legacy_cleared.is_empty()
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Releases every overridable claim, scoped to the conflicting work item.
///
/// Blocking conflicts are ignored; callers never reach here with one.
pub fn release_conflicts(task: &mut Task, conflicts: &[ScheduleConflict]) -> ReleaseSummary {
    let mut summary = ReleaseSummary::default();
    for conflict in conflicts {
        let ScheduleConflict::DateOverlap {
            work_item_id,
            existing,
            ..
        } = conflict
        else {
            continue;
        };
        match *existing {
            ExistingClaim::Assignment(assignment_id) => {
                let change = detach_member(task, assignment_id, *work_item_id);
                summary.record(assignment_id, change);
                if let Some(item) = task.work_item_mut(*work_item_id) {
                    if item.assignment_id == Some(assignment_id) {
                        item.clear_schedule();
                    }
                }
            }
            ExistingClaim::LegacyDate(_) => {
                if let Some(item) = task.work_item_mut(*work_item_id) {
                    if item.assignment_id.is_none() && item.legacy_assigned_date.is_some() {
                        item.clear_schedule();
                        push_unique(&mut summary.legacy_cleared, *work_item_id);
                    }
                }
            }
        }
    }
    summary
}

/// Appends a new active record for `request` and returns a copy of it.
///
/// Targeted items still referencing an older record are detached from it
/// first, since an item carries a single back-reference.
pub fn commit_assignment(
    task: &mut Task,
    id: AssignmentId,
    request: &ValidatedRequest,
    assigned_by: &str,
    assigned_at: DateTime<Utc>,
) -> Assignment {
    for work_item_id in &request.work_item_ids {
        let previous = task
            .work_item(*work_item_id)
            .and_then(|item| item.assignment_id);
        if let Some(previous_id) = previous {
            detach_member(task, previous_id, *work_item_id);
        }
    }

    let assignment = Assignment {
        id,
        schedule: request.schedule,
        work_item_ids: request.work_item_ids.clone(),
        assigned_by: assigned_by.to_string(),
        assigned_at,
        is_active: true,
        title: request.title.clone(),
        notes: request.notes.clone(),
        estimated_effort: request.estimated_effort,
    };
    task.assignments.push(assignment.clone());
    assignment
}

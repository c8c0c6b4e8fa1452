//! Conflict detection and classification.
//!
//! # Responsibility
//! - Compare a candidate day-set against each targeted work item's current
//!   commitments.
//! - Classify the full conflict list into one request-level decision.
//!
//! # Invariants
//! - Detection is exhaustive: every targeted item is evaluated, and each
//!   conflicting item yields its own entry.
//! - A locked item (executed or completed) yields exactly one blocking
//!   conflict and is not evaluated further.
//! - Any blocking conflict rejects the whole request, override or not.

use super::expand::{expand, format_day};
use crate::model::assignment::AssignmentId;
use crate::model::task::{Task, WorkItem, WorkItemId};
use chrono::NaiveDate;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Whether a conflict can be accepted with explicit consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictClass {
    Blocking,
    Overridable,
}

/// Wire severity derived from the conflict variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// Why a work item cannot take any new assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceConflictReason {
    AlreadyExecuted,
    Completed,
}

/// Commitment a date overlap collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingClaim {
    /// Active ledger record referenced by the item.
    Assignment(AssignmentId),
    /// Pre-ledger scalar date with no ledger back-reference.
    LegacyDate(NaiveDate),
}

/// One conflict for one targeted work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleConflict {
    Resource {
        work_item_id: WorkItemId,
        reason: ResourceConflictReason,
    },
    DateOverlap {
        work_item_id: WorkItemId,
        existing: ExistingClaim,
        /// Ascending intersection of the candidate and existing day-sets.
        affected_dates: Vec<NaiveDate>,
    },
}

impl ScheduleConflict {
    pub fn class(&self) -> ConflictClass {
        match self {
            Self::Resource { .. } => ConflictClass::Blocking,
            Self::DateOverlap { .. } => ConflictClass::Overridable,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.class() == ConflictClass::Blocking
    }

    pub fn severity(&self) -> Severity {
        match self.class() {
            ConflictClass::Blocking => Severity::High,
            ConflictClass::Overridable => Severity::Medium,
        }
    }

    pub fn can_override(&self) -> bool {
        self.class() == ConflictClass::Overridable
    }

    /// Wire `type` discriminator.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Resource { .. } => "resource_conflict",
            Self::DateOverlap { .. } => "date_overlap",
        }
    }

    pub fn work_item_id(&self) -> WorkItemId {
        match self {
            Self::Resource { work_item_id, .. } | Self::DateOverlap { work_item_id, .. } => {
                *work_item_id
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Resource {
                work_item_id,
                reason: ResourceConflictReason::AlreadyExecuted,
            } => format!("work item {work_item_id} has already been executed"),
            Self::Resource {
                work_item_id,
                reason: ResourceConflictReason::Completed,
            } => format!("work item {work_item_id} is already completed"),
            Self::DateOverlap {
                work_item_id,
                existing,
                affected_dates,
            } => {
                let days = affected_dates
                    .iter()
                    .map(|day| format_day(*day))
                    .collect::<Vec<_>>()
                    .join(", ");
                match existing {
                    ExistingClaim::Assignment(id) => format!(
                        "work item {work_item_id} is already assigned by {id} on {days}"
                    ),
                    ExistingClaim::LegacyDate(_) => {
                        format!("work item {work_item_id} is already scheduled on {days}")
                    }
                }
            }
        }
    }
}

impl Display for ScheduleConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

/// Flat, render-ready view of one conflict for outer layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: Severity,
    pub can_override: bool,
    pub work_item_id: WorkItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_assignment_id: Option<AssignmentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ResourceConflictReason>,
    pub affected_dates: Vec<String>,
    pub message: String,
}

impl From<&ScheduleConflict> for ConflictReport {
    fn from(conflict: &ScheduleConflict) -> Self {
        let (existing_assignment_id, reason, affected_dates) = match conflict {
            ScheduleConflict::Resource { reason, .. } => (None, Some(*reason), Vec::new()),
            ScheduleConflict::DateOverlap {
                existing,
                affected_dates,
                ..
            } => {
                let existing_id = match existing {
                    ExistingClaim::Assignment(id) => Some(*id),
                    ExistingClaim::LegacyDate(_) => None,
                };
                let days = affected_dates.iter().map(|day| format_day(*day)).collect();
                (existing_id, None, days)
            }
        };
        Self {
            kind: conflict.kind_str(),
            severity: conflict.severity(),
            can_override: conflict.can_override(),
            work_item_id: conflict.work_item_id(),
            existing_assignment_id,
            reason,
            affected_dates,
            message: conflict.message(),
        }
    }
}

/// Renders a conflict list for outer layers, order preserved.
pub fn report_conflicts(conflicts: &[ScheduleConflict]) -> Vec<ConflictReport> {
    conflicts.iter().map(ConflictReport::from).collect()
}

/// A targeted work item id is not part of the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownWorkItem(pub WorkItemId);

impl Display for UnknownWorkItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "work item not found: {}", self.0)
    }
}

impl Error for UnknownWorkItem {}

/// Detects conflicts for every targeted work item.
///
/// `candidate_days` must be the ascending expansion of the candidate
/// schedule. Fails only when a targeted id is not in the task.
pub fn detect_conflicts(
    task: &Task,
    work_item_ids: &[WorkItemId],
    candidate_days: &[NaiveDate],
) -> Result<Vec<ScheduleConflict>, UnknownWorkItem> {
    let mut conflicts = Vec::new();
    for work_item_id in work_item_ids {
        let item = task
            .work_item(*work_item_id)
            .ok_or(UnknownWorkItem(*work_item_id))?;
        if let Some(conflict) = conflict_for_item(task, item, candidate_days) {
            conflicts.push(conflict);
        }
    }
    Ok(conflicts)
}

fn conflict_for_item(
    task: &Task,
    item: &WorkItem,
    candidate_days: &[NaiveDate],
) -> Option<ScheduleConflict> {
    if item.is_locked() {
        let reason = if item.is_executed {
            ResourceConflictReason::AlreadyExecuted
        } else {
            ResourceConflictReason::Completed
        };
        return Some(ScheduleConflict::Resource {
            work_item_id: item.id,
            reason,
        });
    }

    match item.assignment_id {
        Some(assignment_id) => {
            let existing = task.active_assignment(assignment_id)?;
            let affected_dates = intersect(&expand(&existing.schedule), candidate_days);
            if affected_dates.is_empty() {
                return None;
            }
            Some(ScheduleConflict::DateOverlap {
                work_item_id: item.id,
                existing: ExistingClaim::Assignment(assignment_id),
                affected_dates,
            })
        }
        None => {
            let legacy = item.legacy_assigned_date?;
            candidate_days.binary_search(&legacy).ok()?;
            Some(ScheduleConflict::DateOverlap {
                work_item_id: item.id,
                existing: ExistingClaim::LegacyDate(legacy),
                affected_dates: vec![legacy],
            })
        }
    }
}

/// Intersects two ascending day lists.
pub fn intersect(existing: &[NaiveDate], candidate: &[NaiveDate]) -> Vec<NaiveDate> {
    existing
        .iter()
        .copied()
        .filter(|day| candidate.binary_search(day).is_ok())
        .collect()
}

/// Request-level outcome of conflict classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    /// No conflicts; commit directly.
    Clear,
    /// At least one blocking conflict; carries every conflict found.
    Blocked(Vec<ScheduleConflict>),
    /// Only overridable conflicts and no consent given.
    NeedsConfirmation(Vec<ScheduleConflict>),
    /// Only overridable conflicts and consent given; these must be released
    /// before commit.
    Override(Vec<ScheduleConflict>),
}

/// Classifies a complete conflict list.
pub fn decide(conflicts: Vec<ScheduleConflict>, override_conflicts: bool) -> ConflictDecision {
    if conflicts.is_empty() {
        return ConflictDecision::Clear;
    }
    if conflicts.iter().any(ScheduleConflict::is_blocking) {
        return ConflictDecision::Blocked(conflicts);
    }
    if override_conflicts {
        ConflictDecision::Override(conflicts)
    } else {
        ConflictDecision::NeedsConfirmation(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decide, detect_conflicts, intersect, ConflictDecision, ConflictReport, ExistingClaim,
        ResourceConflictReason, ScheduleConflict, Severity, UnknownWorkItem,
    };
    use crate::model::assignment::{Assignment, AssignmentSchedule};
    use crate::model::task::{Task, WorkItem, WorkItemStatus};
    use crate::schedule::expand::expand;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
    }

    fn task_with_range_claim(start: &str, end: &str) -> (Task, Uuid, Uuid) {
        let item_id = Uuid::new_v4();
        let assignment_id = Uuid::new_v4();
        let mut item = WorkItem::new(item_id, "ride height");
        item.assignment_id = Some(assignment_id);
        item.is_assigned = true;
        let mut task = Task::new(Uuid::new_v4(), "durability").with_work_items(vec![item]);
        task.assignments.push(Assignment {
            id: assignment_id,
            schedule: AssignmentSchedule::date_range(day(start), day(end)).unwrap(),
            work_item_ids: vec![item_id],
            assigned_by: "lead".to_string(),
            assigned_at: Utc::now(),
            is_active: true,
            title: None,
            notes: None,
            estimated_effort: None,
        });
        (task, item_id, assignment_id)
    }

    #[test]
    fn overlap_reports_exact_intersection() {
        let (task, item_id, assignment_id) = task_with_range_claim("2024-01-10", "2024-01-12");
        let candidate = expand(&AssignmentSchedule::date_range(day("2024-01-11"), day("2024-01-20")).unwrap());

        let conflicts = detect_conflicts(&task, &[item_id], &candidate).unwrap();
        assert_eq!(
            conflicts,
            vec![ScheduleConflict::DateOverlap {
                work_item_id: item_id,
                existing: ExistingClaim::Assignment(assignment_id),
                affected_dates: vec![day("2024-01-11"), day("2024-01-12")],
            }]
        );
    }

    #[test]
    fn disjoint_or_inactive_claims_do_not_conflict() {
        let (mut task, item_id, _) = task_with_range_claim("2024-01-10", "2024-01-12");
        let candidate = vec![day("2024-01-13")];
        assert!(detect_conflicts(&task, &[item_id], &candidate).unwrap().is_empty());

        task.assignments[0].is_active = false;
        let overlapping = vec![day("2024-01-11")];
        assert!(detect_conflicts(&task, &[item_id], &overlapping).unwrap().is_empty());
    }

    #[test]
    fn locked_items_block_and_stop_evaluation() {
        let (mut task, item_id, _) = task_with_range_claim("2024-01-10", "2024-01-12");
        task.work_items[0].is_executed = true;

        let conflicts = detect_conflicts(&task, &[item_id], &[day("2024-01-11")]).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity(), Severity::High);
        assert!(!conflicts[0].can_override());
        assert!(matches!(
            conflicts[0],
            ScheduleConflict::Resource {
                reason: ResourceConflictReason::AlreadyExecuted,
                ..
            }
        ));

        task.work_items[0].is_executed = false;
        task.work_items[0].status = WorkItemStatus::Completed;
        let conflicts = detect_conflicts(&task, &[item_id], &[day("2024-01-11")]).unwrap();
        assert!(matches!(
            conflicts[0],
            ScheduleConflict::Resource {
                reason: ResourceConflictReason::Completed,
                ..
            }
        ));
    }

    #[test]
    fn legacy_scalar_date_inside_candidate_is_overridable() {
        let item_id = Uuid::new_v4();
        let mut item = WorkItem::new(item_id, "wading");
        item.legacy_assigned_date = Some(day("2024-01-11"));
        let task = Task::new(Uuid::new_v4(), "legacy").with_work_items(vec![item]);

        let conflicts =
            detect_conflicts(&task, &[item_id], &[day("2024-01-10"), day("2024-01-11")]).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].can_override());
        let report = ConflictReport::from(&conflicts[0]);
        assert_eq!(report.existing_assignment_id, None);
        assert_eq!(report.affected_dates, vec!["2024-01-11".to_string()]);
    }

    #[test]
    fn unknown_work_item_is_reported() {
        let task = Task::new(Uuid::new_v4(), "empty");
        let missing = Uuid::new_v4();
        assert_eq!(
            detect_conflicts(&task, &[missing], &[day("2024-01-10")]),
            Err(UnknownWorkItem(missing))
        );
    }

    #[test]
    fn decide_prefers_blocking_over_override() {
        let blocking = ScheduleConflict::Resource {
            work_item_id: Uuid::new_v4(),
            reason: ResourceConflictReason::AlreadyExecuted,
        };
        let overridable = ScheduleConflict::DateOverlap {
            work_item_id: Uuid::new_v4(),
            existing: ExistingClaim::Assignment(Uuid::new_v4()),
            affected_dates: vec![day("2024-01-10")],
        };

        let decision = decide(vec![overridable.clone(), blocking.clone()], true);
        assert_eq!(
            decision,
            ConflictDecision::Blocked(vec![overridable.clone(), blocking])
        );
        assert_eq!(
            decide(vec![overridable.clone()], false),
            ConflictDecision::NeedsConfirmation(vec![overridable.clone()])
        );
        assert_eq!(
            decide(vec![overridable.clone()], true),
            ConflictDecision::Override(vec![overridable])
        );
        assert_eq!(decide(Vec::new(), false), ConflictDecision::Clear);
    }

    #[test]
    fn report_serializes_wire_fields() {
        let conflict = ScheduleConflict::Resource {
            work_item_id: Uuid::new_v4(),
            reason: ResourceConflictReason::AlreadyExecuted,
        };
        let value = serde_json::to_value(ConflictReport::from(&conflict)).unwrap();
        assert_eq!(value["type"], "resource_conflict");
        assert_eq!(value["severity"], "high");
        assert_eq!(value["canOverride"], false);
    }

    #[test]
    fn intersect_keeps_existing_order() {
        let existing = vec![day("2024-01-10"), day("2024-01-11"), day("2024-01-12")];
        let candidate = vec![day("2024-01-09"), day("2024-01-12")];
        assert_eq!(intersect(&existing, &candidate), vec![day("2024-01-12")]);
    }
}

//! Assignment scheduling use-case service.
//!
//! # Responsibility
//! - Run the create flow: authorize, validate, load, expand, detect,
//!   decide, commit, project, save.
//! - Run structured and legacy removal against one aggregate.
//! - Serve day coverage to calendar readers using the engine's expansion.
//!
//! # Invariants
//! - Validation, not-found, blocking and pending-confirmation outcomes never
//!   write; mutations happen on a loaded copy that is saved only on success.
//! - Repository errors are returned unchanged; there is no retry.
//! - Writes go through the repository's version check, so a stale aggregate
//!   fails instead of overwriting a concurrent change.

use crate::access::{require_role, AccessError, Actor};
use crate::config::SchedulingConfig;
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::task::{Task, TaskId, WorkItemId};
use crate::ports::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::repo::task_repo::{RepoError, TaskRepository};
use crate::schedule::conflict::{decide, detect_conflicts, ConflictDecision, ScheduleConflict};
use crate::schedule::expand::{coverage_by_day, expand, format_day, summarize_assignment};
use crate::schedule::ledger::{commit_assignment, release_conflicts, ReleaseSummary};
use crate::schedule::projector::project_assignment;
use crate::schedule::removal::{
    remove_from_assignment, reset_legacy, LedgerChange, LegacyReset, RemovalError, RemovalReport,
};
use crate::schedule::validate::{validate_request, AssignmentRequest, FieldError, ValidatedRequest};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for assignment use-cases.
#[derive(Debug)]
pub enum AssignmentServiceError {
    /// Caller is not allowed to schedule.
    Forbidden(AccessError),
    /// Request is malformed; every failing field is listed.
    Validation(Vec<FieldError>),
    TaskNotFound(TaskId),
    WorkItemNotFound(WorkItemId),
    AssignmentNotFound(AssignmentId),
    /// At least one conflict can never be overridden; carries all conflicts.
    BlockingConflict(Vec<ScheduleConflict>),
    /// Persistence-layer failure, unchanged.
    Repo(RepoError),
}

impl Display for AssignmentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forbidden(err) => write!(f, "{err}"),
            Self::Validation(errors) => {
                let fields = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "invalid assignment request: {fields}")
            }
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::WorkItemNotFound(id) => write!(f, "work item not found: {id}"),
            Self::AssignmentNotFound(id) => write!(f, "assignment not found: {id}"),
            Self::BlockingConflict(conflicts) => write!(
                f,
                "assignment rejected by {} conflict(s) that cannot be overridden",
                conflicts.iter().filter(|c| c.is_blocking()).count()
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssignmentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forbidden(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignmentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(task_id) => Self::TaskNotFound(task_id),
            other => Self::Repo(other),
        }
    }
}

impl From<AccessError> for AssignmentServiceError {
    fn from(value: AccessError) -> Self {
        Self::Forbidden(value)
    }
}

impl From<RemovalError> for AssignmentServiceError {
    fn from(value: RemovalError) -> Self {
        match value {
            RemovalError::AssignmentNotFound(id) => Self::AssignmentNotFound(id),
            RemovalError::WorkItemNotFound(id) => Self::WorkItemNotFound(id),
            RemovalError::LedgerBacked { assignment_id, .. } => {
                Self::AssignmentNotFound(assignment_id)
            }
        }
    }
}

/// Successful commit response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub assignment: Assignment,
    /// Ascending expansion of the committed schedule.
    pub covered_dates: Vec<NaiveDate>,
    pub summary_message: String,
    /// Aggregate version after the write.
    pub version: u64,
    #[serde(skip)]
    pub released: ReleaseSummary,
}

impl CommitReceipt {
    pub fn covered_dates_iso(&self) -> Vec<String> {
        self.covered_dates.iter().map(|day| format_day(*day)).collect()
    }
}

/// Non-error outcomes of a create request.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentOutcome {
    Committed(CommitReceipt),
    /// Only overridable conflicts; resubmit with `overrideConflicts=true`.
    PendingConfirmation(Vec<ScheduleConflict>),
}

impl AssignmentOutcome {
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::PendingConfirmation(_))
    }
}

/// Removal request wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalRequest {
    pub assignment_id: AssignmentId,
    pub work_item_id: WorkItemId,
}

/// Which removal path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Structured(RemovalReport),
    Legacy(LegacyReset),
}

/// Use-case service over one task repository.
pub struct AssignmentService<R: TaskRepository, G = UuidGenerator, C = SystemClock> {
    repo: R,
    ids: G,
    clock: C,
    config: SchedulingConfig,
}

impl<R: TaskRepository> AssignmentService<R> {
    /// Creates a service with random ids, the system clock and defaults.
    pub fn new(repo: R) -> Self {
        Self::with_parts(repo, UuidGenerator, SystemClock, SchedulingConfig::default())
    }
}

impl<R, G, C> AssignmentService<R, G, C>
where
    R: TaskRepository,
    G: IdGenerator,
    C: Clock,
{
    pub fn with_parts(repo: R, ids: G, clock: C, config: SchedulingConfig) -> Self {
        Self {
            repo,
            ids,
            clock,
            config,
        }
    }

    /// Schedules work items per `request`.
    ///
    /// Returns `PendingConfirmation` when only overridable conflicts exist
    /// and the request did not consent to override them.
    pub fn create_assignment(
        &self,
        actor: &Actor,
        task_id: TaskId,
        request: &AssignmentRequest,
    ) -> Result<AssignmentOutcome, AssignmentServiceError> {
        require_role(actor, &self.config.elevated_roles)?;
        let validated = self.validate(task_id, request)?;
        let mut task = self.repo.load_task(task_id)?;

        let covered_dates = expand(&validated.schedule);
        let conflicts = detect_conflicts(&task, &validated.work_item_ids, &covered_dates)
            .map_err(|err| AssignmentServiceError::WorkItemNotFound(err.0))?;

        let released = match decide(conflicts, validated.override_conflicts) {
            ConflictDecision::Blocked(conflicts) => {
                warn!(
                    "event=assignment_create module=service status=rejected task={} conflicts={} blocking={}",
                    task_id,
                    conflicts.len(),
                    conflicts.iter().filter(|c| c.is_blocking()).count()
                );
                return Err(AssignmentServiceError::BlockingConflict(conflicts));
            }
            ConflictDecision::NeedsConfirmation(conflicts) => {
                info!(
                    "event=assignment_create module=service status=pending_confirmation task={} conflicts={}",
                    task_id,
                    conflicts.len()
                );
                return Ok(AssignmentOutcome::PendingConfirmation(conflicts));
            }
            ConflictDecision::Override(conflicts) => release_conflicts(&mut task, &conflicts),
            ConflictDecision::Clear => ReleaseSummary::default(),
        };

        let assignment = commit_assignment(
            &mut task,
            self.ids.next_assignment_id(),
            &validated,
            &actor.user_id,
            self.clock.now(),
        );
        project_assignment(&mut task, &assignment)
            .map_err(|err| AssignmentServiceError::WorkItemNotFound(err.0))?;
        let version = self.repo.save_task(&task)?;

        info!(
            "event=assignment_create module=service status=ok task={} assignment={} type={} items={} days={} released={} deleted={} version={}",
            task_id,
            assignment.id,
            assignment.kind(),
            assignment.work_item_ids.len(),
            covered_dates.len(),
            released.detached_from.len(),
            released.deleted.len(),
            version
        );

        Ok(AssignmentOutcome::Committed(CommitReceipt {
            summary_message: summarize_assignment(&assignment),
            assignment,
            covered_dates,
            version,
            released,
        }))
    }

    /// Dry run: reports the conflicts `request` would meet. Never writes.
    pub fn check_assignment(
        &self,
        actor: &Actor,
        task_id: TaskId,
        request: &AssignmentRequest,
    ) -> Result<Vec<ScheduleConflict>, AssignmentServiceError> {
        require_role(actor, &self.config.elevated_roles)?;
        let validated = self.validate(task_id, request)?;
        let task = self.repo.load_task(task_id)?;
        detect_conflicts(&task, &validated.work_item_ids, &expand(&validated.schedule))
            .map_err(|err| AssignmentServiceError::WorkItemNotFound(err.0))
    }

    /// Detaches one work item from one assignment.
    ///
    /// When the assignment id no longer resolves, the item's scheduling
    /// fields are reset through the legacy path instead.
    pub fn remove_work_item(
        &self,
        actor: &Actor,
        task_id: TaskId,
        removal: &RemovalRequest,
    ) -> Result<RemovalOutcome, AssignmentServiceError> {
        require_role(actor, &self.config.elevated_roles)?;
        let mut task = self.repo.load_task(task_id)?;

        let outcome = match remove_from_assignment(
            &mut task,
            removal.assignment_id,
            removal.work_item_id,
        ) {
            Ok(report) => RemovalOutcome::Structured(report),
            Err(RemovalError::AssignmentNotFound(missing)) => {
                warn!(
                    "event=assignment_remove module=service status=fallback task={} assignment={} item={}",
                    task_id, missing, removal.work_item_id
                );
                match reset_legacy(&mut task, removal.work_item_id) {
                    Ok(reset) => RemovalOutcome::Legacy(reset),
                    // Tracked by a different record; the requested id stays unresolved.
                    Err(RemovalError::LedgerBacked { .. }) => {
                        return Err(AssignmentServiceError::AssignmentNotFound(missing))
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Err(err) => return Err(err.into()),
        };

        self.persist_removal(task, outcome)
    }

    /// Unassigns one work item, choosing the removal path from its state.
    pub fn unassign_work_item(
        &self,
        actor: &Actor,
        task_id: TaskId,
        work_item_id: WorkItemId,
    ) -> Result<RemovalOutcome, AssignmentServiceError> {
        require_role(actor, &self.config.elevated_roles)?;
        let mut task = self.repo.load_task(task_id)?;

        let back_reference = task
            .work_item(work_item_id)
            .ok_or(AssignmentServiceError::WorkItemNotFound(work_item_id))?
            .assignment_id
            .filter(|id| task.find_assignment(*id).is_some());

        let outcome = match back_reference {
            Some(assignment_id) => RemovalOutcome::Structured(remove_from_assignment(
                &mut task,
                assignment_id,
                work_item_id,
            )?),
            None => RemovalOutcome::Legacy(reset_legacy(&mut task, work_item_id)?),
        };

        self.persist_removal(task, outcome)
    }

    /// Day to active-assignment coverage for calendar rendering.
    pub fn coverage(
        &self,
        task_id: TaskId,
    ) -> Result<BTreeMap<NaiveDate, Vec<AssignmentId>>, AssignmentServiceError> {
        let task = self.repo.load_task(task_id)?;
        Ok(coverage_by_day(&task.assignments))
    }

    /// Loads one aggregate as stored.
    pub fn load_task(&self, task_id: TaskId) -> Result<Task, AssignmentServiceError> {
        Ok(self.repo.load_task(task_id)?)
    }

    fn validate(
        &self,
        task_id: TaskId,
        request: &AssignmentRequest,
    ) -> Result<ValidatedRequest, AssignmentServiceError> {
        validate_request(request, self.config.max_duration_days).map_err(|errors| {
            warn!(
                "event=assignment_validate module=service status=invalid task={} fields={}",
                task_id,
                errors.len()
            );
            AssignmentServiceError::Validation(errors)
        })
    }

    fn persist_removal(
        &self,
        task: Task,
        outcome: RemovalOutcome,
    ) -> Result<RemovalOutcome, AssignmentServiceError> {
        let changed = match outcome {
            RemovalOutcome::Structured(report) => {
                report.item_reset || report.ledger != LedgerChange::NotMember
            }
            RemovalOutcome::Legacy(reset) => reset == LegacyReset::Reset,
        };
        if !changed {
            info!(
                "event=assignment_remove module=service status=noop task={}",
                task.id
            );
            return Ok(outcome);
        }

        let version = self.repo.save_task(&task)?;
        info!(
            "event=assignment_remove module=service status=ok task={} outcome={:?} version={}",
            task.id, outcome, version
        );
        Ok(outcome)
    }
}

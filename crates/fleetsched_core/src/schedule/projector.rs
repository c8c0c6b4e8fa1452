//! Projection of committed assignments onto work item fields.
//!
//! # Invariants
//! - Every member of the committed record ends up `is_assigned` with a
//!   back-reference to it.
//! - `single_day` projects the same date into start and end.
//! - The legacy scalar is not written; `WorkItem::assigned_date` derives it
//!   from the structured fields at read time.

use super::conflict::UnknownWorkItem;
use crate::model::assignment::Assignment;
use crate::model::task::{ExecutionStatus, Task};

/// Writes `assignment`'s outcome onto each member. Returns the member count.
pub fn project_assignment(task: &mut Task, assignment: &Assignment) -> Result<usize, UnknownWorkItem> {
    for work_item_id in &assignment.work_item_ids {
        let item = task
            .work_item_mut(*work_item_id)
            .ok_or(UnknownWorkItem(*work_item_id))?;
        item.assignment_id = Some(assignment.id);
        item.is_assigned = true;
        item.assignment_type = Some(assignment.kind());
        item.assigned_start_date = Some(assignment.schedule.start_date());
        item.assigned_end_date = Some(assignment.schedule.end_date());
        item.legacy_assigned_date = None;
        item.execution_status = ExecutionStatus::Assigned;
    }
    Ok(assignment.work_item_ids.len())
}

#[cfg(test)]
mod tests {
    use super::project_assignment;
    use crate::model::assignment::{Assignment, AssignmentSchedule, AssignmentType};
    use crate::model::task::{ExecutionStatus, Task, WorkItem};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn projects_range_and_legacy_view() {
        let id = Uuid::new_v4();
        let mut legacy = WorkItem::new(id, "climate chamber");
        legacy.legacy_assigned_date = Some(day("2023-05-05"));
        let mut task = Task::new(Uuid::new_v4(), "t").with_work_items(vec![legacy]);
        let assignment = Assignment {
            id: Uuid::new_v4(),
            schedule: AssignmentSchedule::date_range(day("2024-01-10"), day("2024-01-12")).unwrap(),
            work_item_ids: vec![id],
            assigned_by: "lead".to_string(),
            assigned_at: Utc::now(),
            is_active: true,
            title: None,
            notes: None,
            estimated_effort: None,
        };

        assert_eq!(project_assignment(&mut task, &assignment), Ok(1));
        let item = task.work_item(id).unwrap();
        assert_eq!(item.assignment_id, Some(assignment.id));
        assert_eq!(item.assignment_type, Some(AssignmentType::DateRange));
        assert_eq!(item.assigned_start_date, Some(day("2024-01-10")));
        assert_eq!(item.assigned_end_date, Some(day("2024-01-12")));
        assert_eq!(item.execution_status, ExecutionStatus::Assigned);
        assert_eq!(item.assigned_date(), Some(day("2024-01-10")));
    }
}

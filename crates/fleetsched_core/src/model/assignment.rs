//! Assignment ledger records.
//!
//! # Responsibility
//! - Define the schedule shapes an assignment can take.
//! - Keep type-dependent fields consistent with the declared type.
//!
//! # Invariants
//! - `DateRange` has `start <= end`.
//! - `DurationDays` has `duration_days >= 1` and a stored `end` equal to
//!   `start + (duration_days - 1)` days.
//! - `work_item_ids` never contains duplicates.

use super::task::WorkItemId;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one ledger record.
pub type AssignmentId = Uuid;

/// Wire discriminator for assignment schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    SingleDay,
    DateRange,
    DurationDays,
}

impl AssignmentType {
    /// Stable string id used in requests and stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleDay => "single_day",
            Self::DateRange => "date_range",
            Self::DurationDays => "duration_days",
        }
    }

    /// Parses the wire discriminator. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single_day" => Some(Self::SingleDay),
            "date_range" => Some(Self::DateRange),
            "duration_days" => Some(Self::DurationDays),
            _ => None,
        }
    }
}

impl Display for AssignmentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-dependent schedule fields of an assignment.
///
/// Serialized internally tagged as `type` so the stored shape matches the
/// external request naming (`date`, `startDate`, `endDate`, `durationDays`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentSchedule {
    SingleDay {
        date: NaiveDate,
    },
    DateRange {
        #[serde(rename = "startDate")]
        start: NaiveDate,
        #[serde(rename = "endDate")]
        end: NaiveDate,
    },
    DurationDays {
        #[serde(rename = "startDate")]
        start: NaiveDate,
        #[serde(rename = "durationDays")]
        duration_days: u32,
        /// Derived on construction so range queries never recompute it.
        #[serde(rename = "endDate")]
        end: NaiveDate,
    },
}

/// Shape violations for schedule construction or persisted schedules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleShapeError {
    /// `date_range` start is after its end.
    InvertedRange { start: NaiveDate, end: NaiveDate },
    /// `duration_days` is zero.
    EmptyDuration,
    /// `duration_days` end cannot be represented.
    DurationOverflow { start: NaiveDate, duration_days: u32 },
    /// Stored `duration_days` end disagrees with its derived value.
    EndMismatch { stored: NaiveDate, derived: NaiveDate },
}

impl Display for ScheduleShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedRange { start, end } => {
                write!(f, "start date {start} is after end date {end}")
            }
            Self::EmptyDuration => write!(f, "duration must be at least one day"),
            Self::DurationOverflow {
                start,
                duration_days,
            } => write!(
                f,
                "duration of {duration_days} days from {start} is out of calendar range"
            ),
            Self::EndMismatch { stored, derived } => write!(
                f,
                "stored end date {stored} does not match derived end date {derived}"
            ),
        }
    }
}

impl Error for ScheduleShapeError {}

impl AssignmentSchedule {
    pub fn single_day(date: NaiveDate) -> Self {
        Self::SingleDay { date }
    }

    /// Builds an inclusive range, rejecting `start > end`.
    pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Self, ScheduleShapeError> {
        if start > end {
            return Err(ScheduleShapeError::InvertedRange { start, end });
        }
        Ok(Self::DateRange { start, end })
    }

    /// Builds a duration schedule and derives its end date.
    pub fn duration_days(start: NaiveDate, duration_days: u32) -> Result<Self, ScheduleShapeError> {
        let end = derive_duration_end(start, duration_days)?;
        Ok(Self::DurationDays {
            start,
            duration_days,
            end,
        })
    }

    pub fn kind(&self) -> AssignmentType {
        match self {
            Self::SingleDay { .. } => AssignmentType::SingleDay,
            Self::DateRange { .. } => AssignmentType::DateRange,
            Self::DurationDays { .. } => AssignmentType::DurationDays,
        }
    }

    /// First covered day. For `single_day` this is the single date.
    pub fn start_date(&self) -> NaiveDate {
        match *self {
            Self::SingleDay { date } => date,
            Self::DateRange { start, .. } | Self::DurationDays { start, .. } => start,
        }
    }

    /// Last covered day. For `single_day` this is the single date.
    pub fn end_date(&self) -> NaiveDate {
        match *self {
            Self::SingleDay { date } => date,
            Self::DateRange { end, .. } | Self::DurationDays { end, .. } => end,
        }
    }

    /// Re-checks shape invariants, used on read paths.
    pub fn validate(&self) -> Result<(), ScheduleShapeError> {
        match *self {
            Self::SingleDay { .. } => Ok(()),
            Self::DateRange { start, end } => {
                if start > end {
                    Err(ScheduleShapeError::InvertedRange { start, end })
                } else {
                    Ok(())
                }
            }
            Self::DurationDays {
                start,
                duration_days,
                end,
            } => {
                let derived = derive_duration_end(start, duration_days)?;
                if derived != end {
                    return Err(ScheduleShapeError::EndMismatch {
                        stored: end,
                        derived,
                    });
                }
                Ok(())
            }
        }
    }
}

fn derive_duration_end(start: NaiveDate, duration_days: u32) -> Result<NaiveDate, ScheduleShapeError> {
    if duration_days == 0 {
        return Err(ScheduleShapeError::EmptyDuration);
    }
    start
        .checked_add_days(Days::new(u64::from(duration_days - 1)))
        .ok_or(ScheduleShapeError::DurationOverflow {
            start,
            duration_days,
        })
}

/// One ledger record committing a set of work items to a set of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    #[serde(flatten)]
    pub schedule: AssignmentSchedule,
    /// Member set in request order.
    pub work_item_ids: Vec<WorkItemId>,
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    /// Always `true` for records this crate commits; `false` only on stored
    /// records deactivated by an older writer, which conflict checks ignore.
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Estimated effort in hours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<f64>,
}

impl Assignment {
    pub fn kind(&self) -> AssignmentType {
        self.schedule.kind()
    }

    pub fn has_member(&self, work_item_id: WorkItemId) -> bool {
        self.work_item_ids.contains(&work_item_id)
    }

    /// Removes one member. Returns `false` when it was not a member.
    pub fn detach(&mut self, work_item_id: WorkItemId) -> bool {
        let before = self.work_item_ids.len();
        self.work_item_ids.retain(|id| *id != work_item_id);
        self.work_item_ids.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.work_item_ids.is_empty()
    }
}

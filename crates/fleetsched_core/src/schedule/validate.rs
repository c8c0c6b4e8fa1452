//! Structural validation of assignment-creation requests.
//!
//! # Responsibility
//! - Reject malformed requests before any conflict analysis.
//! - Convert the loosely typed wire request into a typed schedule.
//!
//! # Invariants
//! - Validation is exhaustive: every failing field is reported.
//! - A validated request always carries a non-empty, duplicate-free member set.

use crate::model::assignment::{AssignmentSchedule, AssignmentType};
use crate::model::task::WorkItemId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static ISO_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso day regex"));

/// Wire shape of an assignment-creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub assignment_type: Option<String>,
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub work_item_ids: Vec<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub estimated_effort: Option<f64>,
    #[serde(default)]
    pub override_conflicts: bool,
}

impl AssignmentRequest {
    pub fn single_day(date: &str, work_item_ids: &[WorkItemId]) -> Self {
        Self {
            assignment_type: Some(AssignmentType::SingleDay.as_str().to_string()),
            date: Some(date.to_string()),
            work_item_ids: ids_to_strings(work_item_ids),
            ..Self::default()
        }
    }

    pub fn date_range(start: &str, end: &str, work_item_ids: &[WorkItemId]) -> Self {
        Self {
            assignment_type: Some(AssignmentType::DateRange.as_str().to_string()),
            start_date: Some(start.to_string()),
            end_date: Some(end.to_string()),
            work_item_ids: ids_to_strings(work_item_ids),
            ..Self::default()
        }
    }

    pub fn duration_days(start: &str, duration_days: i64, work_item_ids: &[WorkItemId]) -> Self {
        Self {
            assignment_type: Some(AssignmentType::DurationDays.as_str().to_string()),
            start_date: Some(start.to_string()),
            duration_days: Some(duration_days),
            work_item_ids: ids_to_strings(work_item_ids),
            ..Self::default()
        }
    }

    /// Marks the request as consenting to override overridable conflicts.
    pub fn with_override(mut self) -> Self {
        self.override_conflicts = true;
        self
    }
}

fn ids_to_strings(ids: &[WorkItemId]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Request after structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub schedule: AssignmentSchedule,
    /// Deduplicated, request order preserved.
    pub work_item_ids: Vec<WorkItemId>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub estimated_effort: Option<f64>,
    pub override_conflicts: bool,
}

/// Validates `request` against its declared type.
///
/// `max_duration_days` is the upper sanity bound for `duration_days`.
pub fn validate_request(
    request: &AssignmentRequest,
    max_duration_days: u32,
) -> Result<ValidatedRequest, Vec<FieldError>> {
    let mut errors = Vec::new();

    let schedule = match request.assignment_type.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(FieldError::new("assignmentType", "is required"));
            None
        }
        Some(raw) => match AssignmentType::parse(raw) {
            Some(kind) => validate_schedule(kind, request, max_duration_days, &mut errors),
            None => {
                errors.push(FieldError::new(
                    "assignmentType",
                    format!(
                        "`{raw}` is not one of single_day, date_range, duration_days"
                    ),
                ));
                None
            }
        },
    };

    let work_item_ids = validate_work_item_ids(&request.work_item_ids, &mut errors);

    if let Some(effort) = request.estimated_effort {
        if !effort.is_finite() || effort < 0.0 {
            errors.push(FieldError::new(
                "estimatedEffort",
                "must be a non-negative number",
            ));
        }
    }

    match schedule {
        Some(schedule) if errors.is_empty() => Ok(ValidatedRequest {
            schedule,
            work_item_ids,
            title: normalize_text(request.title.as_deref()),
            notes: normalize_text(request.notes.as_deref()),
            estimated_effort: request.estimated_effort,
            override_conflicts: request.override_conflicts,
        }),
        _ => Err(errors),
    }
}

fn validate_schedule(
    kind: AssignmentType,
    request: &AssignmentRequest,
    max_duration_days: u32,
    errors: &mut Vec<FieldError>,
) -> Option<AssignmentSchedule> {
    match kind {
        AssignmentType::SingleDay => {
            let date = required_day("date", request.date.as_deref(), errors)?;
            Some(AssignmentSchedule::single_day(date))
        }
        AssignmentType::DateRange => {
            let start = required_day("startDate", request.start_date.as_deref(), errors);
            let end = required_day("endDate", request.end_date.as_deref(), errors);
            let (start, end) = (start?, end?);
            match AssignmentSchedule::date_range(start, end) {
                Ok(schedule) => Some(schedule),
                Err(_) => {
                    errors.push(FieldError::new(
                        "endDate",
                        "must not be before startDate",
                    ));
                    None
                }
            }
        }
        AssignmentType::DurationDays => {
            let start = required_day("startDate", request.start_date.as_deref(), errors);
            let duration = match request.duration_days {
                None => {
                    errors.push(FieldError::new("durationDays", "is required"));
                    None
                }
                Some(value) if value < 1 => {
                    errors.push(FieldError::new("durationDays", "must be at least 1"));
                    None
                }
                Some(value) if value > i64::from(max_duration_days) => {
                    errors.push(FieldError::new(
                        "durationDays",
                        format!("must not exceed {max_duration_days}"),
                    ));
                    None
                }
                Some(value) => u32::try_from(value).ok(),
            };
            let (start, duration) = (start?, duration?);
            match AssignmentSchedule::duration_days(start, duration) {
                Ok(schedule) => Some(schedule),
                Err(err) => {
                    errors.push(FieldError::new("durationDays", err.to_string()));
                    None
                }
            }
        }
    }
}

fn required_day(
    field: &'static str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        errors.push(FieldError::new(field, "is required"));
        return None;
    };
    match parse_day(raw) {
        Some(day) => Some(day),
        None => {
            errors.push(FieldError::new(
                field,
                format!("`{raw}` is not a valid YYYY-MM-DD date"),
            ));
            None
        }
    }
}

/// Parses a strict `YYYY-MM-DD` calendar day.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    if !ISO_DAY_RE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn validate_work_item_ids(raw_ids: &[String], errors: &mut Vec<FieldError>) -> Vec<WorkItemId> {
    if raw_ids.is_empty() {
        errors.push(FieldError::new(
            "workItemIds",
            "must contain at least one work item",
        ));
        return Vec::new();
    }

    let mut ids: Vec<WorkItemId> = Vec::with_capacity(raw_ids.len());
    for (index, raw) in raw_ids.iter().enumerate() {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            Err(_) => errors.push(FieldError::new(
                format!("workItemIds[{index}]"),
                format!("`{raw}` is not a valid work item id"),
            )),
        }
    }
    ids
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

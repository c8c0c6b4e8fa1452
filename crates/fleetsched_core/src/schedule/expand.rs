//! Day-set expansion and coverage summaries.
//!
//! # Invariants
//! - Output is ascending, contiguous and duplicate-free.
//! - `date_range` output length is `end - start + 1` days.
//! - `duration_days` output length is `duration_days`.

use crate::model::assignment::{Assignment, AssignmentId, AssignmentSchedule};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// ISO calendar day format used on the wire.
pub const ISO_DAY_FORMAT: &str = "%Y-%m-%d";

/// Expands a schedule into the ordered calendar days it covers.
pub fn expand(schedule: &AssignmentSchedule) -> Vec<NaiveDate> {
    match *schedule {
        AssignmentSchedule::SingleDay { date } => vec![date],
        AssignmentSchedule::DateRange { start, end } => {
            start.iter_days().take_while(|day| *day <= end).collect()
        }
        AssignmentSchedule::DurationDays {
            start,
            duration_days,
            ..
        } => start.iter_days().take(duration_days as usize).collect(),
    }
}

/// Same as [`expand`], rendered as ISO day strings.
pub fn expand_iso(schedule: &AssignmentSchedule) -> Vec<String> {
    expand(schedule)
        .into_iter()
        .map(format_day)
        .collect()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(ISO_DAY_FORMAT).to_string()
}

/// Returns whether `day` falls inside the schedule.
pub fn covers(schedule: &AssignmentSchedule, day: NaiveDate) -> bool {
    schedule.start_date() <= day && day <= schedule.end_date()
}

/// Human-readable coverage summary, e.g. `2 items over 3 days`.
///
/// Shared by commit responses and calendar rendering.
pub fn summarize(item_count: usize, day_count: usize) -> String {
    format!(
        "{item_count} {} over {day_count} {}",
        plural(item_count, "item", "items"),
        plural(day_count, "day", "days")
    )
}

/// Summary of one committed assignment.
pub fn summarize_assignment(assignment: &Assignment) -> String {
    summarize(
        assignment.work_item_ids.len(),
        expand(&assignment.schedule).len(),
    )
}

/// Short span label: `2024-01-10` or `2024-01-10 to 2024-01-12`.
pub fn describe_span(schedule: &AssignmentSchedule) -> String {
    let start = schedule.start_date();
    let end = schedule.end_date();
    if start == end {
        format_day(start)
    } else {
        format!("{} to {}", format_day(start), format_day(end))
    }
}

/// Maps each covered day to the active assignments claiming it.
///
/// Inactive records are skipped. Ids per day keep ledger order.
pub fn coverage_by_day<'a, I>(assignments: I) -> BTreeMap<NaiveDate, Vec<AssignmentId>>
where
    I: IntoIterator<Item = &'a Assignment>,
{
    let mut coverage: BTreeMap<NaiveDate, Vec<AssignmentId>> = BTreeMap::new();
    for assignment in assignments.into_iter().filter(|a| a.is_active) {
        for day in expand(&assignment.schedule) {
            coverage.entry(day).or_default().push(assignment.id);
        }
    }
    coverage
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::{covers, describe_span, expand, expand_iso, summarize};
    use crate::model::assignment::AssignmentSchedule;
    use chrono::{Days, NaiveDate};

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
    }

    #[test]
    fn single_day_expands_to_itself() {
        let schedule = AssignmentSchedule::single_day(day("2024-01-10"));
        assert_eq!(expand_iso(&schedule), vec!["2024-01-10".to_string()]);
    }

    #[test]
    fn date_range_is_contiguous_inclusive_and_ascending() {
        let starts = ["2024-01-01", "2024-02-27", "2023-12-30", "2024-06-15"];
        for start in starts {
            for span in 0..40u64 {
                let s = day(start);
                let e = s.checked_add_days(Days::new(span)).unwrap();
                let days = expand(&AssignmentSchedule::date_range(s, e).unwrap());

                assert_eq!(days.len() as u64, span + 1);
                assert_eq!(days.first(), Some(&s));
                assert_eq!(days.last(), Some(&e));
                assert!(days.windows(2).all(|w| w[0].succ_opt() == Some(w[1])));
            }
        }
    }

    #[test]
    fn duration_days_length_and_last_day() {
        let s = day("2024-02-27");
        for duration in 1..=60u32 {
            let schedule = AssignmentSchedule::duration_days(s, duration).unwrap();
            let days = expand(&schedule);
            assert_eq!(days.len(), duration as usize);
            assert_eq!(
                days.last().copied(),
                s.checked_add_days(Days::new(u64::from(duration - 1)))
            );
            assert_eq!(days.last().copied(), Some(schedule.end_date()));
        }
    }

    #[test]
    fn range_crosses_leap_day() {
        let schedule =
            AssignmentSchedule::date_range(day("2024-02-28"), day("2024-03-01")).unwrap();
        assert_eq!(
            expand_iso(&schedule),
            vec!["2024-02-28", "2024-02-29", "2024-03-01"]
        );
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(summarize(1, 1), "1 item over 1 day");
        assert_eq!(summarize(2, 3), "2 items over 3 days");
    }

    #[test]
    fn span_and_cover_helpers_agree_with_expansion() {
        let schedule =
            AssignmentSchedule::date_range(day("2024-01-10"), day("2024-01-12")).unwrap();
        assert_eq!(describe_span(&schedule), "2024-01-10 to 2024-01-12");
        for covered in expand(&schedule) {
            assert!(covers(&schedule, covered));
        }
        assert!(!covers(&schedule, day("2024-01-13")));
        assert_eq!(
            describe_span(&AssignmentSchedule::single_day(day("2024-01-10"))),
            "2024-01-10"
        );
    }
}

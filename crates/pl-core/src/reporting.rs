//! Arithmetic shared by the analytics reports

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::parse_optional_date;
use crate::error::CoreError;
use crate::types::TaskState;

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `numerator / denominator * 100`, rounded; 0 when the denominator is 0
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        round2(numerator / denominator * 100.0)
    }
}

/// `total / count`, rounded; 0 when there is nothing to average
pub fn average(total: f64, count: i64) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total / count as f64)
    }
}

/// Overdue: due before `today` and not in a terminal state
pub fn is_overdue(due_date: Option<NaiveDate>, state: &str, today: NaiveDate) -> bool {
    match due_date {
        Some(due) => due < today && !TaskState::is_terminal_str(state),
        None => false,
    }
}

/// Inclusive `[today, today + 7 days]` window
pub fn week_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = today.checked_add_days(Days::new(7)).unwrap_or(NaiveDate::MAX);
    (today, end)
}

/// Days between two dates, when both are known
pub fn duration_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_days()),
        _ => None,
    }
}

/// Raw `start_date`/`end_date` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Inclusive date range; a missing bound does not filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn parse(params: &DateRangeParams) -> Result<Self, CoreError> {
        Ok(Self {
            start_date: parse_optional_date("start_date", params.start_date.as_deref())?,
            end_date: parse_optional_date("end_date", params.end_date.as_deref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_percentage_guards_zero_denominator() {
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(0.0, 0.0), 0.0);
        assert_eq!(percentage(1.0, 3.0), 33.33);
        assert_eq!(percentage(500.0, 1000.0), 50.0);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(10.0, 0), 0.0);
        assert_eq!(average(10.0, 3), 3.33);
    }

    #[test]
    fn test_overdue_excludes_terminal_states_and_today() {
        let today = date("2024-06-10");
        assert!(is_overdue(Some(date("2024-06-09")), "todo", today));
        assert!(!is_overdue(Some(date("2024-06-10")), "todo", today));
        assert!(!is_overdue(Some(date("2024-06-01")), "done", today));
        assert!(!is_overdue(Some(date("2024-06-01")), "completed", today));
        assert!(!is_overdue(Some(date("2024-06-01")), "closed", today));
        assert!(!is_overdue(None, "todo", today));
    }

    #[test]
    fn test_week_window_spans_eight_days() {
        let (start, end) = week_window(date("2024-06-10"));
        assert_eq!(start, date("2024-06-10"));
        assert_eq!(end, date("2024-06-17"));
        assert_eq!(week_window(NaiveDate::MAX).1, NaiveDate::MAX);
    }

    #[test]
    fn test_date_range_parse() {
        let range = DateRange::parse(&DateRangeParams {
            start_date: Some("2024-01-01".into()),
            end_date: Some(String::new()),
        })
        .unwrap();
        assert_eq!(range.start_date, Some(date("2024-01-01")));
        assert_eq!(range.end_date, None);

        assert!(DateRange::parse(&DateRangeParams {
            start_date: Some("yesterday".into()),
            end_date: None,
        })
        .is_err());
    }

    #[test]
    fn test_duration_days() {
        assert_eq!(duration_days(Some(date("2024-01-01")), Some(date("2024-01-31"))), Some(30));
        assert_eq!(duration_days(None, Some(date("2024-01-31"))), None);
    }
}

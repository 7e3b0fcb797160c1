//! Base contract system
//!
//! A contract takes raw request parameters, records every problem it finds
//! in a [`ValidationErrors`] collection and, when there are none, yields the
//! checked value the repositories accept.

use chrono::NaiveDate;
use pl_core::dates::parse_optional_date;
use serde::{Deserialize, Deserializer};
use pl_core::{TextEnum, ValidationErrors};

/// Result of contract validation
pub type ValidationResult<T> = Result<T, ValidationErrors>;

/// Base contract trait
pub trait Contract<T>: Send + Sync {
    type Output;

    /// Validate `input`, producing the checked value
    fn validate(&self, input: T) -> ValidationResult<Self::Output>;
}

/// Finish a validation pass: the built value when nothing was recorded
pub fn finish<T>(errors: ValidationErrors, value: Option<T>) -> ValidationResult<T> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(errors),
    }
}

/// A required text field; absent and blank values are both missing
pub fn required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<String>,
) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.add_required(field);
            None
        }
    }
}

/// A required non-text field
pub fn required<T>(errors: &mut ValidationErrors, field: &'static str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add_required(field);
    }
    value
}

/// An optional text field; blank counts as absent
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn optional_date(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
) -> Option<NaiveDate> {
    match parse_optional_date(field, value) {
        Ok(date) => date,
        Err(err) => {
            errors.add_core(err);
            None
        }
    }
}

pub fn required_date(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
) -> Option<NaiveDate> {
    let blank = value.map_or(true, |v| v.trim().is_empty());
    if blank {
        errors.add_required(field);
        return None;
    }
    optional_date(errors, field, value)
}

/// An optional enumerated value, returned as its canonical string
pub fn optional_enum<E: TextEnum>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
) -> Option<E> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match E::parse_field(field, value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            errors.add_core(err);
            None
        }
    }
}

/// An enumerated value that falls back to `default` when absent
pub fn enum_or<E: TextEnum>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    default: E,
) -> E {
    optional_enum(errors, field, value).unwrap_or(default)
}

pub fn non_negative(errors: &mut ValidationErrors, field: &'static str, value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v < 0.0 || !v.is_finite() => {
            errors.add(field, "must be a non-negative number");
            None
        }
        other => other,
    }
}

/// Deserialize a field that may be absent, `null` or set.
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A clearable text field; `null` and blank both clear it
pub fn clearable_text(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(optional_text)
}

/// A clearable date field; `null` and blank both clear it
pub fn clearable_date(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<Option<String>>,
) -> Option<Option<NaiveDate>> {
    let value = value?;
    let blank = value.as_deref().map_or(true, |v| v.trim().is_empty());
    if blank {
        return Some(None);
    }
    optional_date(errors, field, value.as_deref()).map(Some)
}

/// End date may not precede start date
pub fn date_order(
    errors: &mut ValidationErrors,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    end_field: &'static str,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.add(end_field, "must be on or after the start date");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_core::TaskPriority;

    #[test]
    fn test_required_text_rejects_blank() {
        let mut errors = ValidationErrors::new();
        assert_eq!(required_text(&mut errors, "name", Some("  ".into())), None);
        assert_eq!(required_text(&mut errors, "code", None), None);
        assert_eq!(
            required_text(&mut errors, "title", Some("Docs".into())),
            Some("Docs".to_string())
        );
        assert_eq!(errors.missing_fields(), vec!["code", "name"]);
    }

    #[test]
    fn test_enum_parsing() {
        let mut errors = ValidationErrors::new();
        let priority = enum_or(&mut errors, "priority", None, TaskPriority::Medium);
        assert_eq!(priority, TaskPriority::Medium);
        assert!(errors.is_empty());

        let priority = enum_or(&mut errors, "priority", Some("extreme"), TaskPriority::Medium);
        assert_eq!(priority, TaskPriority::Medium);
        assert!(errors.has_error("priority"));
    }

    #[test]
    fn test_dates() {
        let mut errors = ValidationErrors::new();
        assert_eq!(optional_date(&mut errors, "start_date", Some("")), None);
        assert!(errors.is_empty());

        assert_eq!(required_date(&mut errors, "work_date", None), None);
        assert_eq!(required_date(&mut errors, "due_date", Some("01/02/2024")), None);
        assert_eq!(errors.get("work_date").unwrap()[0], "is required");
        assert_eq!(
            errors.get("due_date").unwrap()[0],
            "must be a date in YYYY-MM-DD format"
        );
    }

    #[test]
    fn test_date_order_and_amounts() {
        let mut errors = ValidationErrors::new();
        let start = NaiveDate::from_ymd_opt(2024, 2, 1);
        date_order(&mut errors, start, NaiveDate::from_ymd_opt(2024, 1, 1), "end_date");
        assert!(errors.has_error("end_date"));

        assert_eq!(non_negative(&mut errors, "hours", Some(-1.0)), None);
        assert_eq!(non_negative(&mut errors, "amount", Some(0.0)), Some(0.0));
        assert!(errors.has_error("hours"));
        assert!(!errors.has_error("amount"));
    }

    #[test]
    fn test_finish() {
        assert_eq!(finish(ValidationErrors::new(), Some(1)), Ok(1));
        let mut errors = ValidationErrors::new();
        errors.add_required("name");
        assert!(finish(errors, Some(1)).is_err());
        assert!(finish::<i32>(ValidationErrors::new(), None).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        due_date: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"due_date":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"due_date":"2024-05-01"}"#).unwrap();

        let mut errors = ValidationErrors::new();
        assert_eq!(clearable_date(&mut errors, "due_date", absent.due_date), None);
        assert_eq!(clearable_date(&mut errors, "due_date", null.due_date), Some(None));
        assert_eq!(
            clearable_date(&mut errors, "due_date", set.due_date),
            Some(NaiveDate::from_ymd_opt(2024, 5, 1))
        );
        assert_eq!(clearable_date(&mut errors, "due_date", Some(Some(" ".into()))), Some(None));
        assert!(errors.is_empty());

        assert_eq!(clearable_date(&mut errors, "due_date", Some(Some("May 1".into()))), None);
        assert!(errors.has_error("due_date"));
        assert_eq!(clearable_text(Some(Some("".into()))), Some(None));
    }
}

//! Core error types for ProjectLedger
//!
//! Field-level validation errors plus the small set of parse failures raised
//! while turning request input into domain values.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised by core parsing helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{field} must be one of: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("{field} must be a date in YYYY-MM-DD format")]
    InvalidDate { field: &'static str, value: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl CoreError {
    /// Field the error is attached to, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            CoreError::InvalidEnum { field, .. } | CoreError::InvalidDate { field, .. } => {
                Some(*field)
            }
            CoreError::Validation(_) => None,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidEnum { .. } => "invalid_enum",
            CoreError::InvalidDate { .. } => "invalid_date",
            CoreError::Validation(_) => "validation_failed",
        }
    }
}

/// Validation errors collection, keyed by field name
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    /// Record a missing required field
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(field, "is required");
    }

    /// Record a parse failure from one of the core helpers
    pub fn add_core(&mut self, err: CoreError) {
        match err.field() {
            Some(field) => {
                let message = err.to_string();
                let message = message
                    .strip_prefix(field)
                    .map(str::trim_start)
                    .unwrap_or(message.as_str())
                    .to_string();
                self.add(field, message);
            }
            None => {
                if let CoreError::Validation(errors) = err {
                    self.merge(errors);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    /// Names of fields reported as missing
    pub fn missing_fields(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|(_, messages)| messages.iter().any(|m| m == "is required"))
            .map(|(field, _)| field.as_str())
            .collect()
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// Turn the collection into a result, `Ok` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add_required("email");
        errors.add("password", "is too short");
        assert!(errors.has_error("email"));
        assert_eq!(errors.missing_fields(), vec!["email"]);
        assert_eq!(
            errors.full_messages(),
            vec!["email is required".to_string(), "password is too short".to_string()]
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_add_core_error_strips_field_name() {
        let mut errors = ValidationErrors::new();
        errors.add_core(CoreError::InvalidDate {
            field: "due_date",
            value: "tomorrow".into(),
        });
        assert_eq!(
            errors.get("due_date"),
            Some(&vec!["must be a date in YYYY-MM-DD format".to_string()])
        );
    }

    #[test]
    fn test_merge() {
        let mut a = ValidationErrors::new();
        a.add("name", "is required");
        let mut b = ValidationErrors::new();
        b.add("name", "is too long");
        b.add_base("something went wrong");
        a.merge(b);
        assert_eq!(a.get("name").map(Vec::len), Some(2));
        assert_eq!(a.base_errors.len(), 1);
    }
}

//! Expense contracts

use pl_core::{ExpenseStatus, Id, TextEnum, ValidationErrors};
use pl_db::{CreateExpenseDto, UpdateExpenseDto};
use serde::Deserialize;

use crate::base::{
    clearable_text, enum_or, finish, non_negative, nullable, optional_date, optional_enum,
    optional_text, required, required_date, required_text, Contract, ValidationResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateExpenseParams {
    pub task_id: Option<Id>,
    pub expense_date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub billable: Option<bool>,
    pub status: Option<String>,
    pub receipt_url: Option<String>,
}

/// Expense against `project_id`, submitted by the session user
pub struct CreateExpenseContract {
    pub project_id: Id,
    pub submitted_by: Id,
}

impl Contract<CreateExpenseParams> for CreateExpenseContract {
    type Output = CreateExpenseDto;

    fn validate(&self, input: CreateExpenseParams) -> ValidationResult<CreateExpenseDto> {
        let mut errors = ValidationErrors::new();

        let description = required_text(&mut errors, "description", input.description);
        let amount = required(&mut errors, "amount", input.amount);
        let amount = non_negative(&mut errors, "amount", amount);
        let expense_date = required_date(&mut errors, "expense_date", input.expense_date.as_deref());
        let status = enum_or(&mut errors, "status", input.status.as_deref(), ExpenseStatus::Pending);

        let dto = description
            .zip(amount)
            .zip(expense_date)
            .map(|((description, amount), expense_date)| CreateExpenseDto {
                project_id: self.project_id,
                task_id: input.task_id,
                submitted_by: self.submitted_by,
                expense_date,
                description,
                amount,
                billable: input.billable.unwrap_or(true),
                status: status.as_str().to_string(),
                receipt_url: optional_text(input.receipt_url),
            });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpenseParams {
    #[serde(default, deserialize_with = "nullable")]
    pub task_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "nullable")]
    pub approved_by: Option<Option<Id>>,
    pub expense_date: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub billable: Option<bool>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub receipt_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub linked_invoice_line_id: Option<Option<Id>>,
}

pub struct UpdateExpenseContract;

impl Contract<UpdateExpenseParams> for UpdateExpenseContract {
    type Output = UpdateExpenseDto;

    fn validate(&self, input: UpdateExpenseParams) -> ValidationResult<UpdateExpenseDto> {
        let mut errors = ValidationErrors::new();

        if matches!(&input.description, Some(d) if d.trim().is_empty()) {
            errors.add("description", "can't be blank");
        }
        let amount = non_negative(&mut errors, "amount", input.amount);
        let expense_date = optional_date(&mut errors, "expense_date", input.expense_date.as_deref());
        let status = optional_enum::<ExpenseStatus>(&mut errors, "status", input.status.as_deref());

        let dto = UpdateExpenseDto {
            task_id: input.task_id,
            approved_by: input.approved_by,
            expense_date,
            description: optional_text(input.description),
            amount,
            billable: input.billable,
            status: status.map(|s| s.as_str().to_string()),
            receipt_url: clearable_text(input.receipt_url),
            linked_invoice_line_id: input.linked_invoice_line_id,
        };
        finish(errors, Some(dto))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract() -> CreateExpenseContract {
        CreateExpenseContract {
            project_id: 2,
            submitted_by: 5,
        }
    }

    #[test]
    fn test_create_expense() {
        let dto = contract()
            .validate(CreateExpenseParams {
                description: Some("Train tickets".into()),
                amount: Some(300.0),
                expense_date: Some("2024-02-01".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(dto.submitted_by, 5);
        assert_eq!(dto.status, "pending");
        assert!(dto.billable);
    }

    #[test]
    fn test_create_expense_missing_fields() {
        let errors = contract()
            .validate(CreateExpenseParams::default())
            .unwrap_err();
        assert_eq!(
            errors.missing_fields(),
            vec!["amount", "description", "expense_date"]
        );
    }

    #[test]
    fn test_update_expense_status() {
        let dto = UpdateExpenseContract
            .validate(UpdateExpenseParams {
                status: Some("reimbursed".into()),
                approved_by: Some(Some(3)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(dto.status.as_deref(), Some("reimbursed"));
        assert_eq!(dto.approved_by, Some(Some(3)));

        let errors = UpdateExpenseContract
            .validate(UpdateExpenseParams {
                status: Some("approved_twice".into()),
                amount: Some(-1.0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(errors.has_error("status"));
        assert!(errors.has_error("amount"));
    }
}

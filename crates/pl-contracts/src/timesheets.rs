//! Timesheet contracts

use pl_core::{Id, TextEnum, TimesheetStatus, ValidationErrors};
use pl_db::{CreateTimesheetDto, UpdateTimesheetDto};
use serde::Deserialize;

use crate::base::{
    clearable_text, enum_or, finish, non_negative, nullable, optional_date, optional_enum,
    optional_text, required, required_date, Contract, ValidationResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTimesheetParams {
    pub task_id: Option<Id>,
    pub user_id: Option<Id>,
    pub work_date: Option<String>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
    pub internal_cost_rate: Option<f64>,
    pub cost_amount: Option<f64>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Time logged on `project_id`; the worker defaults to the session user
pub struct CreateTimesheetContract {
    pub project_id: Id,
    pub session_user: Id,
}

impl Contract<CreateTimesheetParams> for CreateTimesheetContract {
    type Output = CreateTimesheetDto;

    fn validate(&self, input: CreateTimesheetParams) -> ValidationResult<CreateTimesheetDto> {
        let mut errors = ValidationErrors::new();

        let work_date = required_date(&mut errors, "work_date", input.work_date.as_deref());
        let hours = required(&mut errors, "hours", input.hours);
        let hours = non_negative(&mut errors, "hours", hours);
        let rate = non_negative(&mut errors, "internal_cost_rate", input.internal_cost_rate);
        let cost = non_negative(&mut errors, "cost_amount", input.cost_amount);
        let status = enum_or(&mut errors, "status", input.status.as_deref(), TimesheetStatus::Draft);

        let dto = work_date.zip(hours).map(|(work_date, hours)| CreateTimesheetDto {
            project_id: self.project_id,
            task_id: input.task_id,
            user_id: input.user_id.unwrap_or(self.session_user),
            work_date,
            hours,
            billable: input.billable.unwrap_or(true),
            internal_cost_rate: rate,
            cost_amount: cost,
            status: status.as_str().to_string(),
            notes: optional_text(input.notes),
        });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTimesheetParams {
    #[serde(default, deserialize_with = "nullable")]
    pub task_id: Option<Option<Id>>,
    pub work_date: Option<String>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
    pub internal_cost_rate: Option<f64>,
    pub cost_amount: Option<f64>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub linked_invoice_line_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

pub struct UpdateTimesheetContract;

impl Contract<UpdateTimesheetParams> for UpdateTimesheetContract {
    type Output = UpdateTimesheetDto;

    fn validate(&self, input: UpdateTimesheetParams) -> ValidationResult<UpdateTimesheetDto> {
        let mut errors = ValidationErrors::new();

        let work_date = optional_date(&mut errors, "work_date", input.work_date.as_deref());
        let hours = non_negative(&mut errors, "hours", input.hours);
        let rate = non_negative(&mut errors, "internal_cost_rate", input.internal_cost_rate);
        let cost = non_negative(&mut errors, "cost_amount", input.cost_amount);
        let status = optional_enum::<TimesheetStatus>(&mut errors, "status", input.status.as_deref());

        let dto = UpdateTimesheetDto {
            task_id: input.task_id,
            work_date,
            hours,
            billable: input.billable,
            internal_cost_rate: rate,
            cost_amount: cost,
            status: status.map(|s| s.as_str().to_string()),
            linked_invoice_line_id: input.linked_invoice_line_id,
            notes: clearable_text(input.notes),
        };
        finish(errors, Some(dto))
    }
}

//! Project and membership contracts

use pl_core::{Id, ProjectStatus, TextEnum, ValidationErrors};
use pl_db::{CreateProjectDto, UpdateProjectDto};
use serde::Deserialize;

use crate::base::{
    clearable_date, clearable_text, date_order, enum_or, finish, non_negative, nullable,
    optional_date, optional_enum, optional_text, required, required_text, Contract,
    ValidationResult,
};

pub const DEFAULT_MEMBER_ROLE: &str = "Member";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProjectParams {
    pub project_code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub project_manager_id: Option<Id>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub budget_amount: Option<f64>,
}

pub struct CreateProjectContract;

impl Contract<CreateProjectParams> for CreateProjectContract {
    type Output = CreateProjectDto;

    fn validate(&self, input: CreateProjectParams) -> ValidationResult<CreateProjectDto> {
        let mut errors = ValidationErrors::new();

        let project_code = required_text(&mut errors, "project_code", input.project_code);
        let name = required_text(&mut errors, "name", input.name);
        let start_date = optional_date(&mut errors, "start_date", input.start_date.as_deref());
        let end_date = optional_date(&mut errors, "end_date", input.end_date.as_deref());
        date_order(&mut errors, start_date, end_date, "end_date");
        let status = enum_or(&mut errors, "status", input.status.as_deref(), ProjectStatus::Active);
        let budget_amount = non_negative(&mut errors, "budget_amount", input.budget_amount);

        let dto = project_code.zip(name).map(|(project_code, name)| CreateProjectDto {
            project_code: project_code.trim().to_string(),
            name,
            description: optional_text(input.description),
            project_manager_id: input.project_manager_id,
            start_date,
            end_date,
            status: status.as_str().to_string(),
            budget_amount: budget_amount.unwrap_or(0.0),
        });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectParams {
    pub project_code: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub project_manager_id: Option<Option<Id>>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    pub status: Option<String>,
    pub budget_amount: Option<f64>,
}

pub struct UpdateProjectContract;

impl Contract<UpdateProjectParams> for UpdateProjectContract {
    type Output = UpdateProjectDto;

    fn validate(&self, input: UpdateProjectParams) -> ValidationResult<UpdateProjectDto> {
        let mut errors = ValidationErrors::new();

        let start_date = clearable_date(&mut errors, "start_date", input.start_date);
        let end_date = clearable_date(&mut errors, "end_date", input.end_date);
        date_order(&mut errors, start_date.flatten(), end_date.flatten(), "end_date");
        let status = optional_enum::<ProjectStatus>(&mut errors, "status", input.status.as_deref());
        let budget_amount = non_negative(&mut errors, "budget_amount", input.budget_amount);

        let dto = UpdateProjectDto {
            project_code: optional_text(input.project_code).map(|c| c.trim().to_string()),
            name: optional_text(input.name),
            description: clearable_text(input.description),
            project_manager_id: input.project_manager_id,
            start_date,
            end_date,
            status: status.map(|s| s.as_str().to_string()),
            budget_amount,
        };
        finish(errors, Some(dto))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddMemberParams {
    pub user_id: Option<Id>,
    pub role_in_project: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub user_id: Id,
    pub role_in_project: String,
}

pub struct AddMemberContract;

impl Contract<AddMemberParams> for AddMemberContract {
    type Output = NewMember;

    fn validate(&self, input: AddMemberParams) -> ValidationResult<NewMember> {
        let mut errors = ValidationErrors::new();
        let user_id = required(&mut errors, "user_id", input.user_id);
        let member = user_id.map(|user_id| NewMember {
            user_id,
            role_in_project: optional_text(input.role_in_project)
                .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string()),
        });
        finish(errors, member)
    }
}

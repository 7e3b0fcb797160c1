//! Task contracts, including assignments, comments and attachments

use pl_core::{Id, TaskPriority, TaskState, TextEnum, ValidationErrors};
use pl_db::{CreateTaskDto, UpdateTaskDto};
use serde::Deserialize;

use crate::base::{
    clearable_date, clearable_text, enum_or, finish, nullable, optional_date, optional_enum,
    optional_text, required, required_text, Contract, ValidationResult,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub state: Option<String>,
    pub due_date: Option<String>,
}

/// New task in `project_id`, created by the session user
pub struct CreateTaskContract {
    pub project_id: Id,
    pub created_by: Id,
}

impl Contract<CreateTaskParams> for CreateTaskContract {
    type Output = CreateTaskDto;

    fn validate(&self, input: CreateTaskParams) -> ValidationResult<CreateTaskDto> {
        let mut errors = ValidationErrors::new();

        let title = required_text(&mut errors, "title", input.title);
        let priority = enum_or(&mut errors, "priority", input.priority.as_deref(), TaskPriority::Medium);
        let state = enum_or(&mut errors, "state", input.state.as_deref(), TaskState::Todo);
        let due_date = optional_date(&mut errors, "due_date", input.due_date.as_deref());

        let dto = title.map(|title| CreateTaskDto {
            project_id: self.project_id,
            title,
            description: optional_text(input.description),
            priority: priority.as_str().to_string(),
            state: state.as_str().to_string(),
            due_date,
            created_by: self.created_by,
        });
        finish(errors, dto)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskParams {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    pub state: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<String>>,
}

pub struct UpdateTaskContract;

impl Contract<UpdateTaskParams> for UpdateTaskContract {
    type Output = UpdateTaskDto;

    fn validate(&self, input: UpdateTaskParams) -> ValidationResult<UpdateTaskDto> {
        let mut errors = ValidationErrors::new();

        if matches!(&input.title, Some(t) if t.trim().is_empty()) {
            errors.add("title", "can't be blank");
        }
        let priority = optional_enum::<TaskPriority>(&mut errors, "priority", input.priority.as_deref());
        let state = optional_enum::<TaskState>(&mut errors, "state", input.state.as_deref());
        let due_date = clearable_date(&mut errors, "due_date", input.due_date);

        let dto = UpdateTaskDto {
            title: optional_text(input.title),
            description: clearable_text(input.description),
            priority: priority.map(|p| p.as_str().to_string()),
            state: state.map(|s| s.as_str().to_string()),
            due_date,
        };
        finish(errors, Some(dto))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignParams {
    pub user_id: Option<Id>,
}

pub struct AssignContract;

impl Contract<AssignParams> for AssignContract {
    type Output = Id;

    fn validate(&self, input: AssignParams) -> ValidationResult<Id> {
        let mut errors = ValidationErrors::new();
        let user_id = required(&mut errors, "user_id", input.user_id);
        finish(errors, user_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentParams {
    pub comment: Option<String>,
}

pub struct CommentContract;

impl Contract<CommentParams> for CommentContract {
    type Output = String;

    fn validate(&self, input: CommentParams) -> ValidationResult<String> {
        let mut errors = ValidationErrors::new();
        let comment = required_text(&mut errors, "comment", input.comment);
        finish(errors, comment)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachmentParams {
    pub file_name: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAttachment {
    pub file_name: String,
    pub file_url: String,
}

pub struct AttachmentContract;

impl Contract<AttachmentParams> for AttachmentContract {
    type Output = NewAttachment;

    fn validate(&self, input: AttachmentParams) -> ValidationResult<NewAttachment> {
        let mut errors = ValidationErrors::new();
        let file_name = required_text(&mut errors, "file_name", input.file_name);
        let file_url = required_text(&mut errors, "file_url", input.file_url);
        let attachment = file_name
            .zip(file_url)
            .map(|(file_name, file_url)| NewAttachment { file_name, file_url });
        finish(errors, attachment)
    }
}

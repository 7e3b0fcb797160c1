//! Task handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::tasks::{
    CreateTaskContract, CreateTaskParams, UpdateTaskContract, UpdateTaskParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{
    AssignmentRepository, AttachmentRepository, CommentRepository, Repository, TaskRepository,
};
use serde_json::{json, Value};

use super::{created, deleted, merge, require_project, require_task, updated};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// POST /projects/:id/tasks
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Id>,
    JsonBody(params): JsonBody<CreateTaskParams>,
) -> ApiResult<impl IntoResponse> {
    require_project(&state.pool(), project_id).await?;
    let contract = CreateTaskContract {
        project_id,
        created_by: user.id,
    };
    let dto = contract.validate(params)?;

    let task = TaskRepository::new(state.pool()).create(dto).await?;
    tracing::debug!(task_id = task.id, project_id, "Task created");
    created("Task", "task", &task)
}

/// GET /projects/:id/tasks
pub async fn list_project_tasks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let project = require_project(&state.pool(), project_id).await?;
    let tasks = TaskRepository::new(state.pool())
        .find_by_project(project_id)
        .await?;
    Ok(Json(json!({
        "project_id": project_id,
        "project_name": project.name,
        "tasks": tasks,
    })))
}

/// GET /tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let task = require_task(&state.pool(), id).await?;
    let assignments = AssignmentRepository::new(state.pool()).find_by_task(id).await?;
    let comments = CommentRepository::new(state.pool()).find_by_task(id).await?;
    let attachments = AttachmentRepository::new(state.pool()).find_by_task(id).await?;

    let body = merge(
        &task,
        vec![
            ("assignments", serde_json::to_value(&assignments)?),
            ("comments", serde_json::to_value(&comments)?),
            ("attachments", serde_json::to_value(&attachments)?),
        ],
    )?;
    Ok(Json(json!({ "task": body })))
}

/// PUT /tasks/:id
pub async fn update_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateTaskParams>,
) -> ApiResult<Json<Value>> {
    require_task(&state.pool(), id).await?;
    let dto = UpdateTaskContract.validate(params)?;
    let task = TaskRepository::new(state.pool()).update(id, dto).await?;
    updated("Task", "task", &task)
}

/// DELETE /tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    TaskRepository::new(state.pool()).delete(id).await?;
    tracing::debug!(task_id = id, "Task deleted");
    Ok(deleted("Task"))
}

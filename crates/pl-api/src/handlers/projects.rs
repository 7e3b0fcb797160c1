//! Project handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::projects::{
    CreateProjectContract, CreateProjectParams, UpdateProjectContract, UpdateProjectParams,
};
use pl_contracts::Contract;
use pl_core::{Id, ValidationErrors};
use pl_db::{MemberRepository, Pagination, ProjectRepository, Repository};
use serde_json::{json, Value};

use super::{created, deleted, merge, require_project, require_user, updated, wrap};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody, QueryParams};

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    JsonBody(params): JsonBody<CreateProjectParams>,
) -> ApiResult<impl IntoResponse> {
    let dto = CreateProjectContract.validate(params)?;
    if let Some(manager_id) = dto.project_manager_id {
        require_user(&state.pool(), manager_id).await?;
    }

    let project = ProjectRepository::new(state.pool()).create(dto).await?;
    tracing::info!(project_id = project.id, code = %project.project_code, "Project created");
    created("Project", "project", &project)
}

/// GET /projects
pub async fn list_projects(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(page): QueryParams<Pagination>,
) -> ApiResult<Json<Value>> {
    let projects = ProjectRepository::new(state.pool()).find_all(page).await?;
    Ok(Json(wrap("projects", &projects)?))
}

/// GET /projects/:id
pub async fn get_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let project = require_project(&state.pool(), id).await?;
    let members = MemberRepository::new(state.pool()).find_by_project(id).await?;
    let body = merge(&project, vec![("members", serde_json::to_value(&members)?)])?;
    Ok(Json(json!({ "project": body })))
}

/// PUT /projects/:id
///
/// A single submitted date is checked against the stored other bound.
pub async fn update_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateProjectParams>,
) -> ApiResult<Json<Value>> {
    let current = require_project(&state.pool(), id).await?;
    let dto = UpdateProjectContract.validate(params)?;

    let start = dto.start_date.unwrap_or(current.start_date);
    let end = dto.end_date.unwrap_or(current.end_date);
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            let mut errors = ValidationErrors::new();
            errors.add("end_date", "must be on or after the start date");
            return Err(errors.into());
        }
    }
    if let Some(Some(manager_id)) = dto.project_manager_id {
        require_user(&state.pool(), manager_id).await?;
    }

    let project = ProjectRepository::new(state.pool()).update(id, dto).await?;
    updated("Project", "project", &project)
}

/// DELETE /projects/:id
///
/// Members and tasks go with the project; timesheets, expenses and
/// documents referencing it block the delete with 409.
pub async fn delete_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    ProjectRepository::new(state.pool()).delete(id).await?;
    tracing::info!(project_id = id, "Project deleted");
    Ok(deleted("Project"))
}

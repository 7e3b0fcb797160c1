//! Timesheet handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::timesheets::{
    CreateTimesheetContract, CreateTimesheetParams, UpdateTimesheetContract,
    UpdateTimesheetParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{Repository, TimesheetRepository};
use serde_json::{json, Value};

use super::{
    check_task_in_project, created, deleted, found, require_project, require_user, updated, wrap,
};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// POST /projects/:id/timesheets
///
/// The entry is logged for the session user unless `user_id` names someone
/// else.
pub async fn create_timesheet(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Id>,
    JsonBody(params): JsonBody<CreateTimesheetParams>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool();
    require_project(&pool, project_id).await?;
    let contract = CreateTimesheetContract {
        project_id,
        session_user: user.id,
    };
    let dto = contract.validate(params)?;
    require_user(&pool, dto.user_id).await?;
    check_task_in_project(&pool, dto.task_id, project_id).await?;

    let timesheet = TimesheetRepository::new(pool).create(dto).await?;
    created("Timesheet", "timesheet", &timesheet)
}

/// GET /projects/:id/timesheets
pub async fn list_project_timesheets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    require_project(&state.pool(), project_id).await?;
    let repo = TimesheetRepository::new(state.pool());
    let timesheets = repo.find_by_project(project_id).await?;
    let total_hours = repo.total_hours_for_project(project_id).await?;

    Ok(Json(json!({
        "project_id": project_id,
        "timesheets": timesheets,
        "total_hours": total_hours,
    })))
}

/// GET /timesheets/:id
pub async fn get_timesheet(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let row = TimesheetRepository::new(state.pool()).find_by_id(id).await?;
    let timesheet = found(row, "Timesheet", id)?;
    Ok(Json(wrap("timesheet", &timesheet)?))
}

/// PUT /timesheets/:id
pub async fn update_timesheet(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateTimesheetParams>,
) -> ApiResult<Json<Value>> {
    let repo = TimesheetRepository::new(state.pool());
    let current = found(repo.find_by_id(id).await?, "Timesheet", id)?;
    let dto = UpdateTimesheetContract.validate(params)?;
    check_task_in_project(&state.pool(), dto.task_id.flatten(), current.project_id).await?;

    let timesheet = repo.update(id, dto).await?;
    updated("Timesheet", "timesheet", &timesheet)
}

/// DELETE /timesheets/:id
pub async fn delete_timesheet(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    TimesheetRepository::new(state.pool()).delete(id).await?;
    Ok(deleted("Timesheet"))
}

//! User handlers

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use pl_contracts::users::{UpdateUserContract, UpdateUserParams};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{
    ExpenseRepository, Pagination, ProjectRepository, Repository, TaskRepository,
    TimesheetRepository, UpdateUserDto, UserRepository, UserRow,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{deleted, hash_password_async, require_user, updated, wrap};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody, QueryParams};

/// Public view of a user; the password hash never leaves the server
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Id,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRow> for UserView {
    fn from(row: &UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email.clone(),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(page): QueryParams<Pagination>,
) -> ApiResult<Json<Value>> {
    let users = UserRepository::new(state.pool()).find_all(page).await?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(Json(wrap("users", &views)?))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), id).await?;
    Ok(Json(wrap("user", &UserView::from(&user))?))
}

/// PUT /users/:id
///
/// Deactivating a user ends that user's sessions.
pub async fn update_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateUserParams>,
) -> ApiResult<Json<Value>> {
    let repo = UserRepository::new(state.pool());
    require_user(&state.pool(), id).await?;
    let changes = UpdateUserContract.validate(params)?;

    let password_hash = match changes.password {
        Some(password) => Some(hash_password_async(password).await?),
        None => None,
    };

    let user = repo
        .update(
            id,
            UpdateUserDto {
                email: changes.email,
                password_hash,
                is_active: changes.is_active,
            },
        )
        .await?;

    if !user.is_active {
        let ended = state.sessions.remove_user_sessions(id)?;
        tracing::debug!(user_id = id, ended, "Sessions ended for inactive user");
    }

    updated("User", "user", &UserView::from(&user))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    UserRepository::new(state.pool()).delete(id).await?;
    state.sessions.remove_user_sessions(id)?;
    Ok(deleted("User"))
}

/// GET /users/:id/projects
pub async fn user_projects(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), id).await?;
    let repo = ProjectRepository::new(state.pool());
    let managed = repo.find_managed_by(id).await?;
    let member = repo.find_by_member(id).await?;

    Ok(Json(json!({
        "user_id": id,
        "email": user.email,
        "total_projects": managed.len() + member.len(),
        "managed_projects": managed,
        "member_projects": member,
    })))
}

/// GET /users/:id/tasks
pub async fn user_tasks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), id).await?;
    let tasks = TaskRepository::new(state.pool()).find_assigned_to(id).await?;

    Ok(Json(json!({
        "user_id": id,
        "email": user.email,
        "total_tasks": tasks.len(),
        "assigned_tasks": tasks,
    })))
}

/// GET /users/:id/expenses
pub async fn user_expenses(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), id).await?;
    let expenses = ExpenseRepository::new(state.pool()).find_by_submitter(id).await?;
    let total_amount: f64 = expenses.iter().map(|e| e.amount).sum();

    Ok(Json(json!({
        "user_id": id,
        "email": user.email,
        "total_expenses": expenses.len(),
        "total_amount": total_amount,
        "expenses": expenses,
    })))
}

/// GET /users/:id/timesheets
pub async fn user_timesheets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), id).await?;
    let timesheets = TimesheetRepository::new(state.pool()).find_by_user(id).await?;
    let total_hours: f64 = timesheets.iter().map(|t| t.hours).sum();

    Ok(Json(json!({
        "user_id": id,
        "email": user.email,
        "total_hours": total_hours,
        "timesheets": timesheets,
    })))
}

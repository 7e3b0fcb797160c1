//! Expense handlers

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use pl_contracts::expenses::{
    CreateExpenseContract, CreateExpenseParams, UpdateExpenseContract, UpdateExpenseParams,
};
use pl_contracts::Contract;
use pl_core::Id;
use pl_db::{ExpenseRepository, Repository};
use serde_json::{json, Value};

use super::{
    check_task_in_project, created, deleted, found, require_project, require_user, updated, wrap,
};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// POST /projects/:id/expenses
pub async fn create_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Id>,
    JsonBody(params): JsonBody<CreateExpenseParams>,
) -> ApiResult<impl IntoResponse> {
    let pool = state.pool();
    require_project(&pool, project_id).await?;
    let contract = CreateExpenseContract {
        project_id,
        submitted_by: user.id,
    };
    let dto = contract.validate(params)?;
    check_task_in_project(&pool, dto.task_id, project_id).await?;

    let expense = ExpenseRepository::new(pool).create(dto).await?;
    tracing::debug!(expense_id = expense.id, project_id, amount = expense.amount, "Expense created");
    created("Expense", "expense", &expense)
}

/// GET /projects/:id/expenses
pub async fn list_project_expenses(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let project = require_project(&state.pool(), project_id).await?;
    let repo = ExpenseRepository::new(state.pool());
    let expenses = repo.find_by_project(project_id).await?;
    let total_amount = repo.total_for_project(project_id).await?;

    Ok(Json(json!({
        "project_id": project_id,
        "project_name": project.name,
        "expenses": expenses,
        "total_amount": total_amount,
    })))
}

/// GET /expenses/:id
pub async fn get_expense(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let row = ExpenseRepository::new(state.pool()).find_by_id(id).await?;
    let expense = found(row, "Expense", id)?;
    Ok(Json(wrap("expense", &expense)?))
}

/// PUT /expenses/:id
///
/// `approved_by` must name an existing user.
pub async fn update_expense(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
    JsonBody(params): JsonBody<UpdateExpenseParams>,
) -> ApiResult<Json<Value>> {
    let pool = state.pool();
    let repo = ExpenseRepository::new(pool.clone());
    let current = found(repo.find_by_id(id).await?, "Expense", id)?;
    let dto = UpdateExpenseContract.validate(params)?;

    if let Some(Some(approver)) = dto.approved_by {
        require_user(&pool, approver).await?;
    }
    check_task_in_project(&pool, dto.task_id.flatten(), current.project_id).await?;

    let expense = repo.update(id, dto).await?;
    updated("Expense", "expense", &expense)
}

/// DELETE /expenses/:id
pub async fn delete_expense(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Id>,
) -> ApiResult<Json<Value>> {
    ExpenseRepository::new(state.pool()).delete(id).await?;
    Ok(deleted("Expense"))
}

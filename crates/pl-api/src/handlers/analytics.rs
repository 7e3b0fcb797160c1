//! Analytics report handlers
//!
//! Reports are read-only aggregates. Timesheet and expense reports accept
//! `start_date`/`end_date` query filters and echo them back under
//! `filters`; the project, task and dashboard reports cover all data.
//! Ratios are percentages rounded to two decimals and are 0 when their
//! denominator is 0.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use pl_core::reporting::{
    average, duration_days, is_overdue, percentage, round2, DateRange, DateRangeParams,
};
use pl_core::Id;
use pl_db::{AnalyticsRepository, AnalyticsScope, GroupCount, GroupTotal};
use serde_json::{json, Map, Value};

use super::{require_project, require_user};
use crate::error::ApiResult;
use crate::extractors::{AppState, CurrentUser, QueryParams};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `{key: count}`; repeated keys are summed
fn counts(groups: &[GroupCount]) -> Value {
    let mut map = Map::new();
    for group in groups {
        let current = map.get(&group.key).and_then(Value::as_i64).unwrap_or(0);
        map.insert(group.key.clone(), json!(current + group.count));
    }
    Value::Object(map)
}

/// `{key: total}`; repeated keys are summed
fn sums(groups: &[GroupTotal]) -> Value {
    let mut map = Map::new();
    for group in groups {
        let current = map.get(&group.key).and_then(Value::as_f64).unwrap_or(0.0);
        map.insert(group.key.clone(), json!(round2(current + group.total)));
    }
    Value::Object(map)
}

/// `{key: {amount, count}}`
fn amounts_and_counts(groups: &[GroupTotal]) -> Value {
    let mut map = Map::new();
    for group in groups {
        let (amount, count) = map
            .get(&group.key)
            .map(|v: &Value| {
                (
                    v["amount"].as_f64().unwrap_or(0.0),
                    v["count"].as_i64().unwrap_or(0),
                )
            })
            .unwrap_or((0.0, 0));
        map.insert(
            group.key.clone(),
            json!({ "amount": round2(amount + group.total), "count": count + group.count }),
        );
    }
    Value::Object(map)
}

fn filters(range: &DateRange) -> Value {
    json!({ "start_date": range.start_date, "end_date": range.end_date })
}

/// GET /analytics/projects/overview
pub async fn projects_overview(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let repo = AnalyticsRepository::new(state.pool());
    let totals = repo.project_totals().await?;
    let by_status = repo.projects_by_status().await?;

    Ok(Json(json!({
        "total_projects": totals.total,
        "projects_by_status": counts(&by_status),
        "total_budget": totals.total_budget,
        "average_duration_days": round2(totals.average_duration_days.unwrap_or(0.0)),
    })))
}

/// GET /analytics/projects/:id/summary
///
/// Budget spend is timesheet cost plus expenses, regardless of approval.
pub async fn project_summary(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let project = require_project(&state.pool(), project_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::project(project_id);

    let tasks = repo.task_totals(&scope, today()).await?;
    let by_state = repo.tasks_by_state(&scope).await?;
    let by_priority = repo.tasks_by_priority(&scope).await?;
    let hours = repo.timesheet_totals(&scope).await?;
    let expenses = repo.expense_totals(&scope).await?;

    let team_size = project.members_count + i64::from(project.project_manager_id.is_some());
    let total_spent = round2(hours.total_cost + expenses.total_amount);

    Ok(Json(json!({
        "project": {
            "id": project.id,
            "project_code": project.project_code,
            "name": project.name,
            "status": project.status,
            "budget_amount": project.budget_amount,
            "start_date": project.start_date,
            "end_date": project.end_date,
            "duration_days": duration_days(project.start_date, project.end_date),
        },
        "team": {
            "team_size": team_size,
            "project_manager_id": project.project_manager_id,
        },
        "tasks": {
            "total_tasks": tasks.total,
            "overdue_tasks": tasks.overdue,
            "by_state": counts(&by_state),
            "by_priority": counts(&by_priority),
        },
        "timesheets": {
            "total_hours": hours.total_hours,
            "billable_hours": hours.billable_hours,
            "non_billable_hours": hours.non_billable_hours(),
            "billable_percentage": percentage(hours.billable_hours, hours.total_hours),
            "total_cost": hours.total_cost,
        },
        "expenses": {
            "total_expenses": expenses.total_amount,
            "approved_expenses": expenses.approved_amount,
            "pending_expenses": round2(expenses.total_amount - expenses.approved_amount),
            "billable_expenses": expenses.billable_amount,
        },
        "budget_analysis": {
            "budget_amount": project.budget_amount,
            "total_cost": hours.total_cost,
            "total_expenses": expenses.total_amount,
            "total_spent": total_spent,
            "remaining_budget": round2(project.budget_amount - total_spent),
            "budget_utilization_percent": percentage(total_spent, project.budget_amount),
        },
    })))
}

/// GET /analytics/projects/timeline
pub async fn projects_timeline(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let rows = AnalyticsRepository::new(state.pool()).project_timeline().await?;
    let timeline: Vec<Value> = rows
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "project_code": p.project_code,
                "name": p.name,
                "status": p.status,
                "start_date": p.start_date,
                "end_date": p.end_date,
                "duration_days": duration_days(p.start_date, p.end_date),
                "budget_amount": p.budget_amount,
            })
        })
        .collect();

    Ok(Json(json!({
        "total_projects": timeline.len(),
        "timeline": timeline,
    })))
}

/// GET /analytics/tasks/overview
pub async fn tasks_overview(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::all();
    let totals = repo.task_totals(&scope, today()).await?;
    let by_state = repo.tasks_by_state(&scope).await?;
    let by_priority = repo.tasks_by_priority(&scope).await?;
    let assignments = repo.assignment_count().await?;

    Ok(Json(json!({
        "total_tasks": totals.total,
        "overdue_tasks": totals.overdue,
        "tasks_due_this_week": totals.due_this_week,
        "tasks_by_state": counts(&by_state),
        "tasks_by_priority": counts(&by_priority),
        "average_assignments_per_task": average(assignments as f64, totals.total),
    })))
}

/// GET /analytics/tasks/user/:id
pub async fn user_tasks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let user = require_user(&state.pool(), user_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::user(user_id);
    let totals = repo.task_totals(&scope, today()).await?;
    let by_state = repo.tasks_by_state(&scope).await?;
    let by_priority = repo.tasks_by_priority(&scope).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "email": user.email,
        "total_assigned_tasks": totals.total,
        "completed_tasks": totals.completed,
        "completion_rate_percent": percentage(totals.completed as f64, totals.total as f64),
        "overdue_tasks": totals.overdue,
        "tasks_by_state": counts(&by_state),
        "tasks_by_priority": counts(&by_priority),
    })))
}

/// GET /analytics/tasks/project/:id/timeline
pub async fn project_task_timeline(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
) -> ApiResult<Json<Value>> {
    let project = require_project(&state.pool(), project_id).await?;
    let rows = AnalyticsRepository::new(state.pool())
        .task_timeline(project_id)
        .await?;
    let today = today();
    let timeline: Vec<Value> = rows
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "title": t.title,
                "priority": t.priority,
                "state": t.state,
                "due_date": t.due_date,
                "created_at": t.created_at,
                "is_overdue": is_overdue(t.due_date, &t.state, today),
                "assigned_users_count": t.assigned_users_count,
            })
        })
        .collect();

    Ok(Json(json!({
        "project_id": project_id,
        "project_name": project.name,
        "total_tasks": timeline.len(),
        "task_timeline": timeline,
    })))
}

/// GET /analytics/timesheets/overview
pub async fn timesheets_overview(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::all().with_range(range);
    let hours = repo.timesheet_totals(&scope).await?;
    let by_project = repo.hours_by_project(&scope).await?;

    Ok(Json(json!({
        "total_hours": hours.total_hours,
        "billable_hours": hours.billable_hours,
        "non_billable_hours": hours.non_billable_hours(),
        "billable_percentage": percentage(hours.billable_hours, hours.total_hours),
        "total_cost": hours.total_cost,
        "hours_by_project": sums(&by_project),
        "filters": filters(&range),
    })))
}

/// GET /analytics/timesheets/user/:id
pub async fn user_timesheets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<Id>,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let user = require_user(&state.pool(), user_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::user(user_id).with_range(range);
    let hours = repo.timesheet_totals(&scope).await?;
    let by_project = repo.hours_by_project(&scope).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "email": user.email,
        "total_hours": hours.total_hours,
        "billable_hours": hours.billable_hours,
        "non_billable_hours": hours.non_billable_hours(),
        "billable_percentage": percentage(hours.billable_hours, hours.total_hours),
        "total_cost": hours.total_cost,
        "days_worked": hours.days_worked,
        "average_hours_per_day": average(hours.total_hours, hours.days_worked),
        "hours_by_project": sums(&by_project),
        "filters": filters(&range),
    })))
}

/// GET /analytics/timesheets/project/:id
pub async fn project_timesheets(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let project = require_project(&state.pool(), project_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::project(project_id).with_range(range);
    let hours = repo.timesheet_totals(&scope).await?;
    let by_user = repo.hours_by_user(&scope).await?;
    let by_task = repo.hours_by_task(&scope).await?;

    Ok(Json(json!({
        "project_id": project_id,
        "project_name": project.name,
        "total_hours": hours.total_hours,
        "billable_hours": hours.billable_hours,
        "non_billable_hours": hours.non_billable_hours(),
        "billable_percentage": percentage(hours.billable_hours, hours.total_hours),
        "total_cost": hours.total_cost,
        "hours_by_user": sums(&by_user),
        "hours_by_task": sums(&by_task),
        "filters": filters(&range),
    })))
}

/// GET /analytics/expenses/overview
pub async fn expenses_overview(
    State(state): State<AppState>,
    _user: CurrentUser,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::all().with_range(range);
    let expenses = repo.expense_totals(&scope).await?;
    let by_status = repo.expenses_by_status(&scope).await?;
    let by_project = repo.expenses_by_project(&scope).await?;

    Ok(Json(json!({
        "total_expenses": expenses.total_amount,
        "billable_expenses": expenses.billable_amount,
        "non_billable_expenses": expenses.non_billable_amount(),
        "billable_percentage": percentage(expenses.billable_amount, expenses.total_amount),
        "expenses_by_status": sums(&by_status),
        "expenses_by_project": sums(&by_project),
        "filters": filters(&range),
    })))
}

/// GET /analytics/expenses/user/:id
pub async fn user_expenses(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<Id>,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let user = require_user(&state.pool(), user_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::user(user_id).with_range(range);
    let expenses = repo.expense_totals(&scope).await?;
    let by_status = repo.expenses_by_status(&scope).await?;
    let by_project = repo.expenses_by_project(&scope).await?;

    Ok(Json(json!({
        "user_id": user_id,
        "email": user.email,
        "total_expenses": expenses.total_amount,
        "expenses_by_status": amounts_and_counts(&by_status),
        "expenses_by_project": sums(&by_project),
        "filters": filters(&range),
    })))
}

/// GET /analytics/expenses/project/:id
pub async fn project_expenses(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Id>,
    QueryParams(params): QueryParams<DateRangeParams>,
) -> ApiResult<Json<Value>> {
    let range = DateRange::parse(&params)?;
    let project = require_project(&state.pool(), project_id).await?;
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::project(project_id).with_range(range);
    let expenses = repo.expense_totals(&scope).await?;
    let by_status = repo.expenses_by_status(&scope).await?;
    let by_user = repo.expenses_by_user(&scope).await?;

    Ok(Json(json!({
        "project_id": project_id,
        "project_name": project.name,
        "project_budget": project.budget_amount,
        "total_expenses": expenses.total_amount,
        "expenses_by_status": amounts_and_counts(&by_status),
        "expenses_by_user": amounts_and_counts(&by_user),
        "filters": filters(&range),
    })))
}

/// GET /analytics/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> ApiResult<Json<Value>> {
    let repo = AnalyticsRepository::new(state.pool());
    let scope = AnalyticsScope::all();
    let projects = repo.project_totals().await?;
    let tasks = repo.task_totals(&scope, today()).await?;
    let hours = repo.timesheet_totals(&scope).await?;
    let expenses = repo.expense_totals(&scope).await?;

    let total_spent = round2(hours.total_cost + expenses.total_amount);

    Ok(Json(json!({
        "projects": {
            "total": projects.total,
            "active": projects.active,
            "total_budget": projects.total_budget,
        },
        "tasks": {
            "total": tasks.total,
            "overdue": tasks.overdue,
        },
        "timesheets": {
            "total_hours": hours.total_hours,
            "billable_hours": hours.billable_hours,
            "total_cost": hours.total_cost,
        },
        "expenses": {
            "total_amount": expenses.total_amount,
            "pending_amount": expenses.pending_amount,
        },
        "financial_summary": {
            "total_budget": projects.total_budget,
            "total_spent": total_spent,
            "remaining_budget": round2(projects.total_budget - total_spent),
            "budget_utilization_percent": percentage(total_spent, projects.total_budget),
        },
    })))
}

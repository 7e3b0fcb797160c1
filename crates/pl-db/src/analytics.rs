//! Aggregate queries behind the analytics reports
//!
//! Every query is read-only and narrowed by an [`AnalyticsScope`]: an
//! optional project, an optional user and an optional inclusive date range.
//! Absent parts of the scope do not filter. The meaning of "user" depends on
//! the table: the assignee for tasks, the worker for timesheets and the
//! submitter for expenses.
//!
//! Queries that depend on the current date take `today` from the caller.

use chrono::{DateTime, NaiveDate, Utc};
use pl_core::reporting::{week_window, DateRange};
use pl_core::Id;
use serde::Serialize;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Sqlite, SqlitePool};

use crate::repository::RepositoryResult;

/// Task states excluded from overdue and due-soon counts
const TERMINAL_STATES: &str = "('done', 'completed', 'closed')";

const TIMESHEET_SCOPE: &str = r#"
    (?1 IS NULL OR t.project_id = ?1)
    AND (?2 IS NULL OR t.user_id = ?2)
    AND (?3 IS NULL OR t.work_date >= ?3)
    AND (?4 IS NULL OR t.work_date <= ?4)
"#;

const EXPENSE_SCOPE: &str = r#"
    (?1 IS NULL OR e.project_id = ?1)
    AND (?2 IS NULL OR e.submitted_by = ?2)
    AND (?3 IS NULL OR e.expense_date >= ?3)
    AND (?4 IS NULL OR e.expense_date <= ?4)
"#;

const TASK_SCOPE: &str = r#"
    (?1 IS NULL OR t.project_id = ?1)
    AND (?2 IS NULL OR t.id IN (SELECT a.task_id FROM task_assignments a WHERE a.user_id = ?2))
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsScope {
    pub project_id: Option<Id>,
    pub user_id: Option<Id>,
    pub range: DateRange,
}

impl AnalyticsScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn project(project_id: Id) -> Self {
        Self {
            project_id: Some(project_id),
            ..Self::default()
        }
    }

    pub fn user(user_id: Id) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }
}

/// A count per category
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// A summed amount per category, with the number of rows summed
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct ProjectTotals {
    pub total: i64,
    pub active: i64,
    pub total_budget: f64,
    pub average_duration_days: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectTimelineRow {
    pub id: i64,
    pub project_code: String,
    pub name: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct TaskTotals {
    pub total: i64,
    pub completed: i64,
    pub overdue: i64,
    pub due_this_week: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskTimelineRow {
    pub id: i64,
    pub title: String,
    pub priority: String,
    pub state: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub assigned_users_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct TimesheetTotals {
    pub total_hours: f64,
    pub billable_hours: f64,
    pub total_cost: f64,
    pub entries: i64,
    pub days_worked: i64,
}

impl TimesheetTotals {
    pub fn non_billable_hours(&self) -> f64 {
        self.total_hours - self.billable_hours
    }
}

#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize)]
pub struct ExpenseTotals {
    pub total_amount: f64,
    pub approved_amount: f64,
    /// Sum of expenses whose status is `pending`
    pub pending_amount: f64,
    pub billable_amount: f64,
    pub count: i64,
}

impl ExpenseTotals {
    pub fn non_billable_amount(&self) -> f64 {
        self.total_amount - self.billable_amount
    }
}

/// Bind project, user and date range as `?1..?4`
fn scoped<'q, O>(sql: &'q str, scope: &AnalyticsScope) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    sqlx::query_as::<_, O>(sql)
        .bind(scope.project_id)
        .bind(scope.user_id)
        .bind(scope.range.start_date)
        .bind(scope.range.end_date)
}

/// Bind project and assignee as `?1..?2`
fn task_scoped<'q, O>(sql: &'q str, scope: &AnalyticsScope) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    sqlx::query_as::<_, O>(sql)
        .bind(scope.project_id)
        .bind(scope.user_id)
}

pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Projects

    pub async fn project_totals(&self) -> RepositoryResult<ProjectTotals> {
        let totals = sqlx::query_as::<_, ProjectTotals>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(CASE WHEN status = 'active' THEN 1 END) AS active,
                   TOTAL(budget_amount) AS total_budget,
                   AVG(CASE WHEN start_date IS NOT NULL AND end_date IS NOT NULL
                            THEN julianday(end_date) - julianday(start_date) END) AS average_duration_days
            FROM projects
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    pub async fn projects_by_status(&self) -> RepositoryResult<Vec<GroupCount>> {
        let rows = sqlx::query_as::<_, GroupCount>(
            "SELECT status AS key, COUNT(*) AS count FROM projects GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Projects with both a start and an end date, earliest start first
    pub async fn project_timeline(&self) -> RepositoryResult<Vec<ProjectTimelineRow>> {
        let rows = sqlx::query_as::<_, ProjectTimelineRow>(
            r#"
            SELECT id, project_code, name, status, start_date, end_date, budget_amount
            FROM projects
            WHERE start_date IS NOT NULL AND end_date IS NOT NULL
            ORDER BY start_date, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // Tasks

    pub async fn task_totals(&self, scope: &AnalyticsScope, today: NaiveDate) -> RepositoryResult<TaskTotals> {
        let (week_start, week_end) = week_window(today);
        let sql = format!(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(CASE WHEN t.state IN {terminal} THEN 1 END) AS completed,
                   COUNT(CASE WHEN t.due_date IS NOT NULL AND t.due_date < ?3
                                   AND t.state NOT IN {terminal} THEN 1 END) AS overdue,
                   COUNT(CASE WHEN t.due_date >= ?3 AND t.due_date <= ?4
                                   AND t.state NOT IN {terminal} THEN 1 END) AS due_this_week
            FROM tasks t
            WHERE {scope}
            "#,
            terminal = TERMINAL_STATES,
            scope = TASK_SCOPE,
        );
        let totals = task_scoped::<TaskTotals>(&sql, scope)
            .bind(week_start)
            .bind(week_end)
            .fetch_one(&self.pool)
            .await?;
        Ok(totals)
    }

    pub async fn tasks_by_state(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupCount>> {
        let sql = format!(
            "SELECT t.state AS key, COUNT(*) AS count FROM tasks t WHERE {} GROUP BY t.state ORDER BY t.state",
            TASK_SCOPE
        );
        let rows = task_scoped::<GroupCount>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn tasks_by_priority(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupCount>> {
        let sql = format!(
            "SELECT t.priority AS key, COUNT(*) AS count FROM tasks t WHERE {} GROUP BY t.priority ORDER BY t.priority",
            TASK_SCOPE
        );
        let rows = task_scoped::<GroupCount>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn assignment_count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_assignments")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Dated tasks of a project in due-date order
    pub async fn task_timeline(&self, project_id: Id) -> RepositoryResult<Vec<TaskTimelineRow>> {
        let rows = sqlx::query_as::<_, TaskTimelineRow>(
            r#"
            SELECT t.id, t.title, t.priority, t.state, t.due_date, t.created_at,
                   (SELECT COUNT(*) FROM task_assignments a WHERE a.task_id = t.id) AS assigned_users_count
            FROM tasks t
            WHERE t.project_id = ?1 AND t.due_date IS NOT NULL
            ORDER BY t.due_date, t.id
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // Timesheets

    pub async fn timesheet_totals(&self, scope: &AnalyticsScope) -> RepositoryResult<TimesheetTotals> {
        let sql = format!(
            r#"
            SELECT TOTAL(t.hours) AS total_hours,
                   TOTAL(CASE WHEN t.billable THEN t.hours ELSE 0 END) AS billable_hours,
                   TOTAL(t.cost_amount) AS total_cost,
                   COUNT(*) AS entries,
                   COUNT(DISTINCT t.work_date) AS days_worked
            FROM timesheets t
            WHERE {}
            "#,
            TIMESHEET_SCOPE
        );
        let totals = scoped::<TimesheetTotals>(&sql, scope)
            .fetch_one(&self.pool)
            .await?;
        Ok(totals)
    }

    pub async fn hours_by_project(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT p.name AS key, TOTAL(t.hours) AS total, COUNT(*) AS count
            FROM timesheets t
            JOIN projects p ON p.id = t.project_id
            WHERE {}
            GROUP BY p.id, p.name
            ORDER BY p.name
            "#,
            TIMESHEET_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn hours_by_user(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT u.email AS key, TOTAL(t.hours) AS total, COUNT(*) AS count
            FROM timesheets t
            JOIN users u ON u.id = t.user_id
            WHERE {}
            GROUP BY u.id, u.email
            ORDER BY u.email
            "#,
            TIMESHEET_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Hours logged against tasks; entries without a task are left out
    pub async fn hours_by_task(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT k.title AS key, TOTAL(t.hours) AS total, COUNT(*) AS count
            FROM timesheets t
            JOIN tasks k ON k.id = t.task_id
            WHERE {}
            GROUP BY k.id, k.title
            ORDER BY k.title
            "#,
            TIMESHEET_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // Expenses

    pub async fn expense_totals(&self, scope: &AnalyticsScope) -> RepositoryResult<ExpenseTotals> {
        let sql = format!(
            r#"
            SELECT TOTAL(e.amount) AS total_amount,
                   TOTAL(CASE WHEN e.status = 'approved' THEN e.amount ELSE 0 END) AS approved_amount,
                   TOTAL(CASE WHEN e.status = 'pending' THEN e.amount ELSE 0 END) AS pending_amount,
                   TOTAL(CASE WHEN e.billable THEN e.amount ELSE 0 END) AS billable_amount,
                   COUNT(*) AS count
            FROM expenses e
            WHERE {}
            "#,
            EXPENSE_SCOPE
        );
        let totals = scoped::<ExpenseTotals>(&sql, scope)
            .fetch_one(&self.pool)
            .await?;
        Ok(totals)
    }

    pub async fn expenses_by_status(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT e.status AS key, TOTAL(e.amount) AS total, COUNT(*) AS count
            FROM expenses e
            WHERE {}
            GROUP BY e.status
            ORDER BY e.status
            "#,
            EXPENSE_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn expenses_by_project(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT p.name AS key, TOTAL(e.amount) AS total, COUNT(*) AS count
            FROM expenses e
            JOIN projects p ON p.id = e.project_id
            WHERE {}
            GROUP BY p.id, p.name
            ORDER BY p.name
            "#,
            EXPENSE_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn expenses_by_user(&self, scope: &AnalyticsScope) -> RepositoryResult<Vec<GroupTotal>> {
        let sql = format!(
            r#"
            SELECT u.email AS key, TOTAL(e.amount) AS total, COUNT(*) AS count
            FROM expenses e
            JOIN users u ON u.id = e.submitted_by
            WHERE {}
            GROUP BY u.id, u.email
            ORDER BY u.email
            "#,
            EXPENSE_SCOPE
        );
        let rows = scoped::<GroupTotal>(&sql, scope)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::tests::new_expense;
    use crate::expenses::{CreateExpenseDto, ExpenseRepository};
    use crate::pool::Database;
    use crate::projects::tests::{new_project, seed_user};
    use crate::projects::{CreateProjectDto, ProjectRepository};
    use crate::repository::Repository;
    use crate::task_items::AssignmentRepository;
    use crate::tasks::tests::new_task;
    use crate::tasks::{CreateTaskDto, TaskRepository};
    use crate::timesheets::tests::new_timesheet;
    use crate::timesheets::{CreateTimesheetDto, TimesheetRepository};
    use pl_core::{TaskState, TextEnum};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_terminal_states_match_task_state() {
        for state in TaskState::ALL {
            let quoted = format!("'{}'", state.as_str());
            assert_eq!(TERMINAL_STATES.contains(&quoted), state.is_terminal());
        }
    }

    #[tokio::test]
    async fn test_empty_database_reports_zeroes() {
        let db = Database::in_memory().await.unwrap();
        let repo = AnalyticsRepository::new(db.pool().clone());

        let projects = repo.project_totals().await.unwrap();
        assert_eq!(projects.total, 0);
        assert_eq!(projects.total_budget, 0.0);
        assert_eq!(projects.average_duration_days, None);

        let sheets = repo.timesheet_totals(&AnalyticsScope::all()).await.unwrap();
        assert_eq!(sheets, TimesheetTotals::default());

        let expenses = repo.expense_totals(&AnalyticsScope::all()).await.unwrap();
        assert_eq!(expenses.total_amount, 0.0);

        let tasks = repo.task_totals(&AnalyticsScope::all(), date(2024, 1, 1)).await.unwrap();
        assert_eq!(tasks, TaskTotals::default());
    }

    #[tokio::test]
    async fn test_project_budget_figures() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 1000.0))
            .await
            .unwrap();
        TimesheetRepository::new(db.pool().clone())
            .create(CreateTimesheetDto {
                cost_amount: Some(200.0),
                ..new_timesheet(project.id, user, 4.0)
            })
            .await
            .unwrap();
        ExpenseRepository::new(db.pool().clone())
            .create(new_expense(project.id, user, 300.0))
            .await
            .unwrap();

        let repo = AnalyticsRepository::new(db.pool().clone());
        let scope = AnalyticsScope::project(project.id);
        let sheets = repo.timesheet_totals(&scope).await.unwrap();
        let expenses = repo.expense_totals(&scope).await.unwrap();

        assert_eq!(sheets.total_cost, 200.0);
        assert_eq!(sheets.billable_hours, 4.0);
        assert_eq!(expenses.total_amount, 300.0);
        assert_eq!(expenses.billable_amount, 300.0);
        assert_eq!(expenses.pending_amount, 300.0);
        assert_eq!(expenses.approved_amount, 0.0);

        let totals = repo.project_totals().await.unwrap();
        assert_eq!(totals.active, 1);
        assert_eq!(totals.average_duration_days, Some(60.0));
    }

    #[tokio::test]
    async fn test_timeline_lists_only_scheduled_projects() {
        let db = Database::in_memory().await.unwrap();
        let projects = ProjectRepository::new(db.pool().clone());
        projects
            .create(CreateProjectDto {
                start_date: Some(date(2024, 2, 1)),
                ..new_project("P-LATE", 0.0)
            })
            .await
            .unwrap();
        projects.create(new_project("P-EARLY", 0.0)).await.unwrap();
        projects
            .create(CreateProjectDto {
                end_date: None,
                ..new_project("P-OPEN", 0.0)
            })
            .await
            .unwrap();
        projects
            .create(CreateProjectDto {
                start_date: None,
                end_date: None,
                ..new_project("P-IDEA", 0.0)
            })
            .await
            .unwrap();

        let timeline = AnalyticsRepository::new(db.pool().clone())
            .project_timeline()
            .await
            .unwrap();
        let codes: Vec<_> = timeline.iter().map(|p| p.project_code.as_str()).collect();
        assert_eq!(codes, vec!["P-EARLY", "P-LATE"]);
    }

    #[tokio::test]
    async fn test_overdue_and_due_this_week() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let tasks = TaskRepository::new(db.pool().clone());
        let today = date(2024, 6, 10);
        let dated = |title: &str, due: NaiveDate, state: &str| CreateTaskDto {
            due_date: Some(due),
            state: state.to_string(),
            ..new_task(project.id, user, title)
        };

        tasks.create(dated("late", date(2024, 6, 9), "todo")).await.unwrap();
        tasks.create(dated("late but done", date(2024, 6, 1), "done")).await.unwrap();
        tasks.create(dated("today", date(2024, 6, 10), "in_progress")).await.unwrap();
        tasks.create(dated("edge of week", date(2024, 6, 17), "todo")).await.unwrap();
        tasks.create(dated("next month", date(2024, 7, 10), "todo")).await.unwrap();
        tasks.create(new_task(project.id, user, "undated")).await.unwrap();

        let repo = AnalyticsRepository::new(db.pool().clone());
        let totals = repo.task_totals(&AnalyticsScope::all(), today).await.unwrap();
        assert_eq!(totals.total, 6);
        assert_eq!(totals.overdue, 1);
        assert_eq!(totals.due_this_week, 2);
        assert_eq!(totals.completed, 1);

        let timeline = repo.task_timeline(project.id).await.unwrap();
        assert_eq!(timeline.len(), 5);
        assert_eq!(timeline[0].title, "late but done");
    }

    #[tokio::test]
    async fn test_assignee_scope() {
        let db = Database::in_memory().await.unwrap();
        let alice = seed_user(db.pool(), "alice@x.com").await;
        let bob = seed_user(db.pool(), "bob@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let tasks = TaskRepository::new(db.pool().clone());
        let one = tasks.create(new_task(project.id, alice, "one")).await.unwrap();
        tasks.create(new_task(project.id, alice, "two")).await.unwrap();
        AssignmentRepository::new(db.pool().clone())
            .assign(one.id, bob)
            .await
            .unwrap();

        let repo = AnalyticsRepository::new(db.pool().clone());
        let by_state = repo.tasks_by_state(&AnalyticsScope::user(bob)).await.unwrap();
        assert_eq!(
            by_state,
            vec![GroupCount {
                key: "todo".into(),
                count: 1
            }]
        );
        assert_eq!(repo.assignment_count().await.unwrap(), 1);
        assert!(repo
            .tasks_by_priority(&AnalyticsScope::user(alice))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let sheets = TimesheetRepository::new(db.pool().clone());
        for (day, hours, billable) in [(1, 2.0, true), (2, 3.0, false), (3, 5.0, true)] {
            sheets
                .create(CreateTimesheetDto {
                    work_date: date(2024, 2, day),
                    billable,
                    ..new_timesheet(project.id, user, hours)
                })
                .await
                .unwrap();
        }
        let expenses = ExpenseRepository::new(db.pool().clone());
        expenses
            .create(CreateExpenseDto {
                expense_date: date(2024, 2, 3),
                ..new_expense(project.id, user, 40.0)
            })
            .await
            .unwrap();

        let repo = AnalyticsRepository::new(db.pool().clone());
        let scope = AnalyticsScope::user(user)
            .with_range(DateRange::new(Some(date(2024, 2, 2)), Some(date(2024, 2, 3))));
        let totals = repo.timesheet_totals(&scope).await.unwrap();
        assert_eq!(totals.total_hours, 8.0);
        assert_eq!(totals.billable_hours, 5.0);
        assert_eq!(totals.non_billable_hours(), 3.0);
        assert_eq!(totals.days_worked, 2);

        let by_project = repo.hours_by_project(&scope).await.unwrap();
        assert_eq!(by_project[0].key, "Project P-1");
        assert_eq!(by_project[0].total, 8.0);

        let early = AnalyticsScope::all().with_range(DateRange::new(None, Some(date(2024, 2, 2))));
        assert_eq!(repo.expense_totals(&early).await.unwrap().count, 0);
        assert_eq!(
            repo.expenses_by_user(&AnalyticsScope::all()).await.unwrap()[0],
            GroupTotal {
                key: "dev@x.com".into(),
                total: 40.0,
                count: 1
            }
        );
    }
}

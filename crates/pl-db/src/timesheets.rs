//! Timesheet repository
//!
//! Hours logged against a project (and optionally a task). The cost of an
//! entry is either given directly or derived from hours and the internal
//! cost rate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimesheetRow {
    pub id: i64,
    pub project_id: i64,
    pub task_id: Option<i64>,
    pub task_title: Option<String>,
    pub user_id: i64,
    pub user_email: Option<String>,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub billable: bool,
    pub internal_cost_rate: Option<f64>,
    pub cost_amount: Option<f64>,
    pub status: String,
    pub linked_invoice_line_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const SELECT_TIMESHEET: &str = r#"
    SELECT ts.id, ts.project_id, ts.task_id, t.title AS task_title, ts.user_id,
           u.email AS user_email, ts.work_date, ts.hours, ts.billable,
           ts.internal_cost_rate, ts.cost_amount, ts.status, ts.linked_invoice_line_id,
           ts.notes, ts.created_at
    FROM timesheets ts
    LEFT JOIN tasks t ON t.id = ts.task_id
    LEFT JOIN users u ON u.id = ts.user_id
"#;

#[derive(Debug, Clone)]
pub struct CreateTimesheetDto {
    pub project_id: Id,
    pub task_id: Option<Id>,
    pub user_id: Id,
    pub work_date: NaiveDate,
    pub hours: f64,
    pub billable: bool,
    pub internal_cost_rate: Option<f64>,
    pub cost_amount: Option<f64>,
    pub status: String,
    pub notes: Option<String>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateTimesheetDto {
    pub task_id: Option<Option<Id>>,
    pub work_date: Option<NaiveDate>,
    pub hours: Option<f64>,
    pub billable: Option<bool>,
    pub internal_cost_rate: Option<f64>,
    pub cost_amount: Option<f64>,
    pub status: Option<String>,
    pub linked_invoice_line_id: Option<Option<Id>>,
    pub notes: Option<Option<String>>,
}

/// Cost of an entry: an explicit amount wins, otherwise hours × rate
pub fn derive_cost(hours: f64, rate: Option<f64>, explicit: Option<f64>) -> Option<f64> {
    explicit.or_else(|| rate.map(|r| hours * r))
}

pub struct TimesheetRepository {
    pool: SqlitePool,
}

impl TimesheetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Entries for a project, most recent work first
    pub async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Vec<TimesheetRow>> {
        let sql = format!(
            "{} WHERE ts.project_id = ?1 ORDER BY ts.work_date DESC, ts.id DESC",
            SELECT_TIMESHEET
        );
        let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_user(&self, user_id: Id) -> RepositoryResult<Vec<TimesheetRow>> {
        let sql = format!(
            "{} WHERE ts.user_id = ?1 ORDER BY ts.work_date DESC, ts.id DESC",
            SELECT_TIMESHEET
        );
        let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total hours logged on a project
    pub async fn total_hours_for_project(&self, project_id: Id) -> RepositoryResult<f64> {
        let total: f64 = sqlx::query_scalar("SELECT TOTAL(hours) FROM timesheets WHERE project_id = ?1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl Repository<TimesheetRow, CreateTimesheetDto, UpdateTimesheetDto> for TimesheetRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<TimesheetRow>> {
        let sql = format!("{} WHERE ts.id = ?1", SELECT_TIMESHEET);
        let row = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<TimesheetRow>> {
        let sql = format!(
            "{} ORDER BY ts.work_date DESC, ts.id DESC LIMIT ?1 OFFSET ?2",
            SELECT_TIMESHEET
        );
        let rows = sqlx::query_as::<_, TimesheetRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM timesheets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateTimesheetDto) -> RepositoryResult<TimesheetRow> {
        let cost = derive_cost(dto.hours, dto.internal_cost_rate, dto.cost_amount);

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO timesheets (
                project_id, task_id, user_id, work_date, hours, billable,
                internal_cost_rate, cost_amount, status, notes, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            RETURNING id
            "#,
        )
        .bind(dto.project_id)
        .bind(dto.task_id)
        .bind(dto.user_id)
        .bind(dto.work_date)
        .bind(dto.hours)
        .bind(dto.billable)
        .bind(dto.internal_cost_rate)
        .bind(cost)
        .bind(&dto.status)
        .bind(&dto.notes)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(timesheet_id = id, project_id = dto.project_id, hours = dto.hours, "Timesheet created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Timesheet", id))
    }

    /// Hours or rate changes recompute a derived cost unless a new cost
    /// amount is supplied with them.
    async fn update(&self, id: Id, dto: UpdateTimesheetDto) -> RepositoryResult<TimesheetRow> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(f64, Option<f64>, Option<f64>)> = sqlx::query_as(
            "SELECT hours, internal_cost_rate, cost_amount FROM timesheets WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (hours, rate, cost) = current.ok_or_else(|| RepositoryError::not_found("Timesheet", id))?;

        let new_hours = dto.hours.unwrap_or(hours);
        let new_rate = dto.internal_cost_rate.or(rate);
        let new_cost = if dto.cost_amount.is_some() {
            dto.cost_amount
        } else if dto.hours.is_some() || dto.internal_cost_rate.is_some() {
            derive_cost(new_hours, new_rate, None).or(cost)
        } else {
            cost
        };

        sqlx::query(
            r#"
            UPDATE timesheets SET
                task_id = CASE WHEN ?11 THEN ?2 ELSE task_id END,
                work_date = COALESCE(?3, work_date),
                hours = ?4,
                billable = COALESCE(?5, billable),
                internal_cost_rate = ?6,
                cost_amount = ?7,
                status = COALESCE(?8, status),
                linked_invoice_line_id = CASE WHEN ?12 THEN ?9 ELSE linked_invoice_line_id END,
                notes = CASE WHEN ?13 THEN ?10 ELSE notes END
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(dto.task_id.flatten())
        .bind(dto.work_date)
        .bind(new_hours)
        .bind(dto.billable)
        .bind(new_rate)
        .bind(new_cost)
        .bind(&dto.status)
        .bind(dto.linked_invoice_line_id.flatten())
        .bind(dto.notes.clone().flatten())
        .bind(dto.task_id.is_some())
        .bind(dto.linked_invoice_line_id.is_some())
        .bind(dto.notes.is_some())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Timesheet", id))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM timesheets WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Timesheet", id));
        }

        tracing::debug!(timesheet_id = id, "Timesheet deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM timesheets WHERE id = ?1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::projects::tests::{new_project, seed_user};
    use crate::projects::ProjectRepository;
    use crate::tasks::tests::new_task;
    use crate::tasks::TaskRepository;

    pub(crate) fn new_timesheet(project_id: Id, user_id: Id, hours: f64) -> CreateTimesheetDto {
        CreateTimesheetDto {
            project_id,
            task_id: None,
            user_id,
            work_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            hours,
            billable: true,
            internal_cost_rate: None,
            cost_amount: None,
            status: "draft".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_derive_cost() {
        assert_eq!(derive_cost(4.0, Some(50.0), None), Some(200.0));
        assert_eq!(derive_cost(4.0, Some(50.0), Some(120.0)), Some(120.0));
        assert_eq!(derive_cost(4.0, None, None), None);
    }

    #[tokio::test]
    async fn test_update_recomputes_derived_cost() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let repo = TimesheetRepository::new(db.pool().clone());

        let entry = repo
            .create(CreateTimesheetDto {
                internal_cost_rate: Some(50.0),
                ..new_timesheet(project.id, user, 4.0)
            })
            .await
            .unwrap();
        assert_eq!(entry.cost_amount, Some(200.0));

        let entry = repo
            .update(
                entry.id,
                UpdateTimesheetDto {
                    hours: Some(6.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.cost_amount, Some(300.0));

        let entry = repo
            .update(
                entry.id,
                UpdateTimesheetDto {
                    notes: Some(Some("reviewed".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(entry.cost_amount, Some(300.0));
        assert_eq!(repo.total_hours_for_project(project.id).await.unwrap(), 6.0);
    }

    #[tokio::test]
    async fn test_project_with_timesheets_cannot_be_deleted() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let projects = ProjectRepository::new(db.pool().clone());
        let project = projects.create(new_project("P-1", 0.0)).await.unwrap();
        TimesheetRepository::new(db.pool().clone())
            .create(new_timesheet(project.id, user, 2.0))
            .await
            .unwrap();

        let err = projects.delete(project.id).await.unwrap_err();
        assert!(err.is_foreign_key_violation());
        assert!(projects.exists(project.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_task_delete_cascades_to_timesheets() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let tasks = TaskRepository::new(db.pool().clone());
        let task = tasks.create(new_task(project.id, user, "Task")).await.unwrap();
        let repo = TimesheetRepository::new(db.pool().clone());
        repo.create(CreateTimesheetDto {
            task_id: Some(task.id),
            ..new_timesheet(project.id, user, 3.0)
        })
        .await
        .unwrap();

        tasks.delete(task.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}

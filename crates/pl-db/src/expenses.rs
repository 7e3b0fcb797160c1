//! Expense repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpenseRow {
    pub id: i64,
    pub project_id: i64,
    pub project_name: Option<String>,
    pub task_id: Option<i64>,
    pub submitted_by: i64,
    pub submitter_email: Option<String>,
    pub approved_by: Option<i64>,
    pub expense_date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub billable: bool,
    pub status: String,
    pub receipt_url: Option<String>,
    pub linked_invoice_line_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_EXPENSE: &str = r#"
    SELECT e.id, e.project_id, p.name AS project_name, e.task_id, e.submitted_by,
           u.email AS submitter_email, e.approved_by, e.expense_date, e.description,
           e.amount, e.billable, e.status, e.receipt_url, e.linked_invoice_line_id,
           e.created_at, e.updated_at
    FROM expenses e
    LEFT JOIN projects p ON p.id = e.project_id
    LEFT JOIN users u ON u.id = e.submitted_by
"#;

#[derive(Debug, Clone)]
pub struct CreateExpenseDto {
    pub project_id: Id,
    pub task_id: Option<Id>,
    pub submitted_by: Id,
    pub expense_date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub billable: bool,
    pub status: String,
    pub receipt_url: Option<String>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseDto {
    pub task_id: Option<Option<Id>>,
    pub approved_by: Option<Option<Id>>,
    pub expense_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub billable: Option<bool>,
    pub status: Option<String>,
    pub receipt_url: Option<Option<String>>,
    pub linked_invoice_line_id: Option<Option<Id>>,
}

pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Vec<ExpenseRow>> {
        let sql = format!(
            "{} WHERE e.project_id = ?1 ORDER BY e.expense_date DESC, e.id DESC",
            SELECT_EXPENSE
        );
        let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_submitter(&self, user_id: Id) -> RepositoryResult<Vec<ExpenseRow>> {
        let sql = format!(
            "{} WHERE e.submitted_by = ?1 ORDER BY e.expense_date DESC, e.id DESC",
            SELECT_EXPENSE
        );
        let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn total_for_project(&self, project_id: Id) -> RepositoryResult<f64> {
        let total: f64 = sqlx::query_scalar("SELECT TOTAL(amount) FROM expenses WHERE project_id = ?1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl Repository<ExpenseRow, CreateExpenseDto, UpdateExpenseDto> for ExpenseRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ExpenseRow>> {
        let sql = format!("{} WHERE e.id = ?1", SELECT_EXPENSE);
        let row = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<ExpenseRow>> {
        let sql = format!(
            "{} ORDER BY e.expense_date DESC, e.id DESC LIMIT ?1 OFFSET ?2",
            SELECT_EXPENSE
        );
        let rows = sqlx::query_as::<_, ExpenseRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateExpenseDto) -> RepositoryResult<ExpenseRow> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO expenses (
                project_id, task_id, submitted_by, expense_date, description,
                amount, billable, status, receipt_url, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING id
            "#,
        )
        .bind(dto.project_id)
        .bind(dto.task_id)
        .bind(dto.submitted_by)
        .bind(dto.expense_date)
        .bind(&dto.description)
        .bind(dto.amount)
        .bind(dto.billable)
        .bind(&dto.status)
        .bind(&dto.receipt_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(expense_id = id, project_id = dto.project_id, amount = dto.amount, "Expense created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Expense", id))
    }

    async fn update(&self, id: Id, dto: UpdateExpenseDto) -> RepositoryResult<ExpenseRow> {
        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                task_id = CASE WHEN ?12 THEN ?2 ELSE task_id END,
                approved_by = CASE WHEN ?13 THEN ?3 ELSE approved_by END,
                expense_date = COALESCE(?4, expense_date),
                description = COALESCE(?5, description),
                amount = COALESCE(?6, amount),
                billable = COALESCE(?7, billable),
                status = COALESCE(?8, status),
                receipt_url = CASE WHEN ?14 THEN ?9 ELSE receipt_url END,
                linked_invoice_line_id = CASE WHEN ?15 THEN ?10 ELSE linked_invoice_line_id END,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(dto.task_id.flatten())
        .bind(dto.approved_by.flatten())
        .bind(dto.expense_date)
        .bind(&dto.description)
        .bind(dto.amount)
        .bind(dto.billable)
        .bind(&dto.status)
        .bind(dto.receipt_url.clone().flatten())
        .bind(dto.linked_invoice_line_id.flatten())
        .bind(Utc::now())
        .bind(dto.task_id.is_some())
        .bind(dto.approved_by.is_some())
        .bind(dto.receipt_url.is_some())
        .bind(dto.linked_invoice_line_id.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Expense", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Expense", id))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Expense", id));
        }

        tracing::debug!(expense_id = id, "Expense deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM expenses WHERE id = ?1)")
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

    pub(crate) fn new_expense(project_id: Id, submitted_by: Id, amount: f64) -> CreateExpenseDto {
        CreateExpenseDto {
            project_id,
            task_id: None,
            submitted_by,
            expense_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            description: "Travel".to_string(),
            amount,
            billable: true,
            status: "pending".to_string(),
            receipt_url: None,
        }
    }

    #[tokio::test]
    async fn test_approve_expense() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let approver = seed_user(db.pool(), "boss@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let repo = ExpenseRepository::new(db.pool().clone());
        let expense = repo.create(new_expense(project.id, user, 300.0)).await.unwrap();
        assert_eq!(expense.submitter_email.as_deref(), Some("dev@x.com"));

        let approved = repo
            .update(
                expense.id,
                UpdateExpenseDto {
                    status: Some("approved".into()),
                    approved_by: Some(Some(approver)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.status, "approved");
        assert_eq!(approved.approved_by, Some(approver));
        assert_eq!(approved.amount, 300.0);
        assert_eq!(repo.total_for_project(project.id).await.unwrap(), 300.0);

        let reopened = repo
            .update(
                expense.id,
                UpdateExpenseDto {
                    status: Some("pending".into()),
                    approved_by: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(reopened.approved_by, None);
    }

    #[tokio::test]
    async fn test_task_delete_clears_expense_task() {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let projects = ProjectRepository::new(db.pool().clone());
        let project = projects.create(new_project("P-1", 0.0)).await.unwrap();
        let tasks = TaskRepository::new(db.pool().clone());
        let task = tasks.create(new_task(project.id, user, "Task")).await.unwrap();
        let repo = ExpenseRepository::new(db.pool().clone());
        let expense = repo
            .create(CreateExpenseDto {
                task_id: Some(task.id),
                ..new_expense(project.id, user, 50.0)
            })
            .await
            .unwrap();

        tasks.delete(task.id).await.unwrap();

        let expense = repo.find_by_id(expense.id).await.unwrap().unwrap();
        assert_eq!(expense.task_id, None);

        let err = projects.delete(project.id).await.unwrap_err();
        assert!(err.is_foreign_key_violation());
    }
}

//! Project repository
//!
//! Database operations for projects.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

/// Project row, joined with its manager's email and member count
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectRow {
    pub id: i64,
    pub project_code: String,
    pub name: String,
    pub description: Option<String>,
    pub project_manager_id: Option<i64>,
    pub manager_email: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub budget_amount: f64,
    pub members_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_PROJECT: &str = r#"
    SELECT p.id, p.project_code, p.name, p.description, p.project_manager_id,
           u.email AS manager_email, p.start_date, p.end_date, p.status, p.budget_amount,
           (SELECT COUNT(*) FROM project_members m WHERE m.project_id = p.id) AS members_count,
           p.created_at, p.updated_at
    FROM projects p
    LEFT JOIN users u ON u.id = p.project_manager_id
"#;

#[derive(Debug, Clone)]
pub struct CreateProjectDto {
    pub project_code: String,
    pub name: String,
    pub description: Option<String>,
    pub project_manager_id: Option<Id>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub budget_amount: f64,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateProjectDto {
    pub project_code: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub project_manager_id: Option<Option<Id>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub status: Option<String>,
    pub budget_amount: Option<f64>,
}

/// Project repository implementation
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Whether another project already uses this code
    pub async fn code_taken(&self, code: &str, except_id: Option<Id>) -> RepositoryResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE project_code = ?1 AND (?2 IS NULL OR id != ?2))",
        )
        .bind(code)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    /// Projects managed by a user
    pub async fn find_managed_by(&self, user_id: Id) -> RepositoryResult<Vec<ProjectRow>> {
        let sql = format!("{} WHERE p.project_manager_id = ?1 ORDER BY p.id", SELECT_PROJECT);
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Projects a user belongs to as a member
    pub async fn find_by_member(&self, user_id: Id) -> RepositoryResult<Vec<ProjectRow>> {
        let sql = format!(
            "{} WHERE p.id IN (SELECT project_id FROM project_members WHERE user_id = ?1) ORDER BY p.id",
            SELECT_PROJECT
        );
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl Repository<ProjectRow, CreateProjectDto, UpdateProjectDto> for ProjectRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ProjectRow>> {
        let sql = format!("{} WHERE p.id = ?1", SELECT_PROJECT);
        let row = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<ProjectRow>> {
        let sql = format!("{} ORDER BY p.id LIMIT ?1 OFFSET ?2", SELECT_PROJECT);
        let rows = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateProjectDto) -> RepositoryResult<ProjectRow> {
        if self.code_taken(&dto.project_code, None).await? {
            return Err(RepositoryError::Conflict("Project code already exists".into()));
        }

        let now = Utc::now();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO projects (
                project_code, name, description, project_manager_id,
                start_date, end_date, status, budget_amount, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING id
            "#,
        )
        .bind(&dto.project_code)
        .bind(&dto.name)
        .bind(&dto.description)
        .bind(dto.project_manager_id)
        .bind(dto.start_date)
        .bind(dto.end_date)
        .bind(&dto.status)
        .bind(dto.budget_amount)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(project_id = id, code = %dto.project_code, "Project created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Project", id))
    }

    async fn update(&self, id: Id, dto: UpdateProjectDto) -> RepositoryResult<ProjectRow> {
        if let Some(code) = dto.project_code.as_deref() {
            if self.code_taken(code, Some(id)).await? {
                return Err(RepositoryError::Conflict("Project code already exists".into()));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE projects SET
                project_code = COALESCE(?2, project_code),
                name = COALESCE(?3, name),
                description = CASE WHEN ?11 THEN ?4 ELSE description END,
                project_manager_id = CASE WHEN ?12 THEN ?5 ELSE project_manager_id END,
                start_date = CASE WHEN ?13 THEN ?6 ELSE start_date END,
                end_date = CASE WHEN ?14 THEN ?7 ELSE end_date END,
                status = COALESCE(?8, status),
                budget_amount = COALESCE(?9, budget_amount),
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&dto.project_code)
        .bind(&dto.name)
        .bind(dto.description.clone().flatten())
        .bind(dto.project_manager_id.flatten())
        .bind(dto.start_date.flatten())
        .bind(dto.end_date.flatten())
        .bind(&dto.status)
        .bind(dto.budget_amount)
        .bind(Utc::now())
        .bind(dto.description.is_some())
        .bind(dto.project_manager_id.is_some())
        .bind(dto.start_date.is_some())
        .bind(dto.end_date.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Project", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Project", id))
    }

    /// Deleting a project removes its members and tasks. Timesheets,
    /// expenses and commercial documents restrict the delete.
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Project", id));
        }

        tracing::debug!(project_id = id, "Project deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

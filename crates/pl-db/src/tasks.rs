//! Task repository
//!
//! Database operations for tasks. Rows carry the creator's email, the
//! project name and assignment/comment counts so list views need no
//! follow-up queries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub project_id: i64,
    pub project_name: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub state: String,
    pub due_date: Option<NaiveDate>,
    pub created_by: i64,
    pub creator_email: Option<String>,
    pub assignments_count: i64,
    pub comments_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_TASK: &str = r#"
    SELECT t.id, t.project_id, p.name AS project_name, t.title, t.description,
           t.priority, t.state, t.due_date, t.created_by, u.email AS creator_email,
           (SELECT COUNT(*) FROM task_assignments a WHERE a.task_id = t.id) AS assignments_count,
           (SELECT COUNT(*) FROM task_comments c WHERE c.task_id = t.id) AS comments_count,
           t.created_at, t.updated_at
    FROM tasks t
    LEFT JOIN projects p ON p.id = t.project_id
    LEFT JOIN users u ON u.id = t.created_by
"#;

#[derive(Debug, Clone)]
pub struct CreateTaskDto {
    pub project_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub state: String,
    pub due_date: Option<NaiveDate>,
    pub created_by: Id,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskDto {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<String>,
    pub state: Option<String>,
    pub due_date: Option<Option<NaiveDate>>,
}

pub struct TaskRepository {
    pool: SqlitePool,
}

impl TaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Vec<TaskRow>> {
        let sql = format!("{} WHERE t.project_id = ?1 ORDER BY t.id", SELECT_TASK);
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Tasks ordered by due date, undated tasks last
    pub async fn find_by_project_by_due_date(
        &self,
        project_id: Id,
    ) -> RepositoryResult<Vec<TaskRow>> {
        let sql = format!(
            "{} WHERE t.project_id = ?1 ORDER BY t.due_date IS NULL, t.due_date, t.id",
            SELECT_TASK
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Tasks assigned to a user
    pub async fn find_assigned_to(&self, user_id: Id) -> RepositoryResult<Vec<TaskRow>> {
        let sql = format!(
            "{} WHERE t.id IN (SELECT task_id FROM task_assignments WHERE user_id = ?1) ORDER BY t.id",
            SELECT_TASK
        );
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl Repository<TaskRow, CreateTaskDto, UpdateTaskDto> for TaskRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<TaskRow>> {
        let sql = format!("{} WHERE t.id = ?1", SELECT_TASK);
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<TaskRow>> {
        let sql = format!("{} ORDER BY t.id LIMIT ?1 OFFSET ?2", SELECT_TASK);
        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(page.sql_limit())
            .bind(page.sql_offset())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateTaskDto) -> RepositoryResult<TaskRow> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (
                project_id, title, description, priority, state, due_date,
                created_by, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING id
            "#,
        )
        .bind(dto.project_id)
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(&dto.priority)
        .bind(&dto.state)
        .bind(dto.due_date)
        .bind(dto.created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(task_id = id, project_id = dto.project_id, "Task created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Task", id))
    }

    async fn update(&self, id: Id, dto: UpdateTaskDto) -> RepositoryResult<TaskRow> {
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                title = COALESCE(?2, title),
                description = CASE WHEN ?8 THEN ?3 ELSE description END,
                priority = COALESCE(?4, priority),
                state = COALESCE(?5, state),
                due_date = CASE WHEN ?9 THEN ?6 ELSE due_date END,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&dto.title)
        .bind(dto.description.clone().flatten())
        .bind(&dto.priority)
        .bind(&dto.state)
        .bind(dto.due_date.flatten())
        .bind(Utc::now())
        .bind(dto.description.is_some())
        .bind(dto.due_date.is_some())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Task", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Task", id))
    }

    /// Assignments, comments, attachments and timesheets go with the task;
    /// expenses keep their row with the task reference cleared.
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Task", id));
        }

        tracing::debug!(task_id = id, "Task deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

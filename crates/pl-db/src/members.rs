//! Project member repository

use chrono::{DateTime, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberRow {
    pub id: i64,
    pub project_id: i64,
    pub user_id: i64,
    pub email: Option<String>,
    pub role_in_project: String,
    pub added_at: DateTime<Utc>,
}

const SELECT_MEMBER: &str = r#"
    SELECT m.id, m.project_id, m.user_id, u.email, m.role_in_project, m.added_at
    FROM project_members m
    LEFT JOIN users u ON u.id = m.user_id
"#;

pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_project(&self, project_id: Id) -> RepositoryResult<Vec<MemberRow>> {
        let sql = format!("{} WHERE m.project_id = ?1 ORDER BY m.id", SELECT_MEMBER);
        let rows = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn is_member(&self, project_id: Id, user_id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Add a user to a project
    pub async fn add(&self, project_id: Id, user_id: Id, role: &str) -> RepositoryResult<MemberRow> {
        if self.is_member(project_id, user_id).await? {
            return Err(RepositoryError::Conflict(
                "User is already a member of this project".into(),
            ));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO project_members (project_id, user_id, role_in_project, added_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(project_id, user_id, "Project member added");

        let sql = format!("{} WHERE m.id = ?1", SELECT_MEMBER);
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// Remove a membership; it must belong to the given project
    pub async fn remove(&self, project_id: Id, member_id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM project_members WHERE id = ?1 AND project_id = ?2")
            .bind(member_id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Project member", member_id));
        }
        Ok(())
    }
}

//! Task sub-resources: assignments, comments and attachments

use chrono::{DateTime, Utc};
use pl_core::Id;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentRow {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub email: Option<String>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommentRow {
    pub id: i64,
    pub task_id: i64,
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AttachmentRow {
    pub id: i64,
    pub task_id: i64,
    pub uploaded_by: Option<i64>,
    pub uploader_email: Option<String>,
    pub file_name: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}

const SELECT_ASSIGNMENT: &str = r#"
    SELECT a.id, a.task_id, a.user_id, u.email, a.assigned_at
    FROM task_assignments a
    LEFT JOIN users u ON u.id = a.user_id
"#;

const SELECT_COMMENT: &str = r#"
    SELECT c.id, c.task_id, c.user_id, u.email, c.comment, c.created_at
    FROM task_comments c
    LEFT JOIN users u ON u.id = c.user_id
"#;

const SELECT_ATTACHMENT: &str = r#"
    SELECT f.id, f.task_id, f.uploaded_by, u.email AS uploader_email,
           f.file_name, f.file_url, f.uploaded_at
    FROM task_attachments f
    LEFT JOIN users u ON u.id = f.uploaded_by
"#;

/// Who is working on a task
pub struct AssignmentRepository {
    pool: SqlitePool,
}

impl AssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_task(&self, task_id: Id) -> RepositoryResult<Vec<AssignmentRow>> {
        let sql = format!("{} WHERE a.task_id = ?1 ORDER BY a.id", SELECT_ASSIGNMENT);
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn assign(&self, task_id: Id, user_id: Id) -> RepositoryResult<AssignmentRow> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM task_assignments WHERE task_id = ?1 AND user_id = ?2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            return Err(RepositoryError::Conflict(
                "User is already assigned to this task".into(),
            ));
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO task_assignments (task_id, user_id, assigned_at) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(task_id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let sql = format!("{} WHERE a.id = ?1", SELECT_ASSIGNMENT);
        let row = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn unassign(&self, task_id: Id, assignment_id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM task_assignments WHERE id = ?1 AND task_id = ?2")
            .bind(assignment_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Assignment", assignment_id));
        }
        Ok(())
    }
}

pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Comments on a task, newest first
    pub async fn find_by_task(&self, task_id: Id) -> RepositoryResult<Vec<CommentRow>> {
        let sql = format!(
            "{} WHERE c.task_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
            SELECT_COMMENT
        );
        let rows = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find(&self, task_id: Id, comment_id: Id) -> RepositoryResult<Option<CommentRow>> {
        let sql = format!("{} WHERE c.id = ?1 AND c.task_id = ?2", SELECT_COMMENT);
        let row = sqlx::query_as::<_, CommentRow>(&sql)
            .bind(comment_id)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, task_id: Id, user_id: Id, comment: &str) -> RepositoryResult<CommentRow> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO task_comments (task_id, user_id, comment, created_at) VALUES (?1, ?2, ?3, ?4) RETURNING id",
        )
        .bind(task_id)
        .bind(user_id)
        .bind(comment)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        self.find(task_id, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Comment", id))
    }

    pub async fn delete(&self, comment_id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM task_comments WHERE id = ?1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Comment", comment_id));
        }
        Ok(())
    }
}

/// File references attached to tasks; files themselves live elsewhere
pub struct AttachmentRepository {
    pool: SqlitePool,
}

impl AttachmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_task(&self, task_id: Id) -> RepositoryResult<Vec<AttachmentRow>> {
        let sql = format!("{} WHERE f.task_id = ?1 ORDER BY f.id", SELECT_ATTACHMENT);
        let rows = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn create(
        &self,
        task_id: Id,
        uploaded_by: Id,
        file_name: &str,
        file_url: &str,
    ) -> RepositoryResult<AttachmentRow> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO task_attachments (task_id, uploaded_by, file_name, file_url, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(task_id)
        .bind(uploaded_by)
        .bind(file_name)
        .bind(file_url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let sql = format!("{} WHERE f.id = ?1", SELECT_ATTACHMENT);
        let row = sqlx::query_as::<_, AttachmentRow>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn delete(&self, task_id: Id, attachment_id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM task_attachments WHERE id = ?1 AND task_id = ?2")
            .bind(attachment_id)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("Attachment", attachment_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Database;
    use crate::projects::tests::{new_project, seed_user};
    use crate::projects::ProjectRepository;
    use crate::repository::Repository;
    use crate::tasks::tests::new_task;
    use crate::tasks::TaskRepository;

    async fn setup() -> (Database, Id, Id) {
        let db = Database::in_memory().await.unwrap();
        let user = seed_user(db.pool(), "dev@x.com").await;
        let project = ProjectRepository::new(db.pool().clone())
            .create(new_project("P-1", 0.0))
            .await
            .unwrap();
        let task = TaskRepository::new(db.pool().clone())
            .create(new_task(project.id, user, "Task"))
            .await
            .unwrap();
        (db, user, task.id)
    }

    #[tokio::test]
    async fn test_duplicate_assignment_is_conflict() {
        let (db, user, task) = setup().await;
        let repo = AssignmentRepository::new(db.pool().clone());

        let assignment = repo.assign(task, user).await.unwrap();
        assert_eq!(assignment.email.as_deref(), Some("dev@x.com"));
        assert!(matches!(
            repo.assign(task, user).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));

        let task_row = TaskRepository::new(db.pool().clone())
            .find_by_id(task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task_row.assignments_count, 1);

        repo.unassign(task, assignment.id).await.unwrap();
        assert!(repo.find_by_task(task).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_newest_first() {
        let (db, user, task) = setup().await;
        let repo = CommentRepository::new(db.pool().clone());
        let first = repo.create(task, user, "first").await.unwrap();
        let second = repo.create(task, user, "second").await.unwrap();

        let comments = repo.find_by_task(task).await.unwrap();
        assert_eq!(comments[0].id, second.id);
        assert_eq!(comments[1].id, first.id);
        assert!(repo.find(task + 1, first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_task_delete_cascades_sub_resources() {
        let (db, user, task) = setup().await;
        AssignmentRepository::new(db.pool().clone()).assign(task, user).await.unwrap();
        CommentRepository::new(db.pool().clone()).create(task, user, "hi").await.unwrap();
        let attachments = AttachmentRepository::new(db.pool().clone());
        attachments
            .create(task, user, "plan.pdf", "https://files.example.com/plan.pdf")
            .await
            .unwrap();

        TaskRepository::new(db.pool().clone()).delete(task).await.unwrap();

        for table in ["task_assignments", "task_comments", "task_attachments"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(db.pool())
                .await
                .unwrap();
            assert_eq!(count, 0, "{} should be empty", table);
        }
    }
}

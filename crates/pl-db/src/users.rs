//! User repository
//!
//! Database operations for users.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pl_core::Id;
use sqlx::{FromRow, SqlitePool};

use crate::repository::{Pagination, Repository, RepositoryError, RepositoryResult};

/// User database entity
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a user; the password arrives already hashed
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

/// User repository implementation
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a user by email (exact match)
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, is_active, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Whether another user already holds this email
    pub async fn email_taken(&self, email: &str, except_id: Option<Id>) -> RepositoryResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND (?2 IS NULL OR id != ?2))",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }
}

#[async_trait]
impl Repository<UserRow, CreateUserDto, UpdateUserDto> for UserRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, is_active, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, password_hash, is_active, created_at
            FROM users
            ORDER BY id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page.sql_limit())
        .bind(page.sql_offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, dto: CreateUserDto) -> RepositoryResult<UserRow> {
        if self.email_taken(&dto.email, None).await? {
            return Err(RepositoryError::Conflict("User already exists".into()));
        }

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash, is_active, created_at)
            VALUES (?1, ?2, 1, ?3)
            RETURNING id, email, password_hash, is_active, created_at
            "#,
        )
        .bind(&dto.email)
        .bind(&dto.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(user_id = row.id, "User created");
        Ok(row)
    }

    async fn update(&self, id: Id, dto: UpdateUserDto) -> RepositoryResult<UserRow> {
        if let Some(email) = dto.email.as_deref() {
            if self.email_taken(email, Some(id)).await? {
                return Err(RepositoryError::Conflict("Email already in use".into()));
            }
        }

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                email = COALESCE(?2, email),
                password_hash = COALESCE(?3, password_hash),
                is_active = COALESCE(?4, is_active)
            WHERE id = ?1
            RETURNING id, email, password_hash, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(&dto.email)
        .bind(&dto.password_hash)
        .bind(dto.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::not_found("User", id))?;

        Ok(row)
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found("User", id));
        }

        tracing::debug!(user_id = id, "User deleted");
        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

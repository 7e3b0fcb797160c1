//! Repository traits and shared types
//!
//! Provides generic CRUD operations for database entities.

use async_trait::async_trait;
use pl_core::Id;
use serde::Deserialize;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: Id) -> Self {
        RepositoryError::NotFound(format!("{} {}", entity, id))
    }

    fn database_error(&self) -> Option<&dyn sqlx::error::DatabaseError> {
        match self {
            RepositoryError::Database(sqlx::Error::Database(e)) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// A unique constraint rejected the write
    pub fn is_unique_violation(&self) -> bool {
        self.database_error()
            .is_some_and(|e| e.is_unique_violation())
    }

    /// A foreign key rejected the write, typically a restricted delete.
    ///
    /// SQLite reports `ON DELETE RESTRICT` as a trigger constraint (1811),
    /// which sqlx does not classify as a foreign key error.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.database_error().is_some_and(|e| {
            e.is_foreign_key_violation()
                || matches!(e.code().as_deref(), Some(FOREIGN_KEY_CODE | RESTRICT_CODE))
                || e.message().starts_with("FOREIGN KEY constraint failed")
        })
    }
}

/// SQLITE_CONSTRAINT_FOREIGNKEY
const FOREIGN_KEY_CODE: &str = "787";
/// SQLITE_CONSTRAINT_TRIGGER, raised by `ON DELETE RESTRICT`
const RESTRICT_CODE: &str = "1811";

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Base repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, CreateDto, UpdateDto>: Send + Sync {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    /// Find all entities, optionally paginated
    async fn find_all(&self, page: Pagination) -> RepositoryResult<Vec<T>>;

    async fn count(&self) -> RepositoryResult<i64>;

    async fn create(&self, dto: CreateDto) -> RepositoryResult<T>;

    /// Apply a partial update; absent fields keep their value
    async fn update(&self, id: Id, dto: UpdateDto) -> RepositoryResult<T>;

    async fn delete(&self, id: Id) -> RepositoryResult<()>;

    async fn exists(&self, id: Id) -> RepositoryResult<bool>;
}

/// Pagination parameters for list queries. Lists are unbounded unless a
/// limit is given.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    /// Value for a `LIMIT` clause; SQLite treats a negative limit as none
    pub fn sql_limit(&self) -> i64 {
        self.limit.filter(|l| *l >= 0).unwrap_or(-1)
    }

    pub fn sql_offset(&self) -> i64 {
        self.offset.max(0)
    }
}

//! # pl-db
//!
//! Database layer for ProjectLedger.
//!
//! This crate provides SQLite access using SQLx, including:
//!
//! - Connection pool management and embedded migrations
//! - Repository pattern for CRUD operations
//! - One generic repository for the four commercial document kinds
//! - Aggregate queries for the analytics reports
//!
//! ## Example
//!
//! ```ignore
//! use pl_db::{Database, ProjectRepository, Repository};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let repo = ProjectRepository::new(db.pool().clone());
//! let project = repo.find_by_id(1).await?;
//! ```

pub mod analytics;
pub mod documents;
pub mod expenses;
pub mod members;
pub mod partners;
pub mod pool;
pub mod products;
pub mod projects;
pub mod repository;
pub mod task_items;
pub mod tasks;
pub mod timesheets;
pub mod users;

// Re-exports
pub use analytics::{
    AnalyticsRepository, AnalyticsScope, ExpenseTotals, GroupCount, GroupTotal, ProjectTimelineRow,
    ProjectTotals, TaskTimelineRow, TaskTotals, TimesheetTotals,
};
pub use documents::{
    CreateDocumentDto, DocumentRepository, DocumentRow, LineRow, NewLineDto, UpdateDocumentDto,
    UpdateLineDto,
};
pub use expenses::{CreateExpenseDto, ExpenseRepository, ExpenseRow, UpdateExpenseDto};
pub use members::{MemberRepository, MemberRow};
pub use partners::{CreatePartnerDto, PartnerRepository, PartnerRow, UpdatePartnerDto};
pub use pool::{Database, PoolStats};
pub use products::{CreateProductDto, ProductRepository, ProductRow, UpdateProductDto};
pub use projects::{CreateProjectDto, ProjectRepository, ProjectRow, UpdateProjectDto};
pub use repository::{Pagination, Repository, RepositoryError, RepositoryResult};
pub use task_items::{
    AssignmentRepository, AssignmentRow, AttachmentRepository, AttachmentRow, CommentRepository,
    CommentRow,
};
pub use tasks::{CreateTaskDto, TaskRepository, TaskRow, UpdateTaskDto};
pub use timesheets::{
    derive_cost, CreateTimesheetDto, TimesheetRepository, TimesheetRow, UpdateTimesheetDto,
};
pub use users::{CreateUserDto, UpdateUserDto, UserRepository, UserRow};

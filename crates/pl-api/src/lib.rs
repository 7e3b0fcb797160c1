//! # pl-api
//!
//! JSON API handlers for ProjectLedger.
//!
//! One route group per entity family plus the read-only analytics reports.
//! Every route except `/register` and `/login` requires a session cookie.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, CurrentUser};
pub use routes::router;

//! # pl-auth
//!
//! Authentication for ProjectLedger.
//!
//! - Server-side sessions keyed by an opaque cookie value
//! - Session cookie formatting and parsing
//! - Argon2 password hashing

pub mod password;
pub mod session;

pub use password::*;
pub use session::*;

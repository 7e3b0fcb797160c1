//! # pl-contracts
//!
//! Request validation for ProjectLedger.
//!
//! Contracts check incoming parameters before create/update operations:
//! required fields, enumerated values, date formats, non-negative amounts
//! and email shape. Every problem is collected into one
//! [`pl_core::ValidationErrors`] so a client sees all of them at once.

pub mod base;
pub mod documents;
pub mod expenses;
pub mod partners;
pub mod products;
pub mod projects;
pub mod tasks;
pub mod timesheets;
pub mod users;

pub use base::*;

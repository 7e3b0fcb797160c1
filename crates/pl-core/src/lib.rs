//! # pl-core
//!
//! Core types, errors, and utilities for ProjectLedger.
//!
//! This crate provides the foundational building blocks used across all other crates:
//! - Common error types and field-level validation errors
//! - Domain enumerations (project status, task state, document status, ...)
//! - The commercial document descriptor shared by orders, invoices and bills
//! - Date parsing and reporting helpers (ratios, overdue checks, date filters)
//! - Configuration types

pub mod config;
pub mod dates;
pub mod documents;
pub mod error;
pub mod reporting;
pub mod types;

pub use documents::*;
pub use error::*;
pub use types::*;

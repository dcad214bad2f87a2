//! certcode Core Library
//!
//! Shared functionality for certcode components:
//! - `SQLite` connection helpers and `DatabaseError`
//! - Time-sortable certificate code identifiers
//! - Tracing initialization

pub mod code;
pub mod db;
pub mod tracing_init;

pub use code::{CodeError, CodeGenerator, is_valid_code};
pub use db::DatabaseError;

//! Embedded relational persistence for the depot file manager.
//!
//! This crate is the "database side" of the depot's two narrow boundary
//! contracts: four tables (departments, categories, files, file metadata) with
//! the constraint set the ingestion engine relies on:
//!
//! - `files.hash` is **globally unique** — the collision signal the engine
//!   reacts to, surfaced as [`StoreError::UniqueViolation`]
//! - Category names are unique within a department; department names globally
//! - Foreign keys are checked on insert
//! - Deletes cascade: Department → Category → File → FileMetadata
//!
//! ## Transactions
//!
//! All mutation happens through [`Database::transaction`], which hands the
//! caller a mutable view of the tables and restores the pre-transaction
//! snapshot if the closure returns an error. There is no ambient transactional
//! context: rollback on any early-return path is guaranteed by the closure
//! scope, not by convention.
//!
//! ## Persistence
//!
//! The table set serialises to JSON ([`Database::snapshot`] /
//! [`Database::from_tables`]) so callers can carry state across processes.

mod db;
mod entities;

pub use db::{Database, Tables};
pub use entities::{
    Category, Department, FileMetadata, FileRecord, NewCategory, NewDepartment, NewFile,
    NewFileMetadata,
};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row with the given id exists
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    /// Insert would violate a unique constraint
    #[error("unique constraint violation on {constraint} (value: {value})")]
    UniqueViolation {
        constraint: &'static str,
        value: String,
    },

    /// Insert references a row that does not exist
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Row types for the depot tables.
//!
//! Identity is a surrogate `u64` id allocated by the store on insert. `New*`
//! structs carry the caller-supplied columns; the store fills in ids and
//! timestamps.

use chrono::{DateTime, Utc};
use depot_types::{ContentHash, NonEmptyText};
use serde::{Deserialize, Serialize};

/// A department: the top-level organisational container.
///
/// Department names are unique across the whole system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns for inserting a department.
#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: NonEmptyText,
    pub description: Option<String>,
    pub created_by: u64,
}

/// A category inside a department.
///
/// Category names are unique within their department. Deleting a category
/// cascades to all contained files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub department_id: u64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns for inserting a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub department_id: u64,
    pub name: NonEmptyText,
    pub description: Option<String>,
    pub created_by: u64,
}

/// One logical file inside a category.
///
/// `hash` is the content fingerprint (SHA-256 of filename ‖ bytes) and is
/// globally unique. `current_metadata_id` points at the authoritative
/// [`FileMetadata`] row; it is `None` only in the window between the file-row
/// insert and the first metadata insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    pub category_id: u64,
    pub hash: ContentHash,
    pub current_metadata_id: Option<u64>,
    pub created_by: u64,
    pub updated_by: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns for inserting a file row.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub category_id: u64,
    pub hash: ContentHash,
    pub created_by: u64,
    pub updated_by: u64,
}

/// One named/sized/typed version of a file's content.
///
/// Rows are created on upload (and, in versioned-rename mode, on rename) and
/// are never deleted individually — only via cascade when the owning file goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: u64,
    pub file_id: u64,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size: u64,
    /// Provenance tag ("upload", "rename", ...); free-form.
    pub source_action: String,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

/// Columns for inserting a metadata row.
#[derive(Debug, Clone)]
pub struct NewFileMetadata {
    pub file_id: u64,
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size: u64,
    pub source_action: String,
    pub created_by: u64,
}

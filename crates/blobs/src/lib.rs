//! Depot blob storage
//!
//! This crate provides the physical byte storage behind the depot file manager.
//!
//! ## Design Principles
//!
//! - Record metadata (who, what, which category) lives in the relational store;
//!   this crate only ever sees opaque relative path strings and raw bytes
//! - Paths are caller-chosen and scoped per category
//!   (`categories/<category_id>/files/<filename>`)
//! - Deletion is idempotent: deleting an absent blob reports `false` rather than
//!   failing, so cleanup paths can run unconditionally
//! - All paths are validated against traversal before touching the filesystem
//!
//! ## Example Usage
//!
//! ```no_run
//! use depot_blobs::BlobStore;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = BlobStore::new(Path::new("blob_data"))?;
//! let path = store.store("categories/7/files/report.pdf", b"%PDF-1.4")?;
//! assert!(store.exists(&path));
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::BlobStore;

/// Errors that can occur during blob operations
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Root directory does not exist or is not a directory
    #[error("invalid blob root: {0}")]
    InvalidRoot(String),

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// Blob does not exist at the given path
    #[error("blob not found: {0}")]
    NotFound(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error taxonomy for depot core operations.
//!
//! Per-file ingestion failures are *data* — they travel in
//! [`crate::BatchResult::failed`] as filename/reason pairs and never surface as
//! `DepotError`. This enum covers everything that fails an operation as a
//! whole: bad input, missing rows, missing blobs, and errors crossing the
//! store/blob crate seams.

use depot_blobs::BlobError;
use depot_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("category not found: {0}")]
    CategoryNotFound(u64),

    #[error("department not found: {0}")]
    DepartmentNotFound(u64),

    #[error("file not found: {0}")]
    FileNotFound(u64),

    #[error("file {0} has no current metadata")]
    MetadataNotFound(u64),

    #[error("blob missing from storage: {0}")]
    BlobMissing(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),
}

/// Result type for depot core operations.
pub type DepotResult<T> = std::result::Result<T, DepotError>;

//! # Depot Core
//!
//! Core business logic for the depot departmental file manager.
//!
//! The centre of gravity is the content-addressed **ingestion pipeline**: each
//! uploaded file is hashed as `SHA-256(filename ‖ content)`, collision against
//! previously stored files is detected through the store's global hash
//! constraint, a collision triggers exactly one deterministic rename-and-rehash
//! retry, and the file row, blob, and metadata row are linked inside a single
//! failure-safe transaction per batch.
//!
//! Around that sit the thin operations the pipeline needs to be usable:
//! metadata rename, download, deletion (with cascading blob cleanup), and
//! department/category management.
//!
//! **No API concerns**: transports, authentication, and rendering live outside
//! this workspace entirely.

pub mod config;
pub mod constants;
pub mod containers;
pub mod error;
pub mod files;
pub mod hashing;
pub mod ingest;
mod naming;

pub use config::{CoreConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::{DepotError, DepotResult};
pub use files::{Download, FileListing};
pub use hashing::content_hash;
pub use ingest::{BatchResult, RawUpload, RejectedUpload, StoredFile};

use depot_blobs::BlobStore;
use depot_store::Database;

/// The depot service: ingestion plus the surrounding file and container
/// operations, bound to one store and one blob root.
#[derive(Debug)]
pub struct DepotService {
    db: Database,
    blobs: BlobStore,
    config: CoreConfig,
}

impl DepotService {
    /// Creates a service over the given database and configuration.
    ///
    /// # Errors
    ///
    /// Returns `DepotError` if the configured blob root is not a usable
    /// directory.
    pub fn new(db: Database, config: CoreConfig) -> DepotResult<Self> {
        let blobs = BlobStore::new(config.blob_root())?;
        Ok(Self { db, blobs, config })
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns the blob storage service.
    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Returns the resolved configuration.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

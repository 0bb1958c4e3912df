//! File operations around the ingestion pipeline: rename, download, delete,
//! and listing.
//!
//! Renaming only ever touches metadata — the physical blob keeps the path it
//! was written under at upload time, so after a rename the display filename
//! and the storage filename diverge. Downloads therefore always resolve by
//! stored path and only *report* the display filename.

use crate::constants::SOURCE_ACTION_RENAME;
use crate::error::{DepotError, DepotResult};
use crate::DepotService;
use depot_store::{FileMetadata, FileRecord, NewFileMetadata};
use depot_types::NonEmptyText;
use serde::Serialize;
use std::collections::BTreeSet;

/// A downloaded file: the bytes plus the display attributes to serve them
/// under.
#[derive(Debug, Clone)]
pub struct Download {
    /// Current display filename (not the physical storage filename).
    pub filename: String,
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// A file hydrated with its current metadata, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct FileListing {
    pub file: FileRecord,
    pub current_metadata: Option<FileMetadata>,
}

impl DepotService {
    /// Renames a file's current metadata.
    ///
    /// Default behaviour updates the current metadata row's filename in place;
    /// `storage_path`, `mime_type` and `size` are never touched. With
    /// `CoreConfig::versioned_rename` enabled, the rename is recorded as a new
    /// metadata row (`source_action: "rename"`) and the current-metadata
    /// pointer is swapped, keeping the old row as history.
    ///
    /// # Errors
    ///
    /// - `DepotError::InvalidInput` if the new filename is empty
    /// - `DepotError::FileNotFound` / `DepotError::MetadataNotFound` if the
    ///   file or its current metadata does not exist
    pub fn rename(
        &self,
        file_id: u64,
        actor_id: u64,
        new_filename: &str,
    ) -> DepotResult<FileMetadata> {
        let filename = NonEmptyText::new(new_filename)
            .map_err(|_| DepotError::InvalidInput("filename cannot be empty".into()))?;

        self.database().transaction(|tables| {
            let file = tables
                .file(file_id)
                .map_err(|_| DepotError::FileNotFound(file_id))?;
            let current_id = file
                .current_metadata_id
                .ok_or(DepotError::MetadataNotFound(file_id))?;

            let renamed = if self.config().versioned_rename() {
                let current = tables
                    .metadata(current_id)
                    .map_err(|_| DepotError::MetadataNotFound(file_id))?
                    .clone();
                let row = tables.insert_metadata(NewFileMetadata {
                    file_id,
                    filename: filename.to_string(),
                    storage_path: current.storage_path,
                    mime_type: current.mime_type,
                    size: current.size,
                    source_action: SOURCE_ACTION_RENAME.to_owned(),
                    created_by: actor_id,
                })?;
                tables.update_file_current_metadata(file_id, row.id, actor_id)?;
                row
            } else {
                tables
                    .update_metadata_filename(current_id, filename.to_string())
                    .map_err(|_| DepotError::MetadataNotFound(file_id))?
            };

            tracing::info!(file_id, filename = %renamed.filename, "file renamed");
            Ok(renamed)
        })
    }

    /// Resolves a file's current content for download.
    ///
    /// # Errors
    ///
    /// - `DepotError::FileNotFound` if the file row does not exist
    /// - `DepotError::MetadataNotFound` if the current-metadata pointer is
    ///   unset
    /// - `DepotError::BlobMissing` if the referenced blob is gone from storage
    pub fn download(&self, file_id: u64) -> DepotResult<Download> {
        let metadata = self
            .database()
            .read(|t| t.current_metadata(file_id).map(|m| m.cloned()))
            .map_err(|_| DepotError::FileNotFound(file_id))?
            .ok_or(DepotError::MetadataNotFound(file_id))?;

        if !self.blobs().exists(&metadata.storage_path) {
            return Err(DepotError::BlobMissing(metadata.storage_path));
        }

        let content = self.blobs().read(&metadata.storage_path)?;
        Ok(Download {
            filename: metadata.filename,
            mime_type: metadata.mime_type,
            content,
        })
    }

    /// Deletes a file: its blob (best-effort) and its row, cascading to all
    /// metadata rows.
    ///
    /// The blob removal is not transactional and proceeds even if the blob is
    /// already missing; the row deletion rolls back if the transaction fails,
    /// but the blob removal cannot be undone.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::FileNotFound` if the file row does not exist.
    pub fn delete_file(&self, file_id: u64) -> DepotResult<FileRecord> {
        let metadata = self
            .database()
            .read(|t| t.current_metadata(file_id).map(|m| m.cloned()))
            .map_err(|_| DepotError::FileNotFound(file_id))?;

        if let Some(metadata) = &metadata {
            match self.blobs().delete(&metadata.storage_path) {
                Ok(removed) => {
                    tracing::info!(file_id, path = %metadata.storage_path, removed, "blob deleted")
                }
                Err(e) => {
                    tracing::warn!(file_id, path = %metadata.storage_path, error = %e, "blob delete failed")
                }
            }
        }

        self.database().transaction(|tables| {
            tables
                .delete_file(file_id)
                .map_err(|_| DepotError::FileNotFound(file_id))
        })
    }

    /// Lists the files of a category, hydrated with their current metadata.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::CategoryNotFound` if the category does not exist.
    pub fn list_files(&self, category_id: u64) -> DepotResult<Vec<FileListing>> {
        self.database().read(|tables| {
            tables
                .category(category_id)
                .map_err(|_| DepotError::CategoryNotFound(category_id))?;

            Ok(tables
                .files_in_category(category_id)
                .into_iter()
                .map(|file| {
                    let current_metadata = file
                        .current_metadata_id
                        .and_then(|id| tables.metadata(id).ok().cloned());
                    FileListing {
                        file,
                        current_metadata,
                    }
                })
                .collect())
        })
    }

    /// Lists the files of a category whose current display filename contains
    /// the query, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `DepotError::CategoryNotFound` if the category does not exist.
    pub fn search_files(&self, category_id: u64, query: &str) -> DepotResult<Vec<FileListing>> {
        let needle = query.to_lowercase();
        let listings = self.list_files(category_id)?;
        Ok(listings
            .into_iter()
            .filter(|listing| {
                listing
                    .current_metadata
                    .as_ref()
                    .is_some_and(|m| m.filename.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Collects the distinct storage paths referenced by a set of files.
    ///
    /// Used by the cascading container deletes to know which blobs to remove;
    /// includes historical metadata rows, not just the current pointer.
    pub(crate) fn storage_paths_for_files(&self, file_ids: &[u64]) -> Vec<String> {
        self.database().read(|tables| {
            let mut paths = BTreeSet::new();
            for &file_id in file_ids {
                for metadata in tables.metadata_for_file(file_id) {
                    paths.insert(metadata.storage_path);
                }
            }
            paths.into_iter().collect()
        })
    }
}

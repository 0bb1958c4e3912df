//! The content-addressed ingestion pipeline.
//!
//! A batch of raw uploads destined for one category is processed strictly in
//! submission order inside a single store transaction. Per file:
//!
//! 1. compute `SHA-256(filename ‖ content)`
//! 2. insert the file row; a unique-violation on `files.hash` triggers exactly
//!    one retry with a random ` (XXXX)` suffix spliced into the filename and a
//!    rehash under the new name
//! 3. write the blob at `categories/{category_id}/files/{final_filename}`
//! 4. insert the metadata row and point the file at it
//!
//! Per-file failures (validation, exhausted collision retry, blob or metadata
//! write) are swallowed into [`BatchResult::failed`] and never abort the batch;
//! a failing file is unwound completely — its file row is removed inside the
//! still-open transaction and its blob (if written) deleted — so no orphans
//! survive. Only an error escaping per-file handling rolls back the whole
//! batch, in which case every blob written during the attempt is removed
//! best-effort (that cleanup is not atomic with the rollback).
//!
//! Concurrent batches are safe without in-process locking on the engine's
//! side: the store's global hash constraint is the sole arbiter of "does this
//! content already exist", and a lost race simply surfaces as the handled
//! unique-violation.

use crate::constants::{FALLBACK_MIME, SOURCE_ACTION_UPLOAD};
use crate::error::{DepotError, DepotResult};
use crate::hashing::content_hash;
use crate::naming;
use crate::DepotService;
use depot_store::{FileMetadata, FileRecord, NewFile, NewFileMetadata, StoreError, Tables};
use depot_types::human_readable_size;
use serde::Serialize;

/// One raw file payload submitted for ingestion.
#[derive(Debug, Clone)]
pub struct RawUpload {
    /// Original filename as supplied by the uploader.
    pub filename: String,
    /// Declared MIME type, if the uploader provided one. Absent or blank
    /// values fall back to content sniffing, then to
    /// `application/octet-stream`.
    pub mime_type: Option<String>,
    /// Full file content. Bounded by the configured upload limit, so holding
    /// it in memory is safe.
    pub content: Vec<u8>,
}

/// A successfully ingested file: the hydrated row pair.
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub file: FileRecord,
    pub metadata: FileMetadata,
}

/// A per-file failure: original filename plus a human-readable reason.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedUpload {
    pub filename: String,
    pub reason: String,
}

/// Outcome of one ingestion batch, in submission order on both sides.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub succeeded: Vec<StoredFile>,
    pub failed: Vec<RejectedUpload>,
}

impl BatchResult {
    /// One-line summary suitable for user display.
    pub fn summary(&self) -> String {
        let mut message = format!("{} file(s) uploaded successfully.", self.succeeded.len());
        if !self.failed.is_empty() {
            message.push_str(&format!(" {} file(s) failed.", self.failed.len()));
        }
        message
    }
}

/// Outcome of processing a single upload inside the batch transaction.
enum FileOutcome {
    Stored(StoredFile),
    Rejected(String),
}

impl DepotService {
    /// Ingests a batch of uploads into a category.
    ///
    /// Files are processed in submission order; outcomes are returned in that
    /// same order, split into succeeded and failed. Per-file problems never
    /// fail the call — only an empty batch, a missing category, or an error
    /// escaping per-file handling does, and the latter rolls back everything
    /// persisted during the batch.
    ///
    /// # Errors
    ///
    /// - `DepotError::InvalidInput` if `uploads` is empty
    /// - `DepotError::CategoryNotFound` if the category does not exist
    /// - any `DepotError` escaping per-file handling (batch-fatal; the store
    ///   transaction is rolled back and written blobs are removed best-effort)
    pub fn ingest(
        &self,
        category_id: u64,
        actor_id: u64,
        uploads: Vec<RawUpload>,
    ) -> DepotResult<BatchResult> {
        if uploads.is_empty() {
            return Err(DepotError::InvalidInput(
                "upload batch cannot be empty".into(),
            ));
        }

        tracing::info!(
            category_id,
            actor_id,
            files = uploads.len(),
            "file upload started"
        );

        let mut written_blobs: Vec<String> = Vec::new();

        let result = self.database().transaction(|tables| {
            tables
                .category(category_id)
                .map_err(|_| DepotError::CategoryNotFound(category_id))?;

            let mut succeeded = Vec::new();
            let mut failed = Vec::new();

            for upload in &uploads {
                match self.ingest_one(tables, category_id, actor_id, upload, &mut written_blobs)? {
                    FileOutcome::Stored(stored) => {
                        tracing::info!(
                            file_id = stored.file.id,
                            filename = %stored.metadata.filename,
                            "file upload completed"
                        );
                        succeeded.push(stored);
                    }
                    FileOutcome::Rejected(reason) => {
                        tracing::warn!(
                            filename = %upload.filename,
                            %reason,
                            "file upload rejected"
                        );
                        failed.push(RejectedUpload {
                            filename: upload.filename.clone(),
                            reason,
                        });
                    }
                }
            }

            Ok(BatchResult { succeeded, failed })
        });

        match result {
            Ok(batch) => {
                tracing::info!(
                    uploaded = batch.succeeded.len(),
                    failed = batch.failed.len(),
                    "upload batch committed"
                );
                Ok(batch)
            }
            Err(e) => {
                // The store already rolled back; blobs written this batch are
                // now orphans and must go. Not atomic with the rollback.
                for path in &written_blobs {
                    if let Err(cleanup) = self.blobs().delete(path) {
                        tracing::warn!(path = %path, %cleanup, "failed to clean up blob after batch rollback");
                    }
                }
                tracing::error!(error = %e, "upload batch failed and was rolled back");
                Err(e)
            }
        }
    }

    /// Processes one upload inside the batch transaction.
    ///
    /// `Ok(FileOutcome::Rejected(_))` is a recorded per-file failure with all
    /// of its partial state already unwound; `Err(_)` is batch-fatal.
    fn ingest_one(
        &self,
        tables: &mut Tables,
        category_id: u64,
        actor_id: u64,
        upload: &RawUpload,
        written_blobs: &mut Vec<String>,
    ) -> DepotResult<FileOutcome> {
        if upload.filename.trim().is_empty() {
            return Ok(FileOutcome::Rejected("filename cannot be empty".into()));
        }

        let size = upload.content.len() as u64;
        let limit = self.config().max_upload_bytes();
        if size > limit {
            return Ok(FileOutcome::Rejected(format!(
                "file is {} which exceeds the {} upload limit",
                human_readable_size(size),
                human_readable_size(limit)
            )));
        }

        let mut filename = upload.filename.clone();
        let mut hash = content_hash(&filename, &upload.content);
        tracing::debug!(filename = %filename, hash = %hash, "content hash calculated");

        // First attempt always uses the original name; the randomised suffix
        // is the fallback, and there is no third attempt.
        let file = match tables.insert_file(NewFile {
            category_id,
            hash: hash.clone(),
            created_by: actor_id,
            updated_by: actor_id,
        }) {
            Ok(file) => file,
            Err(StoreError::UniqueViolation { .. }) => {
                let suffix = naming::random_suffix();
                filename = naming::suffixed_filename(&upload.filename, &suffix);
                hash = content_hash(&filename, &upload.content);
                tracing::info!(
                    original = %upload.filename,
                    renamed = %filename,
                    hash = %hash,
                    "duplicate hash detected, retrying with suffixed filename"
                );

                match tables.insert_file(NewFile {
                    category_id,
                    hash: hash.clone(),
                    created_by: actor_id,
                    updated_by: actor_id,
                }) {
                    Ok(file) => file,
                    Err(StoreError::UniqueViolation { .. }) => {
                        return Ok(FileOutcome::Rejected(
                            "hash collision persisted after rename retry".into(),
                        ));
                    }
                    Err(e) => return Ok(FileOutcome::Rejected(e.to_string())),
                }
            }
            Err(e) => return Ok(FileOutcome::Rejected(e.to_string())),
        };

        let storage_path = naming::storage_path_for(category_id, &filename);
        match self.blobs().store(&storage_path, &upload.content) {
            Ok(path) => written_blobs.push(path),
            Err(e) => {
                // No blob on disk; unwind the file row so nothing dangles.
                tables.delete_file(file.id)?;
                return Ok(FileOutcome::Rejected(format!("blob write failed: {e}")));
            }
        }

        let mime_type = upload
            .mime_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| infer::get(&upload.content).map(|kind| kind.mime_type().to_owned()))
            .unwrap_or_else(|| FALLBACK_MIME.to_owned());

        let metadata = match tables.insert_metadata(NewFileMetadata {
            file_id: file.id,
            filename: filename.clone(),
            storage_path: storage_path.clone(),
            mime_type,
            size,
            source_action: SOURCE_ACTION_UPLOAD.to_owned(),
            created_by: actor_id,
        }) {
            Ok(metadata) => metadata,
            Err(e) => {
                if let Err(cleanup) = self.blobs().delete(&storage_path) {
                    tracing::warn!(path = %storage_path, %cleanup, "failed to clean up blob");
                }
                written_blobs.pop();
                tables.delete_file(file.id)?;
                return Ok(FileOutcome::Rejected(format!(
                    "failed to create file metadata: {e}"
                )));
            }
        };

        let file = tables.update_file_current_metadata(file.id, metadata.id, actor_id)?;

        Ok(FileOutcome::Stored(StoredFile { file, metadata }))
    }
}

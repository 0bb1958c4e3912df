//! Shared constants for the depot core.

/// Provenance tag recorded on metadata rows created by an upload.
pub const SOURCE_ACTION_UPLOAD: &str = "upload";

/// Provenance tag recorded on metadata rows created by a versioned rename.
pub const SOURCE_ACTION_RENAME: &str = "rename";

/// MIME type recorded when neither the caller nor detection yields one.
pub const FALLBACK_MIME: &str = "application/octet-stream";

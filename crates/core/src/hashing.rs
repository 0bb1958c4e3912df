//! Content hashing for the ingestion pipeline.
//!
//! The dedup/collision key is `SHA-256(filename ‖ content)`. Hashing the
//! filename *with* the bytes is deliberate: two byte-identical files with
//! different names coexist as distinct file rows, while re-uploading the exact
//! same name+content pair always collides with the existing row.

use depot_types::ContentHash;
use sha2::{Digest, Sha256};

/// Computes the content hash for a filename/content pair.
///
/// Filenames are compared byte-for-byte, including case: `Report.pdf` and
/// `report.pdf` hash differently even over identical bytes.
pub fn content_hash(filename: &str, content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(content);
    let digest: [u8; 32] = hasher.finalize().into();
    ContentHash::from_digest(&digest)
}

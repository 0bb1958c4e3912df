//! Directory-rooted blob storage implementation.
//!
//! [`BlobStore`] maps opaque relative path strings onto a single root directory on
//! local disk. The store is deliberately ignorant of the relational schema: the
//! ingestion engine decides what a path means, this type only guarantees the bytes
//! land (and stay) inside the root.
//!
//! # Security Model
//!
//! - The root is canonicalised at construction and validated to be a directory
//! - Relative paths are rejected if they are absolute, contain `..` or empty
//!   segments, or use non-UTF-8-expressible components
//! - Physical locations are always derived by joining a validated relative path
//!   onto the canonical root

use crate::BlobError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Local-disk blob storage rooted at a single directory.
///
/// # Design
///
/// - Root-scoped: every operation resolves inside the configured root
/// - Overwriting: storing to an existing path replaces the previous bytes; the
///   relational layer's hash constraint, not the path namespace, is the
///   source of truth for duplicates
/// - Idempotent deletes: removing an absent path reports `false`, not an error
#[derive(Debug)]
pub struct BlobStore {
    /// Canonicalised root directory for all blobs
    root: PathBuf,
}

impl BlobStore {
    /// Creates a new `BlobStore` over an existing root directory.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidRoot` if the root does not exist, is not a
    /// directory, or cannot be canonicalised.
    pub fn new(root: &Path) -> Result<Self, BlobError> {
        if !root.exists() {
            return Err(BlobError::InvalidRoot(format!(
                "directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(BlobError::InvalidRoot(format!(
                "path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            BlobError::InvalidRoot(format!(
                "cannot canonicalise path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Stores bytes at the given relative path, creating parent directories.
    ///
    /// An existing blob at the same path is overwritten. Returns the path that
    /// was written, echoing the storage contract's `store(path, bytes) -> path`.
    ///
    /// # Errors
    ///
    /// Returns `BlobError` if the path fails validation, directory creation
    /// fails, or the write fails.
    pub fn store(&self, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let physical = self.physical_path(path)?;

        if let Some(parent) = physical.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BlobError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create blob directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        fs::write(&physical, bytes).map_err(|e| {
            BlobError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to write blob to {}: {}", physical.display(), e),
            ))
        })?;

        Ok(path.to_owned())
    }

    /// Reports whether a blob exists at the given relative path.
    ///
    /// An invalid path is reported as absent rather than an error, since such a
    /// path can never have been stored through this service.
    pub fn exists(&self, path: &str) -> bool {
        match self.physical_path(path) {
            Ok(physical) => physical.is_file(),
            Err(_) => false,
        }
    }

    /// Reads the full contents of a blob.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::NotFound` if no blob exists at the path, or an I/O
    /// error if the read fails.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, BlobError> {
        let physical = self.physical_path(path)?;

        if !physical.is_file() {
            return Err(BlobError::NotFound(path.to_owned()));
        }

        fs::read(&physical).map_err(|e| {
            BlobError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to read blob from {}: {}", physical.display(), e),
            ))
        })
    }

    /// Deletes the blob at the given path if present.
    ///
    /// Idempotent: returns `Ok(false)` when nothing was stored at the path.
    ///
    /// # Errors
    ///
    /// Returns `BlobError` if the path fails validation or the removal itself
    /// fails (permissions, etc.).
    pub fn delete(&self, path: &str) -> Result<bool, BlobError> {
        let physical = self.physical_path(path)?;

        if !physical.is_file() {
            return Ok(false);
        }

        fs::remove_file(&physical).map_err(|e| {
            BlobError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to delete blob at {}: {}", physical.display(), e),
            ))
        })?;

        Ok(true)
    }

    /// Resolves the physical on-disk location for a relative blob path.
    ///
    /// The blob need not exist; downloads check existence separately so they can
    /// distinguish "never stored" from "stored then lost".
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidPath` if the path would escape the root.
    pub fn physical_path(&self, path: &str) -> Result<PathBuf, BlobError> {
        validate_relative(path)?;
        Ok(self.root.join(path))
    }

    /// Returns the canonicalised root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Validates that a blob path is a safe relative path.
///
/// Rejects empty paths, absolute paths, `.`/`..` components, and empty segments.
fn validate_relative(path: &str) -> Result<(), BlobError> {
    if path.trim().is_empty() {
        return Err(BlobError::InvalidPath("path cannot be empty".into()));
    }

    let candidate = Path::new(path);

    for component in candidate.components() {
        match component {
            Component::Normal(segment) if !segment.is_empty() => {}
            Component::Normal(_) | Component::CurDir => {
                return Err(BlobError::InvalidPath(format!(
                    "path contains empty or current-dir segment: {path}"
                )));
            }
            Component::ParentDir => {
                return Err(BlobError::InvalidPath(format!(
                    "path must not contain '..': {path}"
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(BlobError::InvalidPath(format!(
                    "path must be relative: {path}"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_store(temp: &TempDir) -> BlobStore {
        let root = temp.path().join("blobs");
        fs::create_dir_all(&root).unwrap();
        BlobStore::new(&root).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = BlobStore::new(&temp.path().join("nope"));
        assert!(matches!(result, Err(BlobError::InvalidRoot(_))));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "not a directory").unwrap();
        let result = BlobStore::new(&file);
        assert!(matches!(result, Err(BlobError::InvalidRoot(_))));
    }

    #[test]
    fn test_store_then_read_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let path = store
            .store("categories/3/files/notes.txt", b"hello depot")
            .unwrap();
        assert_eq!(path, "categories/3/files/notes.txt");
        assert!(store.exists(&path));
        assert_eq!(store.read(&path).unwrap(), b"hello depot");
    }

    #[test]
    fn test_store_overwrites_existing_path() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        store.store("categories/1/files/a.bin", b"first").unwrap();
        store.store("categories/1/files/a.bin", b"second").unwrap();

        assert_eq!(store.read("categories/1/files/a.bin").unwrap(), b"second");
    }

    #[test]
    fn test_read_missing_blob_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let result = store.read("categories/1/files/ghost.txt");
        assert!(matches!(result, Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        store.store("categories/1/files/a.txt", b"x").unwrap();
        assert!(store.delete("categories/1/files/a.txt").unwrap());
        assert!(!store.delete("categories/1/files/a.txt").unwrap());
        assert!(!store.exists("categories/1/files/a.txt"));
    }

    #[test]
    fn test_traversal_paths_rejected() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        for bad in ["../escape.txt", "categories/../../etc/passwd", "/abs.txt", ""] {
            let result = store.store(bad, b"nope");
            assert!(
                matches!(result, Err(BlobError::InvalidPath(_))),
                "path {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_exists_false_for_invalid_path() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);
        assert!(!store.exists("../outside"));
    }

    #[test]
    fn test_physical_path_stays_under_root() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let physical = store.physical_path("categories/9/files/deep/a.txt").unwrap();
        assert!(physical.starts_with(store.root()));
    }
}

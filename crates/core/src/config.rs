//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into
//! [`crate::DepotService`]. No environment variables are read during request
//! handling; the `*_from_env_value` helpers exist so a binary can parse values
//! it has already pulled from its environment.

use crate::{DepotError, DepotResult};
use std::path::{Path, PathBuf};

/// Default per-file upload limit: 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    blob_root: PathBuf,
    max_upload_bytes: u64,
    versioned_rename: bool,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `versioned_rename` selects the rename behaviour: `false` (default
    /// deployments) updates the current metadata row's filename in place;
    /// `true` records each rename as a new metadata row and swaps the
    /// current-metadata pointer.
    pub fn new(
        blob_root: PathBuf,
        max_upload_bytes: u64,
        versioned_rename: bool,
    ) -> DepotResult<Self> {
        if max_upload_bytes == 0 {
            return Err(DepotError::InvalidInput(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            blob_root,
            max_upload_bytes,
            versioned_rename,
        })
    }

    /// Convenience constructor using the default upload limit and in-place
    /// rename behaviour.
    pub fn with_defaults(blob_root: PathBuf) -> Self {
        Self {
            blob_root,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            versioned_rename: false,
        }
    }

    pub fn blob_root(&self) -> &Path {
        &self.blob_root
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn versioned_rename(&self) -> bool {
        self.versioned_rename
    }
}

/// Parse the per-file upload limit from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_UPLOAD_BYTES`].
pub fn max_upload_bytes_from_env_value(value: Option<String>) -> DepotResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(raw) => {
            let parsed = raw.parse::<u64>().map_err(|e| {
                DepotError::InvalidInput(format!("invalid upload limit {raw:?}: {e}"))
            })?;
            if parsed == 0 {
                return Err(DepotError::InvalidInput(
                    "upload limit must be greater than zero".into(),
                ));
            }
            Ok(parsed)
        }
    }
}

/// Parse the versioned-rename flag from an optional environment value.
///
/// Accepts `true`/`false`/`1`/`0`; `None` or empty means the default (`false`).
pub fn versioned_rename_from_env_value(value: Option<String>) -> DepotResult<bool> {
    let value = value
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());

    match value.as_deref() {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(DepotError::InvalidInput(format!(
            "invalid versioned-rename flag {other:?} (expected true/false)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_upload_limit() {
        let result = CoreConfig::new(PathBuf::from("/tmp"), 0, false);
        assert!(matches!(result, Err(DepotError::InvalidInput(_))));
    }

    #[test]
    fn defaults_apply() {
        let config = CoreConfig::with_defaults(PathBuf::from("/tmp"));
        assert_eq!(config.max_upload_bytes(), 20 * 1024 * 1024);
        assert!(!config.versioned_rename());
    }

    #[test]
    fn upload_limit_env_parsing() {
        assert_eq!(
            max_upload_bytes_from_env_value(None).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            max_upload_bytes_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_MAX_UPLOAD_BYTES
        );
        assert_eq!(
            max_upload_bytes_from_env_value(Some("1048576".into())).unwrap(),
            1_048_576
        );
        assert!(max_upload_bytes_from_env_value(Some("0".into())).is_err());
        assert!(max_upload_bytes_from_env_value(Some("lots".into())).is_err());
    }

    #[test]
    fn versioned_rename_env_parsing() {
        assert!(!versioned_rename_from_env_value(None).unwrap());
        assert!(versioned_rename_from_env_value(Some("true".into())).unwrap());
        assert!(versioned_rename_from_env_value(Some("1".into())).unwrap());
        assert!(!versioned_rename_from_env_value(Some("false".into())).unwrap());
        assert!(versioned_rename_from_env_value(Some("maybe".into())).is_err());
    }
}

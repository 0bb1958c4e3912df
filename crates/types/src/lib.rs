//! Validated value types shared across the depot crates.
//!
//! Depot identifies stored content by a *canonical* SHA-256 digest form:
//! **64 lowercase hexadecimal characters**. [`ContentHash`] guarantees that form
//! once constructed, so path derivation and uniqueness checks never have to
//! re-validate digest strings.
//!
//! [`NonEmptyText`] wraps user-supplied names (filenames, department and category
//! names) and rejects empty or whitespace-only input at the boundary rather than
//! deep inside a transaction.

/// Errors that can occur when constructing validated value types.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,

    /// The input was not a canonical SHA-256 hex digest
    #[error("invalid content hash: {0}")]
    InvalidHash(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction;
/// a trimmed-empty result is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::Empty` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A SHA-256 content digest in canonical form.
///
/// Canonical form:
/// - Length: 64
/// - Characters: `0-9` and `a-f` only
///
/// Externally supplied digest strings must go through [`ContentHash::parse`];
/// digests computed in-process are built from raw bytes via
/// [`ContentHash::from_digest`] and are canonical by construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Builds a `ContentHash` from a raw 32-byte SHA-256 digest.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Validates and wraps an externally supplied digest string.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidHash` if the input is not 64 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        if input.len() != 64 {
            return Err(TypeError::InvalidHash(format!(
                "expected 64 characters, got {}",
                input.len()
            )));
        }
        if !input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(TypeError::InvalidHash(
                "digest must be lowercase hexadecimal".into(),
            ));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the digest as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ContentHash::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Formats a byte count as a short human-readable size (`1.5 MB`, `312 B`).
///
/// Uses 1024-based units up to TB, rounding to two decimal places, matching
/// what the file listing surfaces display.
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    if (rounded - rounded.trunc()).abs() < f64::EPSILON {
        format!("{} {}", rounded.trunc() as u64, UNITS[unit])
    } else {
        format!("{} {}", rounded, UNITS[unit])
    }
}

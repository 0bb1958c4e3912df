//! Filename and storage-path derivation.
//!
//! Collision handling renames `name.ext` to `name (XXXX).ext` where `XXXX` is
//! four characters drawn from A–Z and 0–9. The suffix is collision-avoidance
//! only, not a security property, so a plain thread-local RNG is fine.

use rand::Rng;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub(crate) const SUFFIX_LEN: usize = 4;

/// Draws a random 4-character alphanumeric suffix.
pub(crate) fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Splices a suffix between a filename's base and extension.
///
/// `report.pdf` + `AB3F` → `report (AB3F).pdf`. A name without an extension
/// (or a leading-dot name like `.gitignore`) gets the suffix appended at the
/// end instead.
pub(crate) fn suffixed_filename(filename: &str, suffix: &str) -> String {
    match filename.rsplit_once('.') {
        Some((base, extension)) if !base.is_empty() => {
            format!("{base} ({suffix}).{extension}")
        }
        _ => format!("{filename} ({suffix})"),
    }
}

/// Derives the blob storage path for a filename within a category.
pub(crate) fn storage_path_for(category_id: u64, filename: &str) -> String {
    format!("categories/{category_id}/files/{filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_has_expected_shape() {
        for _ in 0..50 {
            let suffix = random_suffix();
            assert_eq!(suffix.len(), SUFFIX_LEN);
            assert!(suffix
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn suffix_spliced_before_extension() {
        assert_eq!(
            suffixed_filename("report.pdf", "AB3F"),
            "report (AB3F).pdf"
        );
        assert_eq!(
            suffixed_filename("archive.tar.gz", "Z9Q1"),
            "archive.tar (Z9Q1).gz"
        );
    }

    #[test]
    fn suffix_appended_without_extension() {
        assert_eq!(suffixed_filename("README", "AB3F"), "README (AB3F)");
        assert_eq!(suffixed_filename(".gitignore", "AB3F"), ".gitignore (AB3F)");
    }

    #[test]
    fn storage_path_shape() {
        assert_eq!(
            storage_path_for(12, "report.pdf"),
            "categories/12/files/report.pdf"
        );
    }
}
